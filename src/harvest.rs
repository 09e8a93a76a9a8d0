//! End-to-end harvesting: authenticate, run the pipeline, select bands and
//! download the artifact.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::bands::resolve_band_aliases;
use crate::cache_key::{self, CacheKey};
use crate::catalog::{CollectionCatalog, CollectionStatus, SpectralIndexRegistry};
use crate::config::{ConfigResolver, DocumentSource};
use crate::download::{DownloadManager, FetchReport, artifact};
use crate::error::HarvestError;
use crate::pipeline::Pipeline;
use crate::progress::Progress;
use crate::request::RequestSpec;
use crate::service::{ComputeService, Raster};
use crate::session::Session;

/// Everything produced by one successful harvest.
#[derive(Debug, Clone)]
pub struct HarvestResult {
    pub spec: RequestSpec,
    /// Handle to the finished remote raster, for previews.
    pub raster: Raster,
    pub image_count: u64,
    pub status: CollectionStatus,
    /// Bands actually exported, after alias resolution.
    pub bands: Vec<String>,
    pub cache_key: CacheKey,
    pub report: FetchReport,
}

/// Outcome of one profile of a document.
#[derive(Debug)]
pub struct ProfileOutcome {
    pub collection: String,
    pub result: Result<HarvestResult, HarvestError>,
}

/// Per-profile outcomes of [`Harvester::harvest_document`], in profile order.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub profiles: Vec<ProfileOutcome>,
}

impl HarvestReport {
    /// Profiles that finished, including skipped downloads.
    pub fn completed(&self) -> impl Iterator<Item = &HarvestResult> {
        self.profiles.iter().filter_map(|p| p.result.as_ref().ok())
    }

    /// Profiles that failed, with their collection id.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &HarvestError)> {
        self.profiles
            .iter()
            .filter_map(|p| p.result.as_ref().err().map(|e| (p.collection.as_str(), e)))
    }

    /// Artifact file names of every completed profile.
    #[must_use]
    pub fn filenames(&self) -> Vec<String> {
        self.completed()
            .flat_map(|result| result.report.filenames.iter().cloned())
            .collect()
    }
}

/// Ties the session, pipeline and download manager together.
pub struct Harvester {
    session: Arc<Session>,
    service: Arc<dyn ComputeService>,
    pipeline: Pipeline,
    downloads: DownloadManager,
}

impl Harvester {
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        service: Arc<dyn ComputeService>,
        catalog: Arc<CollectionCatalog>,
        indices: Arc<SpectralIndexRegistry>,
        progress: Progress,
    ) -> Self {
        Self {
            session,
            pipeline: Pipeline::new(service.clone(), catalog, indices),
            downloads: DownloadManager::new(service.clone(), progress),
            service,
        }
    }

    /// Harvests one request.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::Auth`] when no session can be established.
    /// - Any [`Pipeline::run`] error.
    /// - [`HarvestError::NoBandsSelected`] when no band is requested or none
    ///   matches. The error lists the available bands.
    /// - [`HarvestError::Io`] / [`HarvestError::Service`] from the download.
    #[instrument(skip_all, fields(collection = spec.collection()))]
    pub async fn harvest(&self, spec: &RequestSpec) -> Result<HarvestResult, HarvestError> {
        self.session.ensure_authenticated()?;
        let output = self.pipeline.run(spec).await?;

        let available = self.service.band_names(&output.raster).await?;
        let requested = spec.bands().unwrap_or_default();
        let bands = resolve_band_aliases(requested, &available)?;
        info!(?bands, "Bands selected");
        let raster = self.service.select(output.raster, &bands);

        let key = cache_key::for_request(spec);
        let destination = if raster.is_image() {
            spec.outpath()
                .join(artifact::image_filename(spec.collection_prefix(), &key))
        } else {
            spec.outpath()
                .join(artifact::collection_dirname(spec.collection_prefix(), &key))
        };
        let report = self
            .downloads
            .fetch(&raster, spec.region(), &destination, spec.scale(), spec.overwrite())
            .await?;

        Ok(HarvestResult {
            spec: spec.clone(),
            raster,
            image_count: output.image_count,
            status: output.status,
            bands,
            cache_key: key,
            report,
        })
    }

    /// Harvests every profile of a document, one after the other.
    ///
    /// A failing profile is recorded and the remaining profiles still run.
    ///
    /// # Errors
    ///
    /// Only structural errors of the document itself are returned; no profile
    /// runs in that case.
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn harvest_document(
        &self,
        resolver: &ConfigResolver,
        source: &DocumentSource,
    ) -> Result<HarvestReport, HarvestError> {
        let specs = resolver.expand(source)?;
        let total = specs.len();
        let mut report = HarvestReport::default();
        for (n, spec) in specs.into_iter().enumerate() {
            info!(profile = n + 1, total, collection = spec.collection(), "Running profile");
            let result = self.harvest(&spec).await;
            if let Err(e) = &result {
                error!(profile = n + 1, collection = spec.collection(), error = %e, "Profile failed");
            }
            report.profiles.push(ProfileOutcome {
                collection: spec.collection().to_string(),
                result,
            });
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
