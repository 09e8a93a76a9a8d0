//! The canonical remote transformation sequence.
//!
//! Steps always run in this order: filter, empty check, mask, spectral
//! indices, clip, reduce. An empty filter result stops the run before any
//! transformation is composed.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::catalog::{CollectionCatalog, CollectionStatus, SpectralIndexRegistry};
use crate::dates::IsoDate;
use crate::error::HarvestError;
use crate::request::RequestSpec;
use crate::service::{ComputeService, Raster};

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Composite image when a reducer was set, otherwise the processed collection.
    pub raster: Raster,
    /// Images left after filtering.
    pub image_count: u64,
    pub status: CollectionStatus,
}

/// Runs [`RequestSpec`]s against a compute service.
pub struct Pipeline {
    service: Arc<dyn ComputeService>,
    catalog: Arc<CollectionCatalog>,
    indices: Arc<SpectralIndexRegistry>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        service: Arc<dyn ComputeService>,
        catalog: Arc<CollectionCatalog>,
        indices: Arc<SpectralIndexRegistry>,
    ) -> Self {
        Self {
            service,
            catalog,
            indices,
        }
    }

    /// Runs every step for `spec`.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::CollectionNotFound`] if the collection is absent.
    /// - [`HarvestError::EmptyCollection`] if filtering leaves no image.
    /// - [`HarvestError::Masking`] if scaling or cloud masking fails.
    /// - [`HarvestError::UnknownSpectralIndex`] for unknown index names.
    /// - [`HarvestError::Service`] / [`HarvestError::Catalog`] for remote failures.
    #[instrument(skip_all, fields(collection = spec.collection()))]
    pub async fn run(&self, spec: &RequestSpec) -> Result<PipelineOutput, HarvestError> {
        let status = self.catalog.ensure_present(spec.collection()).await?;
        let date_max = spec.date_max().cloned().unwrap_or_else(IsoDate::today);

        let collection = self.service.collection(spec.collection());
        let collection = self.service.filter_bounds(collection, &spec.bbox());
        let mut collection = self
            .service
            .filter_date(collection, spec.date_min(), &date_max.filter_end());

        let image_count = self.service.count(&collection).await?;
        if image_count == 0 {
            return Err(HarvestError::EmptyCollection {
                collection: spec.collection().to_string(),
                date_min: spec.date_min().to_string(),
                date_max: date_max.to_string(),
            });
        }
        info!(image_count, date_min = %spec.date_min(), date_max = %date_max, "Images found");

        if spec.mask_clouds() {
            collection = self
                .service
                .scale_and_offset(collection)
                .and_then(|scaled| self.service.mask_clouds(scaled, spec.mask_probability()))
                .map_err(|e| HarvestError::masking(spec.collection(), e))?;
            debug!(probability = spec.mask_probability(), "Cloud mask applied");
        }

        if let Some(names) = spec.spectral_indices() {
            let indices = self.indices.resolve(names).await?;
            collection = self.service.spectral_indices(collection, &indices)?;
            debug!(?names, "Spectral indices added");
        }

        if spec.clip() {
            collection = self.service.clip(collection, spec.region());
        }

        let raster = match spec.reduce() {
            Some(reducer) => {
                debug!(reducer = %reducer, "Reducing collection");
                Raster::Image(self.service.reduce(collection, reducer))
            }
            None => Raster::Collection(collection),
        };

        Ok(PipelineOutput {
            raster,
            image_count,
            status,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}
