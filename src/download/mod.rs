//! Skip-or-fetch decisions and export of finished rasters.
//!
//! An artifact counts as present iff its exact path exists. Composite images
//! are skipped when present unless `overwrite` is set. Collections are always
//! exported as one batch, without a per-file check.

pub mod artifact;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::HarvestError;
use crate::geo::Region;
use crate::progress::Progress;
use crate::service::{ComputeService, ExportRequest, Raster};

/// Whether a fetch talked to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    /// The artifact already existed and `overwrite` was false.
    Skipped,
}

/// What a fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// File names (not paths) of every artifact.
    pub filenames: Vec<String>,
    /// The image file, or the directory holding a collection's files.
    pub destination: PathBuf,
    /// Full path of every artifact, in the order of `filenames`.
    pub paths: Vec<PathBuf>,
}

/// Exports rasters through a compute service.
pub struct DownloadManager {
    service: Arc<dyn ComputeService>,
    progress: Progress,
}

impl DownloadManager {
    #[must_use]
    pub fn new(service: Arc<dyn ComputeService>, progress: Progress) -> Self {
        Self { service, progress }
    }

    /// Writes `raster` to `destination`.
    ///
    /// For an image `destination` is the `.tif` path, for a collection it is
    /// the directory receiving one `<id>.tif` per image. Parent directories are
    /// created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Io`] when directories cannot be created and
    /// [`HarvestError::Service`] when the export fails.
    #[instrument(skip(self, raster, region), fields(collection = raster.collection_id()))]
    pub async fn fetch(
        &self,
        raster: &Raster,
        region: &Region,
        destination: &Path,
        scale: f64,
        overwrite: bool,
    ) -> Result<FetchReport, HarvestError> {
        let request = ExportRequest::new(region, scale);
        match raster {
            Raster::Image(image) => {
                let filename = destination
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if destination.exists() && !overwrite {
                    warn!(file = %filename, "File already exists, skipping download");
                    return Ok(FetchReport {
                        outcome: FetchOutcome::Skipped,
                        filenames: vec![filename],
                        destination: destination.to_path_buf(),
                        paths: vec![destination.to_path_buf()],
                    });
                }
                if let Some(parent) = destination.parent() {
                    create_dir_all(parent).await?;
                }
                let bytes = self
                    .progress
                    .run(
                        format!("Downloading {filename}"),
                        self.service.export_image(image, &request, destination),
                    )
                    .await?;
                info!(file = %destination.display(), bytes, "Image saved");
                Ok(FetchReport {
                    outcome: FetchOutcome::Downloaded,
                    filenames: vec![filename],
                    destination: destination.to_path_buf(),
                    paths: vec![destination.to_path_buf()],
                })
            }
            Raster::Collection(collection) => {
                let ids = self.service.image_ids(collection).await?;
                let names = artifact::image_id_filenames(&ids);
                let files: Vec<(String, PathBuf)> = ids
                    .into_iter()
                    .zip(names)
                    .map(|(id, name)| {
                        let path = destination.join(name);
                        (id, path)
                    })
                    .collect();
                create_dir_all(destination).await?;
                self.progress
                    .run(
                        format!("Downloading {} images", files.len()),
                        self.service.export_collection(collection, &request, &files),
                    )
                    .await?;
                info!(dir = %destination.display(), count = files.len(), "Collection saved");
                Ok(FetchReport {
                    outcome: FetchOutcome::Downloaded,
                    filenames: files
                        .iter()
                        .filter_map(|(_, path)| path.file_name())
                        .map(|name| name.to_string_lossy().into_owned())
                        .collect(),
                    destination: destination.to_path_buf(),
                    paths: files.into_iter().map(|(_, path)| path).collect(),
                })
            }
        }
    }
}

async fn create_dir_all(path: &Path) -> Result<(), HarvestError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| HarvestError::io(path, e))
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geo::BoundingBox;
    use crate::reducer::Reducer;
    use crate::test_support::{FakeComputeService, LANDSAT};

    fn region() -> Region {
        Region::Rectangle(BoundingBox::new(149.799, -30.31, 149.80, -30.309).unwrap())
    }

    fn image(service: &FakeComputeService) -> Raster {
        Raster::Image(service.reduce(service.collection(LANDSAT), Reducer::Median))
    }

    #[tokio::test]
    async fn test_second_fetch_is_skipped() {
        let service = Arc::new(FakeComputeService::with_count(1));
        let manager = DownloadManager::new(service.clone(), Progress::Hidden);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/ee_LANDSAT_abcd1234.tif");
        let raster = image(&service);

        let first = manager.fetch(&raster, &region(), &path, 30.0, false).await.unwrap();
        let second = manager.fetch(&raster, &region(), &path, 30.0, false).await.unwrap();

        assert_eq!(first.outcome, FetchOutcome::Downloaded);
        assert_eq!(second.outcome, FetchOutcome::Skipped);
        assert_eq!(second.filenames, vec!["ee_LANDSAT_abcd1234.tif"]);
        assert_eq!(second.paths, vec![path.clone()]);
        assert_eq!(service.exports(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_exports_again() {
        let service = Arc::new(FakeComputeService::with_count(1));
        let manager = DownloadManager::new(service.clone(), Progress::Hidden);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ee_LANDSAT_abcd1234.tif");
        let raster = image(&service);

        manager.fetch(&raster, &region(), &path, 30.0, false).await.unwrap();
        let again = manager.fetch(&raster, &region(), &path, 30.0, true).await.unwrap();

        assert_eq!(again.outcome, FetchOutcome::Downloaded);
        assert_eq!(service.exports(), 2);
    }

    #[tokio::test]
    async fn test_collection_export_names_every_image() {
        let service = Arc::new(FakeComputeService::with_count(2));
        let manager = DownloadManager::new(service.clone(), Progress::Hidden);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ee_LANDSAT_abcd1234");
        let raster = Raster::Collection(service.collection(LANDSAT));

        let report = manager.fetch(&raster, &region(), &target, 30.0, false).await.unwrap();

        assert_eq!(
            report.filenames,
            vec!["LC08_091084_20190115.tif", "LC08_091084_20190131.tif"]
        );
        assert!(target.join("LC08_091084_20190115.tif").exists());
        assert!(report.paths.iter().all(|path| path.starts_with(&target) && path.exists()));
        // Collections are re-exported even when the files exist.
        let again = manager.fetch(&raster, &region(), &target, 30.0, false).await.unwrap();
        assert_eq!(again.outcome, FetchOutcome::Downloaded);
        assert_eq!(service.exports(), 2);
    }
}
