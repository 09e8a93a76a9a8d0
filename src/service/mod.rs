//! Narrow interface to the remote compute service.
//!
//! Graph-building operations are synchronous and only compose an expression;
//! nothing is evaluated until one of the async calls (`count`, `band_names`,
//! `image_ids`, `export_*`) sends it to the service.

mod error;
pub mod graph;
mod rest;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

pub use error::ServiceError;
pub use graph::Expr;
pub use rest::RestComputeService;

use crate::catalog::SpectralIndex;
use crate::dates::IsoDate;
use crate::geo::{BoundingBox, Region};
use crate::reducer::Reducer;

/// Default REST root of the compute service.
pub const DEFAULT_SERVICE_URL: &str = "https://earthengine.googleapis.com/v1/projects/earthengine-legacy";

/// Coordinate reference system used for every export.
pub const EXPORT_CRS: &str = "EPSG:4326";

/// Unevaluated handle to a (possibly filtered and transformed) image collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCollection {
    pub collection_id: String,
    pub expr: Expr,
}

/// Unevaluated handle to a single composite image.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteImage {
    pub collection_id: String,
    pub expr: Expr,
}

/// Either a composite image or the collection it would be reduced from.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Image(RemoteImage),
    Collection(RemoteCollection),
}

impl Raster {
    #[must_use]
    pub fn collection_id(&self) -> &str {
        match self {
            Self::Image(image) => &image.collection_id,
            Self::Collection(collection) => &collection.collection_id,
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// Where and how an export is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// GeoJSON geometry bounding the export.
    pub region: Value,
    pub crs: String,
    /// Pixel size in metres.
    pub scale: f64,
}

impl ExportRequest {
    #[must_use]
    pub fn new(region: &Region, scale: f64) -> Self {
        Self {
            region: region.to_geojson(),
            crs: EXPORT_CRS.to_string(),
            scale,
        }
    }
}

/// Operations the harvester needs from the remote compute service.
#[async_trait]
pub trait ComputeService: Send + Sync {
    /// Handle to a named collection.
    fn collection(&self, collection_id: &str) -> RemoteCollection;

    /// Keeps images intersecting `bbox`.
    fn filter_bounds(&self, collection: RemoteCollection, bbox: &BoundingBox) -> RemoteCollection;

    /// Keeps images acquired in `[start, end)`.
    fn filter_date(&self, collection: RemoteCollection, start: &IsoDate, end: &IsoDate)
    -> RemoteCollection;

    /// Number of images in the collection.
    async fn count(&self, collection: &RemoteCollection) -> Result<u64, ServiceError>;

    /// Applies the collection's scale and offset to raw band values.
    fn scale_and_offset(&self, collection: RemoteCollection) -> Result<RemoteCollection, ServiceError>;

    /// Masks cloud and shadow pixels. `probability` is the threshold (percent)
    /// for collections carrying a cloud probability band.
    fn mask_clouds(
        &self,
        collection: RemoteCollection,
        probability: u8,
    ) -> Result<RemoteCollection, ServiceError>;

    /// Adds one band per spectral index, named after the index.
    fn spectral_indices(
        &self,
        collection: RemoteCollection,
        indices: &[SpectralIndex],
    ) -> Result<RemoteCollection, ServiceError>;

    /// Clips every image to `region`.
    fn clip(&self, collection: RemoteCollection, region: &Region) -> RemoteCollection;

    /// Collapses the collection into one composite.
    fn reduce(&self, collection: RemoteCollection, reducer: Reducer) -> RemoteImage;

    /// Keeps only the named bands.
    fn select(&self, raster: Raster, bands: &[String]) -> Raster;

    /// Band names of the image, or of the collection's first image.
    async fn band_names(&self, raster: &Raster) -> Result<Vec<String>, ServiceError>;

    /// Identifiers of every image in the collection.
    async fn image_ids(&self, collection: &RemoteCollection) -> Result<Vec<String>, ServiceError>;

    /// Renders the image as a GeoTIFF at `destination`. Returns the bytes written.
    async fn export_image(
        &self,
        image: &RemoteImage,
        request: &ExportRequest,
        destination: &Path,
    ) -> Result<u64, ServiceError>;

    /// Renders each `(image id, destination)` pair of the collection as a GeoTIFF.
    async fn export_collection(
        &self,
        collection: &RemoteCollection,
        request: &ExportRequest,
        files: &[(String, PathBuf)],
    ) -> Result<(), ServiceError>;
}
