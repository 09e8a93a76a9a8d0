//! geoharvest library
//!
//! Configuration-driven harvesting of preprocessed satellite imagery from a
//! remote compute service. A request is described by explicit arguments or a
//! YAML document, normalized into a [`RequestSpec`], run through a fixed
//! remote transformation sequence and downloaded as GeoTIFF.
//!
//! # Architecture
//!
//! - [`config`] - document loading, schema validation, defaults and resolution
//! - [`catalog`] - collection existence checks and the spectral index registry
//! - [`service`] - the compute service interface and its HTTP implementation
//! - [`pipeline`] - the canonical filter, mask, index, clip, reduce sequence
//! - [`cache_key`] - deterministic artifact fingerprints
//! - [`download`] - skip-or-fetch decisions and artifact naming
//! - [`harvest`] - end-to-end orchestration, including multi-collection documents

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bands;
pub mod cache_key;
pub mod catalog;
pub mod config;
pub mod dates;
pub mod download;
pub mod error;
pub mod geo;
pub mod harvest;
pub mod http_client;
pub mod pipeline;
pub mod progress;
pub mod reducer;
pub mod request;
pub mod service;
pub mod session;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use cache_key::CacheKey;
pub use catalog::{
    CatalogError, CatalogSource, CollectionCatalog, CollectionStatus, HttpCatalogSource,
    SpectralIndex, SpectralIndexRegistry,
};
pub use config::{
    ConfigResolver, DocumentSource, HarvestArgs, SchemaValidator, Strictness, ValidationReport,
};
pub use dates::IsoDate;
pub use download::{DownloadManager, FetchOutcome, FetchReport};
pub use error::{HarvestError, Violation};
pub use geo::{BoundingBox, Region};
pub use harvest::{HarvestReport, HarvestResult, Harvester, ProfileOutcome};
pub use http_client::{HttpTimeouts, build_http_client};
pub use pipeline::{Pipeline, PipelineOutput};
pub use progress::Progress;
pub use reducer::Reducer;
pub use request::{RequestSpec, RequestSpecBuilder};
pub use service::{
    ComputeService, ExportRequest, Raster, RemoteCollection, RemoteImage, RestComputeService,
    ServiceError,
};
pub use session::{AuthStatus, Session};
