//! Collection existence and support checks.
//!
//! A collection is classified against two lists:
//! - the live remote listing, fetched once per [`CollectionCatalog`];
//! - the static allow-list in [`supported`], which carries the preprocessing
//!   semantics (cloud mask, scaling, band map) for each entry.

mod error;
pub mod indices;
pub mod source;
pub mod supported;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

pub use error::CatalogError;
pub use indices::{SpectralIndex, SpectralIndexRegistry};
pub use source::{CatalogSource, HttpCatalogSource};

use crate::error::HarvestError;

/// Outcome of checking a collection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// In the live catalog and in the allow-list.
    Supported,
    /// In the live catalog only; processed with a warning.
    PresentUnsupported,
    /// Not in the live catalog.
    Absent,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Supported => "supported",
            Self::PresentUnsupported => "present (not supported)",
            Self::Absent => "absent",
        };
        f.write_str(label)
    }
}

/// Classifies collection ids against the live listing and the allow-list.
pub struct CollectionCatalog {
    source: Arc<dyn CatalogSource>,
    ids: OnceCell<HashSet<String>>,
}

impl CollectionCatalog {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            ids: OnceCell::new(),
        }
    }

    async fn ids(&self) -> Result<&HashSet<String>, CatalogError> {
        self.ids
            .get_or_try_init(|| async {
                let ids = self.source.fetch_collection_ids().await?;
                info!(count = ids.len(), "Collection catalog loaded");
                Ok(ids.into_iter().collect())
            })
            .await
    }

    /// Classifies a collection id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the live listing cannot be fetched. A
    /// failed fetch never yields [`CollectionStatus::Absent`].
    pub async fn classify(&self, collection: &str) -> Result<CollectionStatus, CatalogError> {
        if !self.ids().await?.contains(collection) {
            return Ok(CollectionStatus::Absent);
        }
        if supported::lookup(collection).is_some() {
            Ok(CollectionStatus::Supported)
        } else {
            Ok(CollectionStatus::PresentUnsupported)
        }
    }

    /// Classifies a collection and refuses absent ones.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::CollectionNotFound`] when the id is not in the live listing.
    /// - [`HarvestError::Catalog`] when the listing cannot be fetched.
    #[instrument(skip(self))]
    pub async fn ensure_present(&self, collection: &str) -> Result<CollectionStatus, HarvestError> {
        let status = self.classify(collection).await?;
        match status {
            CollectionStatus::Absent => Err(HarvestError::CollectionNotFound {
                collection: collection.to_string(),
            }),
            CollectionStatus::PresentUnsupported => {
                warn!(
                    collection,
                    "Collection exists but is not in the supported list; masking, scaling and spectral indices may fail"
                );
                Ok(status)
            }
            CollectionStatus::Supported => Ok(status),
        }
    }
}

impl fmt::Debug for CollectionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionCatalog")
            .field("loaded", &self.ids.initialized())
            .finish_non_exhaustive()
    }
}
