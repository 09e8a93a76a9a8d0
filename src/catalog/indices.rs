//! Spectral index definitions and the cached index registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::CatalogError;
use super::source::CatalogSource;
use crate::error::HarvestError;

/// Number of valid names suggested when an index is unknown.
const SUGGESTION_COUNT: usize = 5;

/// A derived band defined by an algebraic formula over band letters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpectralIndex {
    /// Registry key, e.g. `NDVI`.
    #[serde(default)]
    pub short_name: String,
    /// Descriptive name.
    #[serde(default)]
    pub long_name: String,
    /// Formula over band letters, e.g. `(N - R)/(N + R)`.
    pub formula: String,
    /// Band letters (and constants) referenced by `formula`.
    #[serde(default)]
    pub bands: Vec<String>,
}

/// Lazily fetched, process-lifetime cache of known spectral indices.
pub struct SpectralIndexRegistry {
    source: Arc<dyn CatalogSource>,
    indices: OnceCell<BTreeMap<String, SpectralIndex>>,
}

impl SpectralIndexRegistry {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            indices: OnceCell::new(),
        }
    }

    async fn indices(&self) -> Result<&BTreeMap<String, SpectralIndex>, CatalogError> {
        self.indices
            .get_or_try_init(|| async {
                let fetched = self.source.fetch_spectral_indices().await?;
                info!(count = fetched.len(), "Spectral index catalog loaded");
                Ok(fetched
                    .into_iter()
                    .map(|index| (index.short_name.clone(), index))
                    .collect())
            })
            .await
    }

    /// Names of every known index, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the catalog cannot be fetched.
    pub async fn names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.indices().await?.keys().cloned().collect())
    }

    /// Resolves every requested name, or fails naming all unknown ones.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::UnknownSpectralIndex`] if any name is not in the registry;
    ///   nothing is returned for the known ones in that case.
    /// - [`HarvestError::Catalog`] if the catalog cannot be fetched.
    pub async fn resolve(&self, names: &[String]) -> Result<Vec<SpectralIndex>, HarvestError> {
        let indices = self.indices().await?;
        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !indices.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(HarvestError::UnknownSpectralIndex {
                unknown,
                known_count: indices.len(),
                sample: indices.keys().take(SUGGESTION_COUNT).cloned().collect(),
            });
        }
        debug!(?names, "Spectral indices validated");
        Ok(names
            .iter()
            .filter_map(|name| indices.get(name.as_str()).cloned())
            .collect())
    }
}

impl std::fmt::Debug for SpectralIndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralIndexRegistry")
            .field("loaded", &self.indices.initialized())
            .finish_non_exhaustive()
    }
}
