//! Remote catalog sources: the collection listing and the spectral index catalog.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::CatalogError;
use super::indices::SpectralIndex;

/// Community-maintained listing of every public collection id.
pub const DEFAULT_COLLECTIONS_URL: &str =
    "https://raw.githubusercontent.com/samapriya/Earth-Engine-Datasets-List/master/gee_catalog.json";

/// Awesome Spectral Indices catalog.
pub const DEFAULT_INDICES_URL: &str = "https://raw.githubusercontent.com/awesome-spectral-indices/awesome-spectral-indices/main/output/spectral-indices-dict.json";

/// Where the live catalogs come from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Every collection id known to the remote service.
    async fn fetch_collection_ids(&self) -> Result<Vec<String>, CatalogError>;

    /// Every spectral index definition.
    async fn fetch_spectral_indices(&self) -> Result<Vec<SpectralIndex>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IndexCatalog {
    #[serde(rename = "SpectralIndices")]
    spectral_indices: BTreeMap<String, SpectralIndex>,
}

/// [`CatalogSource`] reading both catalogs as JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: Client,
    collections_url: String,
    indices_url: String,
}

impl HttpCatalogSource {
    #[must_use]
    pub fn new(
        client: Client,
        collections_url: impl Into<String>,
        indices_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            collections_url: collections_url.into(),
            indices_url: indices_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        debug!(url, "Fetching catalog");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(url, e))?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::invalid_payload(url, e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_collection_ids(&self) -> Result<Vec<String>, CatalogError> {
        let entries: Vec<CollectionEntry> = self.get_json(&self.collections_url).await?;
        Ok(entries.into_iter().map(|entry| entry.id).collect())
    }

    async fn fetch_spectral_indices(&self) -> Result<Vec<SpectralIndex>, CatalogError> {
        let catalog: IndexCatalog = self.get_json(&self.indices_url).await?;
        Ok(catalog
            .spectral_indices
            .into_iter()
            .map(|(key, mut index)| {
                if index.short_name.is_empty() {
                    index.short_name = key;
                }
                index
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn source_for(server: &MockServer) -> HttpCatalogSource {
        HttpCatalogSource::new(
            Client::new(),
            format!("{}/collections.json", server.uri()),
            format!("{}/indices.json", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_fetch_collection_ids_reads_id_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "COPERNICUS/S2_SR", "title": "Sentinel-2"},
                {"id": "LANDSAT/LC08/C02/T1_L2", "provider": "USGS"}
            ])))
            .mount(&server)
            .await;

        let ids = source_for(&server).await.fetch_collection_ids().await.unwrap();
        assert_eq!(ids, vec!["COPERNICUS/S2_SR", "LANDSAT/LC08/C02/T1_L2"]);
    }

    #[tokio::test]
    async fn test_fetch_spectral_indices_fills_short_name_from_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indices.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "SpectralIndices": {
                    "NDVI": {
                        "short_name": "NDVI",
                        "long_name": "Normalized Difference Vegetation Index",
                        "formula": "(N - R)/(N + R)",
                        "bands": ["N", "R"],
                        "platforms": ["Landsat-OLI"]
                    },
                    "BI": {"formula": "(S1 + R) - (N + B)", "bands": ["S1", "R", "N", "B"]}
                }
            })))
            .mount(&server)
            .await;

        let indices = source_for(&server).await.fetch_spectral_indices().await.unwrap();
        let names: Vec<_> = indices.iter().map(|i| i.short_name.as_str()).collect();
        assert_eq!(names, vec!["BI", "NDVI"]);
    }

    #[tokio::test]
    async fn test_http_error_is_not_an_empty_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source_for(&server).await.fetch_collection_ids().await.unwrap_err();
        assert!(matches!(err, CatalogError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = source_for(&server).await.fetch_collection_ids().await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPayload { .. }));
    }
}
