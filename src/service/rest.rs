//! HTTP implementation of [`ComputeService`].
//!
//! Values are evaluated with `POST {base}/value:compute` and body
//! `{"expression": <graph>}`, answering `{"result": <value>}`. Pixels are
//! rendered with `POST {base}/image:computePixels`, answering GeoTIFF bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::graph::{self, Expr};
use super::{ComputeService, ExportRequest, Raster, RemoteCollection, RemoteImage, ServiceError};
use crate::catalog::SpectralIndex;
use crate::catalog::supported::{self, CloudMask, SupportedCollection};
use crate::dates::IsoDate;
use crate::geo::{BoundingBox, Region};
use crate::reducer::Reducer;
use crate::session::Session;

const VALUE_ENDPOINT: &str = "value:compute";
const PIXELS_ENDPOINT: &str = "image:computePixels";

/// Default values for the non-band constants used in index formulas.
const INDEX_CONSTANTS: &[(&str, f64)] = &[
    ("L", 1.0),
    ("g", 2.5),
    ("C1", 6.0),
    ("C2", 7.5),
    ("alpha", 0.1),
    ("gamma", 1.0),
    ("omega", 2.0),
    ("sla", 1.0),
    ("slb", 0.0),
    ("nexp", 2.0),
    ("cexp", 1.16),
    ("k", 0.0),
    ("p", 2.0),
    ("c", 1.0),
    ("epsilon", 1.0),
    ("fdelta", 0.581),
];

/// Compute service reached over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct RestComputeService {
    client: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl RestComputeService {
    /// Creates a service client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] unless `base_url` is an http(s) URL.
    pub fn new(client: Client, base_url: &str, session: Arc<Session>) -> Result<Self, ServiceError> {
        let invalid = || ServiceError::InvalidUrl {
            url: base_url.to_string(),
        };
        let parsed = Url::parse(base_url).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        Ok(Self {
            client,
            base_url: parsed,
            session,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn token(&self, endpoint: &str) -> Result<&str, ServiceError> {
        self.session
            .bearer_token()
            .ok_or_else(|| ServiceError::Unauthenticated {
                endpoint: endpoint.to_string(),
            })
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<reqwest::Response, ServiceError> {
        let token = self.token(endpoint)?;
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::network(endpoint, e))?;
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ServiceError::Unauthenticated {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::http_status(endpoint, status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn compute_value(&self, expr: &Expr) -> Result<Value, ServiceError> {
        let endpoint = self.endpoint(VALUE_ENDPOINT);
        debug!(function = ?expr.function_name(), "Evaluating value");
        let response = self.post(&endpoint, &json!({ "expression": expr })).await?;
        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::invalid_response(&endpoint, e.to_string()))?;
        payload
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| ServiceError::invalid_response(&endpoint, "missing 'result' field"))
    }

    async fn compute_strings(&self, expr: &Expr) -> Result<Vec<String>, ServiceError> {
        let value = self.compute_value(expr).await?;
        serde_json::from_value(value).map_err(|e| {
            ServiceError::invalid_response(self.endpoint(VALUE_ENDPOINT), format!("expected a list of strings: {e}"))
        })
    }

    async fn compute_pixels(
        &self,
        expr: &Expr,
        request: &ExportRequest,
        destination: &Path,
    ) -> Result<u64, ServiceError> {
        let endpoint = self.endpoint(PIXELS_ENDPOINT);
        let body = json!({
            "expression": expr,
            "fileFormat": "GEO_TIFF",
            "grid": { "crsCode": request.crs, "scale": request.scale },
            "region": request.region,
        });
        let response = self.post(&endpoint, &body).await?;

        // An existing artifact is only replaced once the new one is complete.
        let partial = partial_path(destination);
        let mut file = File::create(&partial)
            .await
            .map_err(|e| ServiceError::io(&partial, e))?;
        let streamed = stream_to_file(&mut file, response, &endpoint, &partial).await;
        drop(file);
        let finished = match streamed {
            Ok(bytes) => tokio::fs::rename(&partial, destination)
                .await
                .map(|()| bytes)
                .map_err(|e| ServiceError::io(destination, e)),
            Err(error) => Err(error),
        };
        if finished.is_err() {
            debug!(path = %partial.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&partial).await;
        }
        finished
    }

    fn map_supported(
        capability: &'static str,
        collection: &RemoteCollection,
    ) -> Result<&'static SupportedCollection, ServiceError> {
        supported::lookup(&collection.collection_id).ok_or_else(|| {
            ServiceError::unsupported(
                capability,
                &collection.collection_id,
                "collection is not in the supported list",
            )
        })
    }
}

/// Sibling path a download is streamed to before it replaces `destination`.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    endpoint: &str,
    path: &Path,
) -> Result<u64, ServiceError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ServiceError::network(endpoint, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ServiceError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| ServiceError::io(path, e))?;
    Ok(bytes_written)
}

fn select_bands(image: Expr, bands: &[String]) -> Expr {
    Expr::call(
        "Image.select",
        [("input", image), ("bandSelectors", graph::strings(bands))],
    )
}

fn select_pattern(image: Expr, pattern: &str) -> Expr {
    select_bands(image, &[pattern.to_string()])
}

fn filter_collection(collection: Expr, filter: Expr) -> Expr {
    Expr::call("Collection.filter", [("collection", collection), ("filter", filter)])
}

fn index_expression(index: &SpectralIndex, mapping: &SupportedCollection) -> Result<Expr, String> {
    let mut variables = Vec::with_capacity(index.bands.len());
    for letter in &index.bands {
        let value = if let Some(band) = mapping.band_for(letter) {
            select_bands(Expr::image(), &[band.to_string()])
        } else if let Some((_, constant)) = INDEX_CONSTANTS.iter().find(|(name, _)| name == letter) {
            graph::number(*constant)
        } else {
            return Err(format!(
                "index {} needs band '{letter}', which this collection does not provide",
                index.short_name
            ));
        };
        variables.push((letter.clone(), value));
    }
    let computed = Expr::call(
        "Image.expression",
        [
            ("expression", graph::string(&index.formula)),
            ("map", Expr::dictionary(variables)),
        ],
    );
    Ok(Expr::call(
        "Image.rename",
        [
            ("input", computed),
            ("names", graph::strings(std::slice::from_ref(&index.short_name))),
        ],
    ))
}

#[async_trait]
impl ComputeService for RestComputeService {
    fn collection(&self, collection_id: &str) -> RemoteCollection {
        RemoteCollection {
            collection_id: collection_id.to_string(),
            expr: Expr::call("ImageCollection.load", [("id", graph::string(collection_id))]),
        }
    }

    fn filter_bounds(&self, collection: RemoteCollection, bbox: &BoundingBox) -> RemoteCollection {
        let filter = Expr::call(
            "Filter.intersects",
            [
                ("leftField", graph::string(".all")),
                ("rightValue", Expr::constant(bbox.to_geojson())),
            ],
        );
        RemoteCollection {
            expr: filter_collection(collection.expr, filter),
            ..collection
        }
    }

    fn filter_date(
        &self,
        collection: RemoteCollection,
        start: &IsoDate,
        end: &IsoDate,
    ) -> RemoteCollection {
        let range = Expr::call(
            "DateRange",
            [("start", graph::string(start.as_str())), ("end", graph::string(end.as_str()))],
        );
        let filter = Expr::call(
            "Filter.dateRangeContains",
            [("leftValue", range), ("rightField", graph::string("system:time_start"))],
        );
        RemoteCollection {
            expr: filter_collection(collection.expr, filter),
            ..collection
        }
    }

    #[instrument(skip(self, collection), fields(collection = %collection.collection_id))]
    async fn count(&self, collection: &RemoteCollection) -> Result<u64, ServiceError> {
        let expr = Expr::call("Collection.size", [("collection", collection.expr.clone())]);
        let value = self.compute_value(&expr).await?;
        value.as_u64().ok_or_else(|| {
            ServiceError::invalid_response(
                self.endpoint(VALUE_ENDPOINT),
                format!("expected a non-negative integer count, got {value}"),
            )
        })
    }

    fn scale_and_offset(&self, collection: RemoteCollection) -> Result<RemoteCollection, ServiceError> {
        let mapping = Self::map_supported("scale_and_offset", &collection)?;
        if mapping.scaling.is_empty() {
            return Ok(collection);
        }
        let mut image = Expr::image();
        for scaling in mapping.scaling {
            let scaled = Expr::call(
                "Image.add",
                [
                    (
                        "image1",
                        Expr::call(
                            "Image.multiply",
                            [
                                ("image1", select_pattern(Expr::image(), scaling.pattern)),
                                ("image2", graph::number(scaling.scale)),
                            ],
                        ),
                    ),
                    ("image2", graph::number(scaling.offset)),
                ],
            );
            image = Expr::call(
                "Image.addBands",
                [
                    ("dstImg", image),
                    ("srcImg", scaled),
                    ("overwrite", Expr::constant(Value::Bool(true))),
                ],
            );
        }
        Ok(RemoteCollection {
            expr: Expr::map_images(collection.expr, image),
            ..collection
        })
    }

    fn mask_clouds(
        &self,
        collection: RemoteCollection,
        probability: u8,
    ) -> Result<RemoteCollection, ServiceError> {
        let mapping = Self::map_supported("mask_clouds", &collection)?;
        let Some(cloud_mask) = mapping.cloud_mask else {
            return Err(ServiceError::unsupported(
                "mask_clouds",
                &collection.collection_id,
                "collection has no cloud metadata",
            ));
        };
        let keep = match cloud_mask {
            CloudMask::LandsatQa { band, bitmask } => Expr::call(
                "Image.eq",
                [
                    (
                        "image1",
                        Expr::call(
                            "Image.bitwiseAnd",
                            [
                                ("image1", select_pattern(Expr::image(), band)),
                                ("image2", graph::number(f64::from(bitmask))),
                            ],
                        ),
                    ),
                    ("image2", graph::number(0.0)),
                ],
            ),
            CloudMask::CloudProbability { band } => Expr::call(
                "Image.lt",
                [
                    ("image1", select_pattern(Expr::image(), band)),
                    ("image2", graph::number(f64::from(probability))),
                ],
            ),
        };
        let masked = Expr::call("Image.updateMask", [("image", Expr::image()), ("mask", keep)]);
        Ok(RemoteCollection {
            expr: Expr::map_images(collection.expr, masked),
            ..collection
        })
    }

    fn spectral_indices(
        &self,
        collection: RemoteCollection,
        indices: &[SpectralIndex],
    ) -> Result<RemoteCollection, ServiceError> {
        let mapping = Self::map_supported("spectral_indices", &collection)?;
        let mut image = Expr::image();
        for index in indices {
            let band = index_expression(index, mapping).map_err(|reason| {
                ServiceError::unsupported("spectral_indices", &collection.collection_id, reason)
            })?;
            image = Expr::call("Image.addBands", [("dstImg", image), ("srcImg", band)]);
        }
        Ok(RemoteCollection {
            expr: Expr::map_images(collection.expr, image),
            ..collection
        })
    }

    fn clip(&self, collection: RemoteCollection, region: &Region) -> RemoteCollection {
        let clipped = Expr::call(
            "Image.clip",
            [
                ("input", Expr::image()),
                ("geometry", Expr::constant(region.to_geojson())),
            ],
        );
        RemoteCollection {
            expr: Expr::map_images(collection.expr, clipped),
            ..collection
        }
    }

    fn reduce(&self, collection: RemoteCollection, reducer: Reducer) -> RemoteImage {
        let expr = match reducer {
            Reducer::Mosaic => Expr::call(reducer.capability(), [("collection", collection.expr)]),
            _ => Expr::call(
                "ImageCollection.reduce",
                [
                    ("collection", collection.expr),
                    ("reducer", Expr::call(reducer.capability(), [])),
                ],
            ),
        };
        RemoteImage {
            collection_id: collection.collection_id,
            expr,
        }
    }

    fn select(&self, raster: Raster, bands: &[String]) -> Raster {
        match raster {
            Raster::Image(image) => Raster::Image(RemoteImage {
                expr: select_bands(image.expr, bands),
                ..image
            }),
            Raster::Collection(collection) => Raster::Collection(RemoteCollection {
                expr: Expr::map_images(collection.expr, select_bands(Expr::image(), bands)),
                ..collection
            }),
        }
    }

    async fn band_names(&self, raster: &Raster) -> Result<Vec<String>, ServiceError> {
        let image = match raster {
            Raster::Image(image) => image.expr.clone(),
            Raster::Collection(collection) => {
                Expr::call("Collection.first", [("collection", collection.expr.clone())])
            }
        };
        self.compute_strings(&Expr::call("Image.bandNames", [("image", image)]))
            .await
    }

    async fn image_ids(&self, collection: &RemoteCollection) -> Result<Vec<String>, ServiceError> {
        let expr = Expr::call(
            "AggregateFeatureCollection.array",
            [
                ("collection", collection.expr.clone()),
                ("property", graph::string("system:index")),
            ],
        );
        self.compute_strings(&expr).await
    }

    #[instrument(skip(self, image, request), fields(collection = %image.collection_id))]
    async fn export_image(
        &self,
        image: &RemoteImage,
        request: &ExportRequest,
        destination: &Path,
    ) -> Result<u64, ServiceError> {
        self.compute_pixels(&image.expr, request, destination).await
    }

    #[instrument(skip(self, collection, request, files), fields(collection = %collection.collection_id, files = files.len()))]
    async fn export_collection(
        &self,
        collection: &RemoteCollection,
        request: &ExportRequest,
        files: &[(String, PathBuf)],
    ) -> Result<(), ServiceError> {
        for (image_id, destination) in files {
            let filter = Expr::call(
                "Filter.equals",
                [
                    ("leftField", graph::string("system:index")),
                    ("rightValue", graph::string(image_id)),
                ],
            );
            let image = Expr::call(
                "Collection.first",
                [("collection", filter_collection(collection.expr.clone(), filter))],
            );
            self.compute_pixels(&image, request, destination).await?;
        }
        Ok(())
    }
}
