//! Scripted in-memory compute service and catalog shared by integration tests.
//!
//! The service keeps a small archive of dated images per collection and tracks
//! the state a real service would carry in its expression graph: the date
//! window, added index bands and the reducer. `count`, `band_names` and
//! `image_ids` answer from that state.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use geoharvest::catalog::{CatalogError, CatalogSource, SpectralIndex};
use geoharvest::service::graph::{self, Expr};
use geoharvest::{
    BoundingBox, ComputeService, ExportRequest, IsoDate, Raster, Reducer, Region, RemoteCollection,
    RemoteImage, ServiceError,
};

pub const LANDSAT: &str = "LANDSAT/LC08/C02/T1_L2";
pub const SENTINEL: &str = "COPERNICUS/S2_SR";

const LANDSAT_BANDS: &[&str] = &[
    "SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7", "QA_PIXEL",
];
const SENTINEL_BANDS: &[&str] = &["B2", "B3", "B4", "B8", "MSK_CLDPRB"];

/// Catalog answering from fixed lists.
pub struct StaticCatalog {
    ids: Vec<String>,
}

impl StaticCatalog {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

fn index(short_name: &str, formula: &str, bands: &[&str]) -> SpectralIndex {
    SpectralIndex {
        short_name: short_name.to_string(),
        long_name: String::new(),
        formula: formula.to_string(),
        bands: bands.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_collection_ids(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.ids.clone())
    }

    async fn fetch_spectral_indices(&self) -> Result<Vec<SpectralIndex>, CatalogError> {
        Ok(vec![
            index("NDVI", "(N - R)/(N + R)", &["N", "R"]),
            index("NDWI", "(G - N)/(G + N)", &["G", "N"]),
        ])
    }
}

#[derive(Debug, Default, Clone)]
struct Chain {
    window: Option<(String, String)>,
    indices: Vec<String>,
    reducer: Option<Reducer>,
}

/// Compute service answering from a scripted image archive.
pub struct ScriptedService {
    /// `(acquisition date, image id)` per collection.
    archive: HashMap<String, Vec<(String, String)>>,
    chains: Mutex<HashMap<String, Chain>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        let mut archive = HashMap::new();
        archive.insert(
            LANDSAT.to_string(),
            vec![
                ("2019-01-15".to_string(), "LC08_091084_20190115".to_string()),
                ("2019-01-31".to_string(), "LC08_091084_20190131".to_string()),
                ("2019-03-04".to_string(), "LC08_091084_20190304".to_string()),
            ],
        );
        archive.insert(
            SENTINEL.to_string(),
            vec![("2019-02-10".to_string(), "20190210T000241_T55JFM".to_string())],
        );
        Self {
            archive,
            chains: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Adds an image acquired on `date` to `collection_id`'s archive.
    pub fn with_image(mut self, collection_id: &str, date: &str, image_id: &str) -> Self {
        self.archive
            .entry(collection_id.to_string())
            .or_default()
            .push((date.to_string(), image_id.to_string()));
        self
    }

    /// Names of every operation called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls().iter().any(|call| call == operation)
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }

    fn update(&self, collection_id: &str, change: impl FnOnce(&mut Chain)) {
        let mut chains = self.chains.lock().unwrap();
        change(chains.entry(collection_id.to_string()).or_default());
    }

    fn chain(&self, collection_id: &str) -> Chain {
        self.chains
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    fn images_in_window(&self, collection_id: &str) -> Vec<String> {
        let chain = self.chain(collection_id);
        let images = self.archive.get(collection_id).cloned().unwrap_or_default();
        images
            .into_iter()
            .filter(|(date, _)| {
                chain
                    .window
                    .as_ref()
                    .is_none_or(|(start, end)| date >= start && date < end)
            })
            .map(|(_, id)| id)
            .collect()
    }

    fn wrap(name: &str, collection: RemoteCollection) -> RemoteCollection {
        RemoteCollection {
            expr: Expr::call(name, [("input", collection.expr)]),
            ..collection
        }
    }
}

fn write_tiff(path: &Path) -> Result<u64, ServiceError> {
    std::fs::write(path, b"II*\x00scripted").map_err(|e| ServiceError::io(path, e))?;
    Ok(12)
}

#[async_trait]
impl ComputeService for ScriptedService {
    fn collection(&self, collection_id: &str) -> RemoteCollection {
        self.record("collection");
        self.update(collection_id, |chain| *chain = Chain::default());
        RemoteCollection {
            collection_id: collection_id.to_string(),
            expr: Expr::call("ImageCollection.load", [("id", graph::string(collection_id))]),
        }
    }

    fn filter_bounds(&self, collection: RemoteCollection, _bbox: &BoundingBox) -> RemoteCollection {
        self.record("filter_bounds");
        Self::wrap("filter_bounds", collection)
    }

    fn filter_date(
        &self,
        collection: RemoteCollection,
        start: &IsoDate,
        end: &IsoDate,
    ) -> RemoteCollection {
        self.record("filter_date");
        let window = (start.as_str().to_string(), end.as_str().to_string());
        self.update(&collection.collection_id, |chain| chain.window = Some(window));
        Self::wrap("filter_date", collection)
    }

    async fn count(&self, collection: &RemoteCollection) -> Result<u64, ServiceError> {
        self.record("count");
        Ok(self.images_in_window(&collection.collection_id).len() as u64)
    }

    fn scale_and_offset(&self, collection: RemoteCollection) -> Result<RemoteCollection, ServiceError> {
        self.record("scale_and_offset");
        Ok(Self::wrap("scale_and_offset", collection))
    }

    fn mask_clouds(
        &self,
        collection: RemoteCollection,
        _probability: u8,
    ) -> Result<RemoteCollection, ServiceError> {
        self.record("mask_clouds");
        Ok(Self::wrap("mask_clouds", collection))
    }

    fn spectral_indices(
        &self,
        collection: RemoteCollection,
        indices: &[SpectralIndex],
    ) -> Result<RemoteCollection, ServiceError> {
        self.record("spectral_indices");
        let names: Vec<String> = indices.iter().map(|i| i.short_name.clone()).collect();
        self.update(&collection.collection_id, |chain| chain.indices.extend(names));
        Ok(Self::wrap("spectral_indices", collection))
    }

    fn clip(&self, collection: RemoteCollection, _region: &Region) -> RemoteCollection {
        self.record("clip");
        Self::wrap("clip", collection)
    }

    fn reduce(&self, collection: RemoteCollection, reducer: Reducer) -> RemoteImage {
        self.record("reduce");
        self.update(&collection.collection_id, |chain| chain.reducer = Some(reducer));
        RemoteImage {
            collection_id: collection.collection_id,
            expr: Expr::call(reducer.capability(), [("input", collection.expr)]),
        }
    }

    fn select(&self, raster: Raster, _bands: &[String]) -> Raster {
        self.record("select");
        raster
    }

    async fn band_names(&self, raster: &Raster) -> Result<Vec<String>, ServiceError> {
        self.record("band_names");
        let collection_id = raster.collection_id();
        let chain = self.chain(collection_id);
        let base = if collection_id == SENTINEL { SENTINEL_BANDS } else { LANDSAT_BANDS };
        let names = base
            .iter()
            .map(|s| (*s).to_string())
            .chain(chain.indices.iter().cloned());
        let suffix = chain.reducer.and_then(Reducer::band_suffix);
        Ok(names
            .map(|name| match suffix {
                Some(suffix) if raster.is_image() => format!("{name}_{suffix}"),
                _ => name,
            })
            .collect())
    }

    async fn image_ids(&self, collection: &RemoteCollection) -> Result<Vec<String>, ServiceError> {
        self.record("image_ids");
        Ok(self.images_in_window(&collection.collection_id))
    }

    async fn export_image(
        &self,
        _image: &RemoteImage,
        _request: &ExportRequest,
        destination: &Path,
    ) -> Result<u64, ServiceError> {
        self.record("export_image");
        write_tiff(destination)
    }

    async fn export_collection(
        &self,
        _collection: &RemoteCollection,
        _request: &ExportRequest,
        files: &[(String, PathBuf)],
    ) -> Result<(), ServiceError> {
        self.record("export_collection");
        for (_, path) in files {
            write_tiff(path)?;
        }
        Ok(())
    }
}
