//! In-memory fakes shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::catalog::{CatalogError, CatalogSource, SpectralIndex};
use crate::dates::IsoDate;
use crate::geo::{BoundingBox, Region};
use crate::reducer::Reducer;
use crate::service::graph::{self, Expr};
use crate::service::{
    ComputeService, ExportRequest, Raster, RemoteCollection, RemoteImage, ServiceError,
};

pub const LANDSAT: &str = "LANDSAT/LC08/C02/T1_L2";
pub const SENTINEL: &str = "COPERNICUS/S2_SR";

/// Catalog source answering from fixed lists and counting fetches.
pub struct StaticCatalogSource {
    ids: Vec<String>,
    fail: bool,
    collection_fetches: AtomicUsize,
    index_fetches: AtomicUsize,
}

impl StaticCatalogSource {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| (*s).to_string()).collect(),
            fail: false,
            collection_fetches: AtomicUsize::new(0),
            index_fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn collection_fetches(&self) -> usize {
        self.collection_fetches.load(Ordering::SeqCst)
    }

    pub fn index_fetches(&self) -> usize {
        self.index_fetches.load(Ordering::SeqCst)
    }
}

pub fn index(short_name: &str, formula: &str, bands: &[&str]) -> SpectralIndex {
    SpectralIndex {
        short_name: short_name.to_string(),
        long_name: String::new(),
        formula: formula.to_string(),
        bands: bands.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_collection_ids(&self) -> Result<Vec<String>, CatalogError> {
        self.collection_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::HttpStatus {
                url: "static://collections".to_string(),
                status: 503,
            });
        }
        Ok(self.ids.clone())
    }

    async fn fetch_spectral_indices(&self) -> Result<Vec<SpectralIndex>, CatalogError> {
        self.index_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CatalogError::HttpStatus {
                url: "static://indices".to_string(),
                status: 503,
            });
        }
        Ok(vec![
            index("NDVI", "(N - R)/(N + R)", &["N", "R"]),
            index("NDWI", "(G - N)/(G + N)", &["G", "N"]),
            index("EVI", "g * (N - R) / (N + C1 * R - C2 * B + L)", &["g", "N", "R", "C1", "C2", "B", "L"]),
        ])
    }
}

/// Compute service recording every operation it is asked for.
pub struct FakeComputeService {
    count: u64,
    fail_mask: bool,
    bands: Vec<String>,
    ids: Vec<String>,
    calls: Mutex<Vec<&'static str>>,
    date_range: Mutex<Option<(String, String)>>,
    selected: Mutex<Option<Vec<String>>>,
    exports: AtomicUsize,
}

impl FakeComputeService {
    pub fn with_count(count: u64) -> Self {
        Self {
            count,
            fail_mask: false,
            bands: ["SR_B2_median", "SR_B3_median", "SR_B4_median", "QA_PIXEL_median"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            ids: vec!["LC08_091084_20190115".to_string(), "LC08_091084_20190131".to_string()],
            calls: Mutex::new(Vec::new()),
            date_range: Mutex::new(None),
            selected: Mutex::new(None),
            exports: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing_mask(mut self) -> Self {
        self.fail_mask = true;
        self
    }

    #[must_use]
    pub fn with_bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_date_range(&self) -> Option<(String, String)> {
        self.date_range.lock().unwrap().clone()
    }

    pub fn selected_bands(&self) -> Option<Vec<String>> {
        self.selected.lock().unwrap().clone()
    }

    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn wrap(call: &'static str, collection: RemoteCollection) -> RemoteCollection {
        RemoteCollection {
            expr: Expr::call(call, [("input", collection.expr)]),
            ..collection
        }
    }
}

fn write_fake_tiff(path: &Path) -> Result<u64, ServiceError> {
    std::fs::write(path, b"II*\x00fake").map_err(|e| ServiceError::io(path, e))?;
    Ok(8)
}

#[async_trait]
impl ComputeService for FakeComputeService {
    fn collection(&self, collection_id: &str) -> RemoteCollection {
        self.record("collection");
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
        *self.date_range.lock().unwrap() = Some((start.to_string(), end.to_string()));
        Self::wrap("filter_date", collection)
    }

    async fn count(&self, _collection: &RemoteCollection) -> Result<u64, ServiceError> {
        self.record("count");
        Ok(self.count)
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
        if self.fail_mask {
            return Err(ServiceError::unsupported(
                "mask_clouds",
                &collection.collection_id,
                "collection has no cloud metadata",
            ));
        }
        Ok(Self::wrap("mask_clouds", collection))
    }

    fn spectral_indices(
        &self,
        collection: RemoteCollection,
        _indices: &[SpectralIndex],
    ) -> Result<RemoteCollection, ServiceError> {
        self.record("spectral_indices");
        Ok(Self::wrap("spectral_indices", collection))
    }

    fn clip(&self, collection: RemoteCollection, _region: &Region) -> RemoteCollection {
        self.record("clip");
        Self::wrap("clip", collection)
    }

    fn reduce(&self, collection: RemoteCollection, reducer: Reducer) -> RemoteImage {
        self.record("reduce");
        RemoteImage {
            collection_id: collection.collection_id,
            expr: Expr::call(reducer.capability(), [("input", collection.expr)]),
        }
    }

    fn select(&self, raster: Raster, bands: &[String]) -> Raster {
        self.record("select");
        *self.selected.lock().unwrap() = Some(bands.to_vec());
        raster
    }

    async fn band_names(&self, _raster: &Raster) -> Result<Vec<String>, ServiceError> {
        self.record("band_names");
        Ok(self.bands.clone())
    }

    async fn image_ids(&self, _collection: &RemoteCollection) -> Result<Vec<String>, ServiceError> {
        self.record("image_ids");
        Ok(self.ids.clone())
    }

    async fn export_image(
        &self,
        _image: &RemoteImage,
        _request: &ExportRequest,
        destination: &Path,
    ) -> Result<u64, ServiceError> {
        self.record("export_image");
        self.exports.fetch_add(1, Ordering::SeqCst);
        write_fake_tiff(destination)
    }

    async fn export_collection(
        &self,
        _collection: &RemoteCollection,
        _request: &ExportRequest,
        files: &[(String, PathBuf)],
    ) -> Result<(), ServiceError> {
        self.record("export_collection");
        self.exports.fetch_add(1, Ordering::SeqCst);
        for (_, path) in files {
            write_fake_tiff(path)?;
        }
        Ok(())
    }
}
