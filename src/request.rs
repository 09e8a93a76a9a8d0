//! The canonical, immutable description of one harvest request.

use std::path::{Path, PathBuf};

use crate::dates::IsoDate;
use crate::error::{HarvestError, Violation};
use crate::geo::{BoundingBox, Region};
use crate::reducer::Reducer;

/// Default cloud probability threshold (percent).
pub const DEFAULT_MASK_PROBABILITY: u8 = 60;

/// Default target resolution in metres for explicit-argument requests.
pub const DEFAULT_SCALE_M: f64 = 100.0;

/// Default output directory.
pub const DEFAULT_OUTPATH: &str = "downloads";

/// One validated harvest request.
///
/// Built once through [`RequestSpec::builder`] and never mutated afterwards.
/// To harvest again with different settings, build a new spec.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    collection: String,
    region: Region,
    date_min: IsoDate,
    date_max: Option<IsoDate>,
    buffer_m: Option<f64>,
    bound: bool,
    mask_clouds: bool,
    mask_probability: u8,
    reduce: Option<Reducer>,
    spectral_indices: Option<Vec<String>>,
    bands: Option<Vec<String>>,
    scale: f64,
    clip: bool,
    outpath: PathBuf,
    overwrite: bool,
}

impl RequestSpec {
    /// Starts a builder with the library defaults.
    #[must_use]
    pub fn builder() -> RequestSpecBuilder {
        RequestSpecBuilder::default()
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// First path segment of the collection id, used in artifact names.
    #[must_use]
    pub fn collection_prefix(&self) -> &str {
        self.collection.split('/').next().unwrap_or(&self.collection)
    }

    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        self.region.bbox()
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub fn date_min(&self) -> &IsoDate {
        &self.date_min
    }

    #[must_use]
    pub fn date_max(&self) -> Option<&IsoDate> {
        self.date_max.as_ref()
    }

    #[must_use]
    pub fn buffer_m(&self) -> Option<f64> {
        self.buffer_m
    }

    #[must_use]
    pub fn bound(&self) -> bool {
        self.bound
    }

    #[must_use]
    pub fn mask_clouds(&self) -> bool {
        self.mask_clouds
    }

    #[must_use]
    pub fn mask_probability(&self) -> u8 {
        self.mask_probability
    }

    #[must_use]
    pub fn reduce(&self) -> Option<Reducer> {
        self.reduce
    }

    #[must_use]
    pub fn spectral_indices(&self) -> Option<&[String]> {
        self.spectral_indices.as_deref()
    }

    #[must_use]
    pub fn bands(&self) -> Option<&[String]> {
        self.bands.as_deref()
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn clip(&self) -> bool {
        self.clip
    }

    #[must_use]
    pub fn outpath(&self) -> &Path {
        &self.outpath
    }

    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }
}

/// Builder for [`RequestSpec`]. All validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    collection: Option<String>,
    region: Option<Region>,
    date_min: Option<IsoDate>,
    date_max: Option<IsoDate>,
    buffer_m: Option<f64>,
    bound: bool,
    mask_clouds: bool,
    mask_probability: u8,
    reduce: Option<String>,
    spectral_indices: Option<Vec<String>>,
    bands: Option<Vec<String>>,
    scale: f64,
    clip: bool,
    outpath: PathBuf,
    overwrite: bool,
}

impl Default for RequestSpecBuilder {
    fn default() -> Self {
        Self {
            collection: None,
            region: None,
            date_min: None,
            date_max: None,
            buffer_m: None,
            bound: false,
            mask_clouds: true,
            mask_probability: DEFAULT_MASK_PROBABILITY,
            reduce: Some(Reducer::Median.as_str().to_string()),
            spectral_indices: None,
            bands: None,
            scale: DEFAULT_SCALE_M,
            clip: true,
            outpath: PathBuf::from(DEFAULT_OUTPATH),
            overwrite: false,
        }
    }
}

impl RequestSpecBuilder {
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    #[must_use]
    pub fn bbox(mut self, bbox: BoundingBox) -> Self {
        self.region = Some(Region::Rectangle(bbox));
        self
    }

    #[must_use]
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    #[must_use]
    pub fn date_min(mut self, date: IsoDate) -> Self {
        self.date_min = Some(date);
        self
    }

    #[must_use]
    pub fn date_max(mut self, date: Option<IsoDate>) -> Self {
        self.date_max = date;
        self
    }

    #[must_use]
    pub fn buffer_m(mut self, buffer_m: Option<f64>) -> Self {
        self.buffer_m = buffer_m;
        self
    }

    #[must_use]
    pub fn bound(mut self, bound: bool) -> Self {
        self.bound = bound;
        self
    }

    #[must_use]
    pub fn mask_clouds(mut self, mask_clouds: bool) -> Self {
        self.mask_clouds = mask_clouds;
        self
    }

    #[must_use]
    pub fn mask_probability(mut self, probability: u8) -> Self {
        self.mask_probability = probability;
        self
    }

    /// Sets the reducer by name; `None` keeps the result as a collection.
    /// The name is checked in [`build`](Self::build).
    #[must_use]
    pub fn reduce(mut self, reduce: Option<&str>) -> Self {
        self.reduce = reduce.map(str::to_string);
        self
    }

    #[must_use]
    pub fn spectral_indices(mut self, indices: Option<Vec<String>>) -> Self {
        self.spectral_indices = indices;
        self
    }

    #[must_use]
    pub fn bands(mut self, bands: Option<Vec<String>>) -> Self {
        self.bands = bands;
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    #[must_use]
    pub fn outpath(mut self, outpath: impl Into<PathBuf>) -> Self {
        self.outpath = outpath.into();
        self
    }

    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validates and freezes the request.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::MissingRequiredArguments`] when collection, region or
    ///   start date are unset.
    /// - [`HarvestError::UnsupportedReducer`] for a reducer outside the fixed set.
    /// - [`HarvestError::InvalidDate`] when the end date precedes the start date.
    /// - [`HarvestError::SchemaValidation`] for out-of-range numeric settings.
    pub fn build(self) -> Result<RequestSpec, HarvestError> {
        let collection = self.collection.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let mut missing = Vec::new();
        if collection.is_none() {
            missing.push("collection");
        }
        if self.region.is_none() {
            missing.push("coords");
        }
        if self.date_min.is_none() {
            missing.push("date_min");
        }
        let (Some(collection), Some(region), Some(date_min)) = (collection, self.region, self.date_min)
        else {
            return Err(HarvestError::MissingRequiredArguments { missing });
        };

        if let Some(date_max) = &self.date_max
            && date_max < &date_min
        {
            return Err(HarvestError::invalid_date("date_max", date_max.as_str()));
        }

        let reduce = self.reduce.as_deref().map(str::parse::<Reducer>).transpose()?;

        let mut violations = Vec::new();
        if self.mask_probability > 100 {
            violations.push(Violation::new(
                "mask_probability",
                format!("expected 0..=100, got {}", self.mask_probability),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            violations.push(Violation::new(
                "scale",
                format!("expected a positive resolution in metres, got {}", self.scale),
            ));
        }
        if let Some(bands) = &self.bands
            && bands.iter().any(|b| b.trim().is_empty())
        {
            violations.push(Violation::new("bands", "band names must not be empty"));
        }
        if !violations.is_empty() {
            return Err(HarvestError::SchemaValidation { violations });
        }

        Ok(RequestSpec {
            collection,
            region,
            date_min,
            date_max: self.date_max,
            buffer_m: self.buffer_m,
            bound: self.bound,
            mask_clouds: self.mask_clouds,
            mask_probability: self.mask_probability,
            reduce,
            spectral_indices: self.spectral_indices.filter(|v| !v.is_empty()),
            bands: self.bands,
            scale: self.scale,
            clip: self.clip,
            outpath: self.outpath,
            overwrite: self.overwrite,
        })
    }
}
