//! Typed configuration document and its defaulting.

use serde::{Deserialize, Serialize};

use crate::request::DEFAULT_MASK_PROBABILITY;

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Band selection: one band, a flat list, or one list per collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BandsValue {
    One(String),
    Flat(Vec<String>),
    Nested(Vec<Vec<String>>),
}

impl BandsValue {
    /// Bands for a single-collection request.
    ///
    /// Returns `None` for the nested form, which only applies to multi-collection documents.
    #[must_use]
    pub fn flat(&self) -> Option<Vec<String>> {
        match self {
            Self::One(band) => Some(vec![band.clone()]),
            Self::Flat(bands) => Some(bands.clone()),
            Self::Nested(_) => None,
        }
    }
}

/// A date as written in YAML: `2019-01-01` or a bare year `2019`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DateValue {
    Year(i64),
    Text(String),
}

impl DateValue {
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Year(year) => year.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Configuration document as written by the user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigDocument {
    pub infile: Option<String>,
    pub outpath: Option<String>,
    pub colname_lat: Option<String>,
    pub colname_lng: Option<String>,
    pub target_bbox: Option<Vec<f64>>,
    /// Resolution in arc-seconds.
    pub target_res: Option<f64>,
    pub date_min: Option<DateValue>,
    pub date_max: Option<DateValue>,
    pub target_sources: Option<TargetSources>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TargetSources {
    #[serde(rename = "GEE")]
    pub gee: Option<SourceSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceSection {
    pub preprocess: Option<PreprocessSection>,
    pub download: Option<DownloadSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreprocessSection {
    pub collection: Option<OneOrMany>,
    /// Buffer in metres around a single point.
    pub buffer: Option<f64>,
    pub bound: Option<bool>,
    pub mask_clouds: Option<bool>,
    pub mask_probability: Option<u8>,
    pub reduce: Option<String>,
    pub spectral: Option<OneOrMany>,
    pub clip: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DownloadSection {
    pub bands: Option<BandsValue>,
}

/// Document with every section present and defaults applied.
///
/// Leaves without a default stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    pub infile: Option<String>,
    pub outpath: Option<String>,
    pub colname_lat: Option<String>,
    pub colname_lng: Option<String>,
    pub target_bbox: Option<Vec<f64>>,
    pub target_res: Option<f64>,
    pub date_min: Option<DateValue>,
    pub date_max: Option<DateValue>,
    pub target_sources: ResolvedSources,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSources {
    #[serde(rename = "GEE")]
    pub gee: ResolvedSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSource {
    pub preprocess: ResolvedPreprocess,
    pub download: ResolvedDownload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPreprocess {
    /// Always a list; a bare string becomes one element.
    pub collection: Vec<String>,
    pub buffer: Option<f64>,
    pub bound: bool,
    pub mask_clouds: bool,
    pub mask_probability: u8,
    pub reduce: Option<String>,
    pub spectral: Option<Vec<String>>,
    pub clip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDownload {
    pub bands: Option<BandsValue>,
}

/// Every key path present in a [`ResolvedDocument`].
pub const KEY_PATHS: &[&str] = &[
    "infile",
    "outpath",
    "colname_lat",
    "colname_lng",
    "target_bbox",
    "target_res",
    "date_min",
    "date_max",
    "target_sources.GEE.preprocess.collection",
    "target_sources.GEE.preprocess.buffer",
    "target_sources.GEE.preprocess.bound",
    "target_sources.GEE.preprocess.mask_clouds",
    "target_sources.GEE.preprocess.mask_probability",
    "target_sources.GEE.preprocess.reduce",
    "target_sources.GEE.preprocess.spectral",
    "target_sources.GEE.preprocess.clip",
    "target_sources.GEE.download.bands",
];

impl ConfigDocument {
    /// Fills every missing section and applies defaults. Pure.
    #[must_use]
    pub fn fill_defaults(&self) -> ResolvedDocument {
        let gee = self
            .target_sources
            .clone()
            .unwrap_or_default()
            .gee
            .unwrap_or_default();
        let preprocess = gee.preprocess.unwrap_or_default();
        let download = gee.download.unwrap_or_default();

        ResolvedDocument {
            infile: self.infile.clone(),
            outpath: self.outpath.clone(),
            colname_lat: self.colname_lat.clone(),
            colname_lng: self.colname_lng.clone(),
            target_bbox: self.target_bbox.clone(),
            target_res: self.target_res,
            date_min: self.date_min.clone(),
            date_max: self.date_max.clone(),
            target_sources: ResolvedSources {
                gee: ResolvedSource {
                    preprocess: ResolvedPreprocess {
                        collection: preprocess.collection.map(OneOrMany::into_vec).unwrap_or_default(),
                        buffer: preprocess.buffer,
                        bound: preprocess.bound.unwrap_or(false),
                        mask_clouds: preprocess.mask_clouds.unwrap_or(false),
                        mask_probability: preprocess
                            .mask_probability
                            .unwrap_or(DEFAULT_MASK_PROBABILITY),
                        reduce: preprocess.reduce,
                        spectral: preprocess.spectral.map(OneOrMany::into_vec),
                        clip: preprocess.clip.unwrap_or(true),
                    },
                    download: ResolvedDownload {
                        bands: download.bands,
                    },
                },
            },
        }
    }
}

impl ResolvedDocument {
    #[must_use]
    pub fn preprocess(&self) -> &ResolvedPreprocess {
        &self.target_sources.gee.preprocess
    }

    #[must_use]
    pub fn bands(&self) -> Option<&BandsValue> {
        self.target_sources.gee.download.bands.as_ref()
    }
}
