//! Resolution of documents and explicit arguments into [`RequestSpec`]s.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::coords;
use super::document::{BandsValue, ConfigDocument, DateValue, ResolvedDocument};
use super::profiles;
use super::schema::{SchemaValidator, Strictness};
use super::DocumentSource;
use crate::dates::{DateBound, IsoDate};
use crate::error::{HarvestError, Violation};
use crate::geo::{self, BoundingBox, Region};
use crate::request::{DEFAULT_SCALE_M, RequestSpec};

/// Explicit harvest arguments, the alternative to a configuration document.
///
/// `collection`, `coords` and `date_min` are required. Unset optional values
/// fall back to the [`RequestSpec`] builder defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestArgs {
    pub collection: Option<String>,
    /// Four numbers `[min_lon, min_lat, max_lon, max_lat]`, or a point `[lon, lat]`.
    pub coords: Option<Vec<f64>>,
    pub date_min: Option<String>,
    pub date_max: Option<String>,
    /// Buffer in metres around a point.
    pub buffer: Option<f64>,
    pub bound: bool,
    pub mask_clouds: Option<bool>,
    pub mask_probability: Option<u8>,
    /// Reducer name; `None` uses the default (median).
    pub reduce: Option<String>,
    /// Keep the collection instead of reducing it.
    pub no_reduce: bool,
    pub spectral: Option<Vec<String>>,
    pub bands: Option<Vec<String>>,
    /// Resolution in metres.
    pub scale: Option<f64>,
    pub clip: Option<bool>,
    pub outpath: Option<PathBuf>,
    pub overwrite: bool,
}

/// Turns documents or arguments into validated requests.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    validator: SchemaValidator,
    outpath_override: Option<PathBuf>,
    default_outpath: Option<PathBuf>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(validator: SchemaValidator) -> Self {
        Self {
            validator,
            outpath_override: None,
            default_outpath: None,
        }
    }

    /// Resolver using the built-in schema.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Schema`] if the embedded schema is malformed.
    pub fn with_builtin_schema(strictness: Strictness) -> Result<Self, HarvestError> {
        Ok(Self::new(SchemaValidator::builtin(strictness)?))
    }

    /// Output directory used instead of the document's `outpath`.
    #[must_use]
    pub fn with_outpath(mut self, outpath: Option<PathBuf>) -> Self {
        self.outpath_override = outpath;
        self
    }

    /// Output directory used when neither the override nor the document names one.
    #[must_use]
    pub fn with_default_outpath(mut self, outpath: Option<PathBuf>) -> Self {
        self.default_outpath = outpath;
        self
    }

    /// Reads, validates and defaults a document.
    ///
    /// Returns the resolved document and the directory relative paths in it
    /// resolve against.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::ConfigRead`] if the source cannot be read or parsed.
    /// - [`HarvestError::SchemaValidation`] listing every violation.
    pub fn load(&self, source: &DocumentSource) -> Result<(ResolvedDocument, PathBuf), HarvestError> {
        let (raw, base_dir) = match source {
            DocumentSource::Path(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| HarvestError::config_read(source.describe(), e))?;
                let raw: serde_yaml::Value = serde_yaml::from_str(&text)
                    .map_err(|e| HarvestError::config_read(source.describe(), e))?;
                let base_dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                (raw, base_dir)
            }
            DocumentSource::Value(value) => (value.clone(), PathBuf::from(".")),
        };

        self.validator.validate(&raw).into_result()?;
        debug!(source = %source.describe(), "Configuration validated");

        let document: ConfigDocument = serde_yaml::from_value(raw).map_err(|e| {
            HarvestError::SchemaValidation {
                violations: vec![Violation::new("", e.to_string())],
            }
        })?;
        Ok((document.fill_defaults(), base_dir))
    }

    /// Resolves a single-collection document.
    ///
    /// # Errors
    ///
    /// Everything [`load`](Self::load) and [`spec_from_resolved`](Self::spec_from_resolved)
    /// return, plus [`HarvestError::MultipleCollections`] for multi-collection documents.
    #[instrument(skip(self, source), fields(source = %source.describe()))]
    pub fn from_document(&self, source: &DocumentSource) -> Result<RequestSpec, HarvestError> {
        let (document, base_dir) = self.load(source)?;
        self.spec_from_resolved(&document, &base_dir)
    }

    /// Resolves a document into one request per collection.
    ///
    /// # Errors
    ///
    /// Structural errors of any profile fail the whole document before any
    /// request is returned.
    #[instrument(skip(self, source), fields(source = %source.describe()))]
    pub fn expand(&self, source: &DocumentSource) -> Result<Vec<RequestSpec>, HarvestError> {
        let (document, base_dir) = self.load(source)?;
        profiles::expand(&document)?
            .iter()
            .map(|profile| self.spec_from_resolved(profile, &base_dir))
            .collect()
    }

    /// Builds a request from a resolved single-collection document.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::MultipleCollections`] for more than one collection.
    /// - [`HarvestError::MissingRequiredArguments`] without collection or `date_min`.
    /// - [`HarvestError::BoundingBox`] when no area of interest can be derived.
    /// - [`HarvestError::InvalidDate`], [`HarvestError::UnsupportedReducer`] and
    ///   the other [`RequestSpec`] build errors.
    pub fn spec_from_resolved(
        &self,
        document: &ResolvedDocument,
        base_dir: &Path,
    ) -> Result<RequestSpec, HarvestError> {
        let preprocess = document.preprocess();
        let collection = match preprocess.collection.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => {
                return Err(HarvestError::MultipleCollections {
                    collections: many.to_vec(),
                });
            }
        };
        let Some(date_min) = &document.date_min else {
            let mut missing = Vec::new();
            if collection.is_none() {
                missing.push("collection");
            }
            missing.push("date_min");
            return Err(HarvestError::MissingRequiredArguments { missing });
        };

        let region = document_region(document, preprocess.buffer, preprocess.bound, base_dir)?;
        let scale = match document.target_res {
            Some(arcsec) => {
                let center_lat = region.bbox().center_lat();
                let (x_meters, _) = geo::arcsec_to_meters(arcsec, center_lat);
                let scale = (x_meters * 10.0).round() / 10.0;
                info!(arcsec, center_lat, scale, "Scale converted from arc-seconds");
                scale
            }
            None => DEFAULT_SCALE_M,
        };

        let outpath = self
            .outpath_override
            .clone()
            .or_else(|| document.outpath.as_ref().map(PathBuf::from))
            .or_else(|| self.default_outpath.clone());

        let mut builder = RequestSpec::builder()
            .region(region)
            .date_min(parse_date("date_min", date_min, DateBound::Start)?)
            .date_max(
                document
                    .date_max
                    .as_ref()
                    .map(|d| parse_date("date_max", d, DateBound::End))
                    .transpose()?,
            )
            .buffer_m(preprocess.buffer)
            .bound(preprocess.bound)
            .mask_clouds(preprocess.mask_clouds)
            .mask_probability(preprocess.mask_probability)
            .reduce(preprocess.reduce.as_deref())
            .spectral_indices(preprocess.spectral.clone())
            .bands(single_profile_bands(document.bands())?)
            .scale(scale)
            .clip(preprocess.clip);
        if let Some(collection) = collection {
            builder = builder.collection(collection);
        }
        if let Some(outpath) = outpath {
            builder = builder.outpath(outpath);
        }
        builder.build()
    }

    /// Builds a request from explicit arguments.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::MissingRequiredArguments`] naming each missing required argument.
    /// - [`HarvestError::BoundingBox`], [`HarvestError::InvalidDate`] and the
    ///   other [`RequestSpec`] build errors.
    pub fn from_args(args: HarvestArgs) -> Result<RequestSpec, HarvestError> {
        let collection = args.collection.filter(|c| !c.trim().is_empty());
        let coords = args.coords.filter(|c| !c.is_empty());
        let date_min = args.date_min.filter(|d| !d.trim().is_empty());

        let (Some(collection), Some(coords), Some(date_min)) = (&collection, &coords, &date_min) else {
            let missing = [
                ("collection", collection.is_none()),
                ("coords", coords.is_none()),
                ("date_min", date_min.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, is_missing)| is_missing.then_some(name))
            .collect();
            return Err(HarvestError::MissingRequiredArguments { missing });
        };

        let region = region_from_coords(coords, args.buffer, args.bound)?;
        let reduce = if args.no_reduce {
            None
        } else {
            Some(args.reduce.as_deref().unwrap_or("median"))
        };

        let mut builder = RequestSpec::builder()
            .collection(collection.clone())
            .region(region)
            .date_min(IsoDate::parse("date_min", date_min, DateBound::Start)?)
            .date_max(
                args.date_max
                    .as_deref()
                    .map(|d| IsoDate::parse("date_max", d, DateBound::End))
                    .transpose()?,
            )
            .buffer_m(args.buffer)
            .bound(args.bound)
            .reduce(reduce)
            .spectral_indices(args.spectral)
            .bands(args.bands)
            .overwrite(args.overwrite);
        if let Some(mask_clouds) = args.mask_clouds {
            builder = builder.mask_clouds(mask_clouds);
        }
        if let Some(probability) = args.mask_probability {
            builder = builder.mask_probability(probability);
        }
        if let Some(scale) = args.scale {
            builder = builder.scale(scale);
        }
        if let Some(clip) = args.clip {
            builder = builder.clip(clip);
        }
        if let Some(outpath) = args.outpath {
            builder = builder.outpath(outpath);
        }
        builder.build()
    }
}

/// Region from four bbox numbers, or a buffered two-number point.
fn region_from_coords(coords: &[f64], buffer: Option<f64>, bound: bool) -> Result<Region, HarvestError> {
    match coords {
        [lon, lat] => {
            let Some(buffer) = buffer else {
                return Err(HarvestError::bounding_box(format!(
                    "a single point [{lon}, {lat}] needs a buffer in metres"
                )));
            };
            Region::buffered_point(*lon, *lat, buffer, bound)
        }
        _ => BoundingBox::from_slice(coords).map(Region::Rectangle),
    }
}

fn document_region(
    document: &ResolvedDocument,
    buffer: Option<f64>,
    bound: bool,
    base_dir: &Path,
) -> Result<Region, HarvestError> {
    if let Some(bbox) = &document.target_bbox {
        return region_from_coords(bbox, buffer, bound);
    }
    match (&document.infile, &document.colname_lng, &document.colname_lat) {
        (Some(infile), Some(lng), Some(lat)) => {
            let path = base_dir.join(infile);
            let points = coords::read_points(&path, lng, lat)?;
            let bbox = BoundingBox::from_points(points, geo::DEFAULT_POINT_PADDING_DEG)?;
            info!(bbox = ?bbox.to_array(), file = %path.display(), "Bounding box derived from input file");
            Ok(Region::Rectangle(bbox))
        }
        _ => Err(HarvestError::bounding_box(
            "no target_bbox given, and infile, colname_lng and colname_lat are not all set",
        )),
    }
}

fn parse_date(field: &'static str, value: &DateValue, bound: DateBound) -> Result<IsoDate, HarvestError> {
    IsoDate::parse(field, &value.as_text(), bound)
}

fn single_profile_bands(bands: Option<&BandsValue>) -> Result<Option<Vec<String>>, HarvestError> {
    match bands {
        None => Ok(None),
        Some(BandsValue::Nested(lists)) => match lists.as_slice() {
            [only] => Ok(Some(only.clone())),
            _ => Err(HarvestError::invalid_bands_shape(
                1,
                format!("a single collection takes one band list, got {}", lists.len()),
            )),
        },
        Some(other) => Ok(other.flat()),
    }
}
