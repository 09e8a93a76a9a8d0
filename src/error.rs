//! Error types for harvest operations.
//!
//! Every variant carries the offending value and, where there is a closed set of
//! valid alternatives, that set too, so a message is actionable on its own.
//! Structural errors (config, schema, arguments, bounding box) are raised before
//! any remote call is made.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::SchemaError;
use crate::service::ServiceError;

/// A single schema violation: where it happened and what is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted key path into the document (e.g. `target_sources.GEE.preprocess.reduce`).
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors that can occur while building, running, or downloading a harvest request.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The configuration document could not be read or parsed.
    #[error("cannot read configuration '{source_name}': {reason}\n  Suggestion: check the path and YAML syntax")]
    ConfigRead {
        /// Path or description of the document source.
        source_name: String,
        /// Why reading failed.
        reason: String,
    },

    /// The configuration document failed schema validation.
    #[error("configuration failed schema validation with {} violation(s):\n{}", violations.len(), format_violations(violations))]
    SchemaValidation {
        /// Every violation found, not just the first.
        violations: Vec<Violation>,
    },

    /// Explicit arguments are missing one or more required values.
    #[error("minimum required arguments are not met: missing {}\n  Suggestion: provide collection, coords and date_min", missing.join(", "))]
    MissingRequiredArguments {
        /// Names of the missing arguments, in declaration order.
        missing: Vec<&'static str>,
    },

    /// A multi-collection document was passed to single-collection resolution.
    #[error("cannot process more than one collection at a time, got {collections:?}\n  Suggestion: use the `auto` entry point, or make `collection` a single string")]
    MultipleCollections {
        /// The collections found in the document.
        collections: Vec<String>,
    },

    /// No usable bounding box could be derived.
    #[error("invalid bounding box: {reason}\n  Suggestion: set `target_bbox` as [min_lon, min_lat, max_lon, max_lat], or set `infile`, `colname_lng` and `colname_lat`")]
    BoundingBox {
        /// Why the bounding box is unusable.
        reason: String,
    },

    /// A date string is neither `YYYY` nor `YYYY-MM-DD`.
    #[error("invalid date '{value}' for {field}\n  Suggestion: use YYYY-MM-DD or YYYY")]
    InvalidDate {
        /// Which field carried the date.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The collection does not exist in the remote catalog.
    #[error("collection '{collection}' not found in the remote catalog. Processing cancelled\n  Suggestion: check spelling, or run `geoharvest classify` against a known id")]
    CollectionNotFound {
        /// The requested collection id.
        collection: String,
    },

    /// Filtering produced zero images.
    #[error("no images in '{collection}' between {date_min} and {date_max}\n  Suggestion: widen the date range or the bounding box")]
    EmptyCollection {
        /// The filtered collection id.
        collection: String,
        /// Inclusive start date.
        date_min: String,
        /// Exclusive end date.
        date_max: String,
    },

    /// Cloud/shadow masking failed on the remote service.
    #[error("cloud masking failed for '{collection}': {reason}\n  Suggestion: set mask_clouds to false for collections without cloud metadata")]
    Masking {
        /// The collection being masked.
        collection: String,
        /// Underlying failure.
        reason: String,
    },

    /// One or more requested spectral indices are unknown.
    #[error("unknown spectral indices {unknown:?}\n  Suggestion: choose from the index catalog ({} known), e.g. {}", known_count, sample.join(", "))]
    UnknownSpectralIndex {
        /// The offending index names.
        unknown: Vec<String>,
        /// Size of the known registry.
        known_count: usize,
        /// A few valid names to help the user.
        sample: Vec<String>,
    },

    /// The reducer name is not one of the supported set.
    #[error("unsupported reducer '{name}'\n  Suggestion: use one of {}", allowed.join(", "))]
    UnsupportedReducer {
        /// The rejected reducer name.
        name: String,
        /// Every supported reducer name.
        allowed: Vec<&'static str>,
    },

    /// Multi-collection bands are not a list of lists matching the collections.
    #[error("invalid bands for {collections} collections: {reason}\n  Suggestion: give one band list per collection, e.g. [['B2', 'B3', 'B4'], ['SR_B1', 'SR_B2']]")]
    InvalidBandsShape {
        /// Number of collections in the document.
        collections: usize,
        /// What is wrong with the supplied shape.
        reason: String,
    },

    /// No bands were selected, or none of the requested ones exist.
    #[error("no bands selected (requested {requested:?})\n  Suggestion: choose from available bands {available:?}")]
    NoBandsSelected {
        /// Bands the user asked for.
        requested: Vec<String>,
        /// Bands present on the image.
        available: Vec<String>,
    },

    /// The validation schema itself could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Remote catalog fetch failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Remote compute service call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Authentication session could not be established.
    #[error("authentication failed: {reason}\n  Suggestion: export a bearer token in ${token_env}")]
    Auth {
        /// Environment variable consulted for the token.
        token_env: String,
        /// Why authentication failed.
        reason: String,
    },

    /// Local file system error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl HarvestError {
    /// Creates a `ConfigRead` error.
    pub fn config_read(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ConfigRead {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `BoundingBox` error.
    pub fn bounding_box(reason: impl Into<String>) -> Self {
        Self::BoundingBox {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidDate` error.
    pub fn invalid_date(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidDate {
            field,
            value: value.into(),
        }
    }

    /// Creates a `Masking` error.
    pub fn masking(collection: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Masking {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `InvalidBandsShape` error.
    pub fn invalid_bands_shape(collections: usize, reason: impl Into<String>) -> Self {
        Self::InvalidBandsShape {
            collections,
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors raised before any remote call.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead { .. }
                | Self::SchemaValidation { .. }
                | Self::Schema(_)
                | Self::MissingRequiredArguments { .. }
                | Self::MultipleCollections { .. }
                | Self::BoundingBox { .. }
                | Self::InvalidDate { .. }
                | Self::UnsupportedReducer { .. }
                | Self::InvalidBandsShape { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arguments_names_each_argument() {
        let error = HarvestError::MissingRequiredArguments {
            missing: vec!["coords", "date_min"],
        };
        let msg = error.to_string();
        assert!(msg.contains("not met"), "Expected 'not met' in: {msg}");
        assert!(msg.contains("coords"), "Expected 'coords' in: {msg}");
        assert!(msg.contains("date_min"), "Expected 'date_min' in: {msg}");
        assert!(error.is_structural());
    }

    #[test]
    fn test_schema_validation_lists_every_violation() {
        let error = HarvestError::SchemaValidation {
            violations: vec![
                Violation::new("date_min", "required key is missing"),
                Violation::new("target_res", "expected a number, got string"),
            ],
        };
        let msg = error.to_string();
        assert!(msg.contains("2 violation(s)"), "Expected count in: {msg}");
        assert!(msg.contains("date_min: required key is missing"));
        assert!(msg.contains("target_res: expected a number"));
    }

    #[test]
    fn test_unsupported_reducer_lists_alternatives() {
        let error = HarvestError::UnsupportedReducer {
            name: "monkey".to_string(),
            allowed: vec!["median", "mean"],
        };
        let msg = error.to_string();
        assert!(msg.contains("monkey"));
        assert!(msg.contains("median, mean"));
    }

    #[test]
    fn test_empty_collection_is_not_structural() {
        let error = HarvestError::EmptyCollection {
            collection: "LANDSAT/LC08/C02/T1_L2".to_string(),
            date_min: "2019-01-01".to_string(),
            date_max: "2019-01-02".to_string(),
        };
        assert!(!error.is_structural());
        assert!(error.to_string().contains("2019-01-02"));
    }

    #[test]
    fn test_violation_display_root_path() {
        let violation = Violation::new("", "document must be a mapping");
        assert_eq!(violation.to_string(), "<root>: document must be a mapping");
    }
}
