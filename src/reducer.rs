//! Closed set of temporal reducers.
//!
//! Each reducer maps to one remote capability id. Unknown names are rejected at
//! parse time, before a request can reach the remote service.

use std::fmt;
use std::str::FromStr;

use crate::error::HarvestError;

/// A named aggregation collapsing an image collection into one composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reducer {
    Median,
    Mean,
    Sum,
    Mode,
    Max,
    Min,
    Mosaic,
}

impl Reducer {
    /// Every supported reducer, in display order.
    pub const ALL: [Reducer; 7] = [
        Reducer::Median,
        Reducer::Mean,
        Reducer::Sum,
        Reducer::Mode,
        Reducer::Max,
        Reducer::Min,
        Reducer::Mosaic,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Mode => "mode",
            Self::Max => "max",
            Self::Min => "min",
            Self::Mosaic => "mosaic",
        }
    }

    /// Remote capability invoked for this reducer.
    ///
    /// `Mosaic` is a collection operation rather than a statistical reducer, so
    /// it keeps the source band names. Every other reducer suffixes them.
    #[must_use]
    pub fn capability(self) -> &'static str {
        match self {
            Self::Median => "Reducer.median",
            Self::Mean => "Reducer.mean",
            Self::Sum => "Reducer.sum",
            Self::Mode => "Reducer.mode",
            Self::Max => "Reducer.max",
            Self::Min => "Reducer.min",
            Self::Mosaic => "ImageCollection.mosaic",
        }
    }

    /// Band-name suffix the remote service appends after reduction.
    #[must_use]
    pub fn band_suffix(self) -> Option<&'static str> {
        match self {
            Self::Mosaic => None,
            other => Some(other.as_str()),
        }
    }

    /// Names of every supported reducer.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|r| r.as_str()).collect()
    }
}

impl FromStr for Reducer {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| HarvestError::UnsupportedReducer {
                name: s.to_string(),
                allowed: Self::names(),
            })
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_supported_name() {
        for reducer in Reducer::ALL {
            assert_eq!(reducer.as_str().parse::<Reducer>().unwrap(), reducer);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Median".parse::<Reducer>().unwrap(), Reducer::Median);
    }

    #[test]
    fn test_monkey_is_rejected_with_full_allowed_set() {
        let err = "monkey".parse::<Reducer>().unwrap_err();
        match err {
            HarvestError::UnsupportedReducer { name, allowed } => {
                assert_eq!(name, "monkey");
                assert_eq!(
                    allowed,
                    vec!["median", "mean", "sum", "mode", "max", "min", "mosaic"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mosaic_keeps_band_names() {
        assert_eq!(Reducer::Mosaic.band_suffix(), None);
        assert_eq!(Reducer::Median.band_suffix(), Some("median"));
    }
}
