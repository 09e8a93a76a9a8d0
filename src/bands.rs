//! Band alias resolution.
//!
//! Reduction and index computation make the remote service append suffixes to
//! band names (`NDVI` becomes `NDVI_median`). A requested band therefore matches
//! an available band that is equal to it or starts with `<requested>_`.

use crate::error::HarvestError;

/// Maps requested band names onto the bands actually present on an image.
///
/// The result follows the order of `available` and contains each band at most once.
///
/// # Errors
///
/// Returns [`HarvestError::NoBandsSelected`] when `requested` is empty or
/// nothing matches. The error lists the available bands.
pub fn resolve_band_aliases(
    requested: &[String],
    available: &[String],
) -> Result<Vec<String>, HarvestError> {
    let resolved: Vec<String> = available
        .iter()
        .filter(|band| requested.iter().any(|wanted| matches_alias(band, wanted)))
        .cloned()
        .collect();

    if resolved.is_empty() {
        return Err(HarvestError::NoBandsSelected {
            requested: requested.to_vec(),
            available: available.to_vec(),
        });
    }
    Ok(resolved)
}

fn matches_alias(band: &str, wanted: &str) -> bool {
    band == wanted
        || band
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with('_'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_exact_names_match() {
        let resolved =
            resolve_band_aliases(&names(&["SR_B2"]), &names(&["SR_B1", "SR_B2"])).unwrap();
        assert_eq!(resolved, names(&["SR_B2"]));
    }

    #[test]
    fn test_reducer_suffix_matches_by_prefix() {
        let available = names(&["SR_B2_median", "NDVI_median", "QA_PIXEL_median"]);
        let resolved = resolve_band_aliases(&names(&["NDVI", "SR_B2"]), &available).unwrap();
        assert_eq!(resolved, names(&["SR_B2_median", "NDVI_median"]));
    }

    #[test]
    fn test_prefix_without_separator_does_not_match() {
        // SR_B1 must not capture SR_B10.
        let available = names(&["SR_B1_mean", "SR_B10_mean"]);
        let resolved = resolve_band_aliases(&names(&["SR_B1"]), &available).unwrap();
        assert_eq!(resolved, names(&["SR_B1_mean"]));
    }

    #[test]
    fn test_no_match_lists_available_bands() {
        let err = resolve_band_aliases(&names(&["B99"]), &names(&["B1", "B2"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("B99"), "{msg}");
        assert!(msg.contains("\"B1\", \"B2\""), "{msg}");
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let err = resolve_band_aliases(&[], &names(&["B1"])).unwrap_err();
        assert!(matches!(err, HarvestError::NoBandsSelected { .. }));
    }
}
