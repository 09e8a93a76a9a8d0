//! Expansion of multi-collection documents into one profile per collection.

use tracing::info;

use super::document::{BandsValue, ResolvedDocument};
use crate::error::HarvestError;

/// True when the document names two or more collections.
#[must_use]
pub fn is_multi_collection(document: &ResolvedDocument) -> bool {
    document.preprocess().collection.len() > 1
}

/// Splits a multi-collection document into single-collection profiles.
///
/// Profile `i` gets collection `i` and band list `i`; everything else is
/// shared. A single-collection document is returned unchanged as the only
/// profile.
///
/// # Errors
///
/// Returns [`HarvestError::InvalidBandsShape`] unless the bands are a list of
/// lists with one entry per collection. No profile is produced in that case.
pub fn expand(document: &ResolvedDocument) -> Result<Vec<ResolvedDocument>, HarvestError> {
    if !is_multi_collection(document) {
        return Ok(vec![document.clone()]);
    }
    let collections = &document.preprocess().collection;
    let band_lists = match document.bands() {
        Some(BandsValue::Nested(lists)) if lists.len() == collections.len() => lists,
        Some(BandsValue::Nested(lists)) => {
            return Err(HarvestError::invalid_bands_shape(
                collections.len(),
                format!("expected {} band lists, got {}", collections.len(), lists.len()),
            ));
        }
        Some(_) => {
            return Err(HarvestError::invalid_bands_shape(
                collections.len(),
                "bands must be a list of lists when several collections are given",
            ));
        }
        None => {
            return Err(HarvestError::invalid_bands_shape(
                collections.len(),
                "no bands given; one band list per collection is required",
            ));
        }
    };

    info!(profiles = collections.len(), "Multiple collections detected, generating profiles");
    Ok(collections
        .iter()
        .zip(band_lists)
        .enumerate()
        .map(|(n, (collection, bands))| {
            info!(profile = n + 1, collection = %collection, ?bands, "Profile generated");
            let mut profile = document.clone();
            profile.target_sources.gee.preprocess.collection = vec![collection.clone()];
            profile.target_sources.gee.download.bands = Some(BandsValue::Flat(bands.clone()));
            profile
        })
        .collect())
}
