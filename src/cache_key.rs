//! Deterministic fingerprints naming downloaded artifacts.
//!
//! The key is a usability hash, not a security hash: SHA-256 over the ordered
//! concatenation of the stringified inputs, truncated to 4 bytes (8 hex chars).
//! Band order is significant and preserved as the user wrote it.
//!
//! The default key covers `(collection, date_min, date_max, bands, reduce, scale)`.
//! Requests differing only in masking, clipping, or spectral indices share a key,
//! so the second one is skipped as already downloaded. [`build_widened`] covers
//! those fields as well for callers that need the stronger guarantee.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::reducer::Reducer;
use crate::request::RequestSpec;

/// Number of digest bytes kept in the fingerprint.
const KEY_BYTES: usize = 4;

/// An 8-character lowercase hex fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the fingerprint for the given request attributes.
#[must_use]
pub fn build(
    collection: &str,
    date_min: &str,
    date_max: Option<&str>,
    bands: Option<&[String]>,
    reduce: Option<Reducer>,
    scale: f64,
) -> CacheKey {
    let parts = [
        collection.to_string(),
        date_min.to_string(),
        optional(date_max),
        list(bands),
        optional(reduce.map(Reducer::as_str)),
        scale.to_string(),
    ];
    digest(&parts)
}

/// Builds the default fingerprint for a request.
#[must_use]
pub fn for_request(spec: &RequestSpec) -> CacheKey {
    build(
        spec.collection(),
        spec.date_min().as_str(),
        spec.date_max().map(|d| d.as_str()),
        spec.bands(),
        spec.reduce(),
        spec.scale(),
    )
}

/// Builds a fingerprint that also covers masking, clipping and spectral indices.
///
/// Not used by the harvester; see the module docs.
#[must_use]
pub fn build_widened(spec: &RequestSpec) -> CacheKey {
    let base = for_request(spec);
    let parts = [
        base.0,
        spec.mask_clouds().to_string(),
        spec.mask_probability().to_string(),
        spec.clip().to_string(),
        list(spec.spectral_indices()),
    ];
    digest(&parts)
}

fn optional(value: Option<&str>) -> String {
    value.map_or_else(|| "None".to_string(), str::to_string)
}

fn list(values: Option<&[String]>) -> String {
    match values {
        None => "None".to_string(),
        Some(values) => format!("{values:?}"),
    }
}

fn digest(parts: &[String]) -> CacheKey {
    let full = parts.concat();
    let hash = Sha256::digest(full.as_bytes());
    let hex = hash[..KEY_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    CacheKey(hex)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bands(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_key_is_eight_lowercase_hex_chars() {
        let key = build("COPERNICUS/S2_SR", "2020-01-01", None, None, None, 10.0);
        assert_eq!(key.as_str().len(), 8);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identical_inputs_yield_identical_keys() {
        let b = bands(&["B1", "B2"]);
        let first = build("A", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.0);
        let second = build("A", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_band_order_changes_key() {
        let forward = bands(&["B1", "B2"]);
        let reversed = bands(&["B2", "B1"]);
        let a = build("A", "2019-01-01", None, Some(&forward), None, 30.0);
        let b = build("A", "2019-01-01", None, Some(&reversed), None, 30.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_each_field_participates() {
        let b = bands(&["B1"]);
        let base = build("A", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.0);
        assert_ne!(base, build("B", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.0));
        assert_ne!(base, build("A", "2019-01-02", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.0));
        assert_ne!(base, build("A", "2019-01-01", None, Some(&b), Some(Reducer::Median), 30.0));
        assert_ne!(base, build("A", "2019-01-01", Some("2019-02-01"), None, Some(Reducer::Median), 30.0));
        assert_ne!(base, build("A", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Mean), 30.0));
        assert_ne!(base, build("A", "2019-01-01", Some("2019-02-01"), Some(&b), Some(Reducer::Median), 30.5));
    }
}
