//! Artifact naming for exported rasters.

use std::collections::HashSet;

use crate::cache_key::CacheKey;

/// File name of a composite image: `ee_<prefix>_<key>.tif`.
#[must_use]
pub fn image_filename(collection_prefix: &str, key: &CacheKey) -> String {
    format!("{}.tif", collection_dirname(collection_prefix, key))
}

/// Directory holding the per-image files of an unreduced collection.
#[must_use]
pub fn collection_dirname(collection_prefix: &str, key: &CacheKey) -> String {
    format!("ee_{}_{key}", sanitize_component(collection_prefix))
}

/// File name for one source image of a collection: `<image id>.tif`.
#[must_use]
pub fn image_id_filename(image_id: &str) -> String {
    let stem = sanitize_component(image_id);
    if stem.is_empty() {
        "image.tif".to_string()
    } else {
        format!("{stem}.tif")
    }
}

/// File names for a batch of image ids, one per id and all distinct.
///
/// Ids that sanitize to the same name get a `_2`, `_3`, ... suffix in input
/// order, so no export in the batch overwrites another.
#[must_use]
pub fn image_id_filenames<S: AsRef<str>>(image_ids: &[S]) -> Vec<String> {
    let mut used = HashSet::with_capacity(image_ids.len());
    image_ids
        .iter()
        .map(|id| {
            let name = image_id_filename(id.as_ref());
            if used.insert(name.clone()) {
                return name;
            }
            let stem = name.trim_end_matches(".tif");
            (2..)
                .map(|n| format!("{stem}_{n}.tif"))
                .find(|candidate| !used.contains(candidate))
                .map(|unique| {
                    used.insert(unique.clone());
                    unique
                })
                .unwrap_or(name)
        })
        .collect()
}

/// Replaces each path separator or shell-hostile character with `_`.
fn sanitize_component(value: &str) -> String {
    let mapped: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '.' | '_') { c } else { '_' })
        .collect();
    if mapped.chars().all(|c| c == '_') {
        String::new()
    } else {
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key;

    fn key() -> CacheKey {
        cache_key::build("LANDSAT/LC08/C02/T1_L2", "2019-01-01", None, None, None, 100.0)
    }

    #[test]
    fn test_image_filename_uses_prefix_and_key() {
        let key = key();
        assert_eq!(image_filename("LANDSAT", &key), format!("ee_LANDSAT_{key}.tif"));
    }

    #[test]
    fn test_collection_dirname_has_no_extension() {
        let key = key();
        assert_eq!(collection_dirname("COPERNICUS", &key), format!("ee_COPERNICUS_{key}"));
    }

    #[test]
    fn test_image_id_filename_sanitizes_separators() {
        assert_eq!(image_id_filename("LC08_091084_20190115"), "LC08_091084_20190115.tif");
        assert_eq!(image_id_filename("a/b:c"), "a_b_c.tif");
        assert_eq!(image_id_filename("///"), "image.tif");
    }

    #[test]
    fn test_separator_runs_are_kept_per_character() {
        assert_eq!(image_id_filename("a//b"), "a__b.tif");
        assert_ne!(image_id_filename("a//b"), image_id_filename("a/b"));
    }

    #[test]
    fn test_colliding_ids_get_distinct_filenames() {
        let names = image_id_filenames(&["a__b", "a/_b", "a_/b", "c"]);
        assert_eq!(names, vec!["a__b.tif", "a__b_2.tif", "a__b_3.tif", "c.tif"]);
    }
}
