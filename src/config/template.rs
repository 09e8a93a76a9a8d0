//! Starter configuration document.

use std::path::Path;

use crate::error::HarvestError;

/// Commented template covering every supported key.
pub const TEMPLATE: &str = include_str!("../../data/template.yaml");

/// Writes the template to `path`. Refuses to replace an existing file.
///
/// # Errors
///
/// Returns [`HarvestError::Io`] if the file exists or cannot be written.
pub fn write_template(path: &Path) -> Result<(), HarvestError> {
    if path.exists() {
        return Err(HarvestError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "refusing to overwrite"),
        ));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
    }
    std::fs::write(path, TEMPLATE).map_err(|e| HarvestError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_write_template_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs/harvest.yaml");
        write_template(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TEMPLATE);
    }

    #[test]
    fn test_write_template_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.yaml");
        std::fs::write(&path, "keep me").unwrap();
        assert!(write_template(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}
