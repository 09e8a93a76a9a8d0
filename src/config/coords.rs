//! Point coordinates read from a CSV file.

use std::path::Path;

use csv::Reader;
use tracing::debug;

use crate::error::HarvestError;

/// Reads `(lon, lat)` pairs from the named columns of a CSV file with headers.
///
/// # Errors
///
/// - [`HarvestError::Io`] if the file cannot be opened.
/// - [`HarvestError::BoundingBox`] if a column is missing or a value is not a number.
pub fn read_points(path: &Path, lng_column: &str, lat_column: &str) -> Result<Vec<(f64, f64)>, HarvestError> {
    let mut reader = Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            HarvestError::bounding_box(format!(
                "column '{name}' not found in {} (columns: {})",
                path.display(),
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
    };
    let lng_idx = column(lng_column)?;
    let lat_idx = column(lat_column)?;

    let mut points = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let parse = |idx: usize, name: &str| -> Result<f64, HarvestError> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>().map_err(|_| {
                HarvestError::bounding_box(format!(
                    "row {} of {}: '{raw}' in column '{name}' is not a number",
                    row + 2,
                    path.display()
                ))
            })
        };
        points.push((parse(lng_idx, lng_column)?, parse(lat_idx, lat_column)?));
    }
    debug!(count = points.len(), file = %path.display(), "Read point coordinates");
    Ok(points)
}

fn csv_error(path: &Path, error: csv::Error) -> HarvestError {
    if let csv::ErrorKind::Io(_) = error.kind() {
        match error.into_kind() {
            csv::ErrorKind::Io(source) => HarvestError::io(path, source),
            other => HarvestError::bounding_box(format!("cannot read {}: {other:?}", path.display())),
        }
    } else {
        HarvestError::bounding_box(format!("cannot read {}: {error}", path.display()))
    }
}
