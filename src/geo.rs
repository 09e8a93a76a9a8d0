//! Area-of-interest geometry: bounding boxes, regions and resolution conversion.
//!
//! All coordinates are WGS84 degrees in `[lon, lat]` order.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::HarvestError;

/// Degrees of padding applied around tabular coordinates when deriving a bbox.
pub const DEFAULT_POINT_PADDING_DEG: f64 = 0.05;

/// An axis-aligned bounding box `(min_lon, min_lat, max_lon, max_lat)`.
///
/// Construction guarantees `min_lon < max_lon` and `min_lat < max_lat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Creates a validated bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::BoundingBox`] when a value is not finite, out of
    /// WGS84 range, or the box is empty or inverted.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, HarvestError> {
        let values = [min_lon, min_lat, max_lon, max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(HarvestError::bounding_box(format!(
                "coordinates must be finite numbers, got {values:?}"
            )));
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(HarvestError::bounding_box(format!(
                "longitude out of range [-180, 180] in {values:?}"
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(HarvestError::bounding_box(format!(
                "latitude out of range [-90, 90] in {values:?}"
            )));
        }
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(HarvestError::bounding_box(format!(
                "expected min_lon < max_lon and min_lat < max_lat, got {values:?}"
            )));
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Creates a bounding box from exactly four ordered numbers.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::BoundingBox`] when the slice does not hold four
    /// values or they do not form a valid box.
    pub fn from_slice(values: &[f64]) -> Result<Self, HarvestError> {
        match values {
            [min_lon, min_lat, max_lon, max_lat] => Self::new(*min_lon, *min_lat, *max_lon, *max_lat),
            _ => Err(HarvestError::bounding_box(format!(
                "expected 4 numbers [min_lon, min_lat, max_lon, max_lat], got {}",
                values.len()
            ))),
        }
    }

    /// Derives a bounding box enclosing `(lon, lat)` points padded by `padding_deg`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::BoundingBox`] when no points are supplied or the
    /// padded extent is invalid.
    pub fn from_points<I>(points: I, padding_deg: f64) -> Result<Self, HarvestError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut extent: Option<[f64; 4]> = None;
        for (lon, lat) in points {
            extent = Some(match extent {
                None => [lon, lat, lon, lat],
                Some([a, b, c, d]) => [a.min(lon), b.min(lat), c.max(lon), d.max(lat)],
            });
        }
        let Some([min_lon, min_lat, max_lon, max_lat]) = extent else {
            return Err(HarvestError::bounding_box("no coordinates found in input file"));
        };
        Self::new(
            min_lon - padding_deg,
            min_lat - padding_deg,
            max_lon + padding_deg,
            max_lat + padding_deg,
        )
    }

    #[must_use]
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    #[must_use]
    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Returns `[min_lon, min_lat, max_lon, max_lat]`.
    #[must_use]
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Latitude at the vertical centre of the box.
    #[must_use]
    pub fn center_lat(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }

    /// Closed GeoJSON polygon ring for this box.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [self.min_lon, self.min_lat],
                [self.max_lon, self.min_lat],
                [self.max_lon, self.max_lat],
                [self.min_lon, self.max_lat],
                [self.min_lon, self.min_lat],
            ]],
        })
    }
}

/// Spatial region used for clipping and export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// The bounding box itself.
    Rectangle(BoundingBox),
    /// A circular buffer around a point; `envelope` is its bounding box.
    Circle {
        lon: f64,
        lat: f64,
        radius_m: f64,
        envelope: BoundingBox,
    },
}

impl Region {
    /// Builds a region around a point buffered by `radius_m` metres.
    ///
    /// With `bound` set the region is the square envelope, otherwise a circle.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::BoundingBox`] when the radius is not positive or
    /// the envelope leaves WGS84 range.
    pub fn buffered_point(lon: f64, lat: f64, radius_m: f64, bound: bool) -> Result<Self, HarvestError> {
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Err(HarvestError::bounding_box(format!(
                "a point needs a positive buffer in metres, got {radius_m}"
            )));
        }
        let dlat = radius_m / meters_per_degree_lat(lat);
        let dlon = radius_m / meters_per_degree_lon(lat);
        let envelope = BoundingBox::new(lon - dlon, lat - dlat, lon + dlon, lat + dlat)?;
        if bound {
            Ok(Self::Rectangle(envelope))
        } else {
            Ok(Self::Circle {
                lon,
                lat,
                radius_m,
                envelope,
            })
        }
    }

    /// Bounding box of the region.
    #[must_use]
    pub fn bbox(&self) -> BoundingBox {
        match self {
            Self::Rectangle(bbox) => *bbox,
            Self::Circle { envelope, .. } => *envelope,
        }
    }

    /// GeoJSON polygon for the region. Circles are approximated by a closed ring.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        match self {
            Self::Rectangle(bbox) => bbox.to_geojson(),
            Self::Circle {
                lon, lat, radius_m, ..
            } => {
                let dlat = radius_m / meters_per_degree_lat(*lat);
                let dlon = radius_m / meters_per_degree_lon(*lat);
                let mut ring: Vec<[f64; 2]> = (0..CIRCLE_VERTICES)
                    .map(|i| {
                        let theta = std::f64::consts::TAU * f64::from(i) / f64::from(CIRCLE_VERTICES);
                        [lon + dlon * theta.cos(), lat + dlat * theta.sin()]
                    })
                    .collect();
                ring.push(ring[0]);
                json!({ "type": "Polygon", "coordinates": [ring] })
            }
        }
    }
}

/// Vertices used to approximate a circular region.
const CIRCLE_VERTICES: u32 = 64;

/// Length in metres of one degree of latitude at `lat_deg` (WGS84 series).
#[must_use]
pub fn meters_per_degree_lat(lat_deg: f64) -> f64 {
    let phi = lat_deg.to_radians();
    111_132.92 - 559.82 * (2.0 * phi).cos() + 1.175 * (4.0 * phi).cos() - 0.0023 * (6.0 * phi).cos()
}

/// Length in metres of one degree of longitude at `lat_deg` (WGS84 series).
#[must_use]
pub fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    let phi = lat_deg.to_radians();
    111_412.84 * phi.cos() - 93.5 * (3.0 * phi).cos() + 0.118 * (5.0 * phi).cos()
}

/// Converts a resolution in arc-seconds to `(x_metres, y_metres)` at `lat_deg`.
#[must_use]
pub fn arcsec_to_meters(arcsec: f64, lat_deg: f64) -> (f64, f64) {
    let degrees = arcsec / 3600.0;
    (
        degrees * meters_per_degree_lon(lat_deg),
        degrees * meters_per_degree_lat(lat_deg),
    )
}
