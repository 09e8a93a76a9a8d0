//! Static allow-list of collections with known preprocessing semantics.
//!
//! Collections outside this list can still be harvested, but cloud masking,
//! scale/offset normalization and spectral index band mapping are unavailable.

/// How clouds and shadows are flagged in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudMask {
    /// Landsat Collection 2 `QA_PIXEL` bit flags (dilated cloud, cirrus, cloud, shadow).
    LandsatQa {
        band: &'static str,
        /// Bits that must all be clear for a pixel to be kept.
        bitmask: u32,
    },
    /// Sentinel-2 per-pixel cloud probability band (0-100).
    CloudProbability { band: &'static str },
}

/// Linear scaling applied to bands matching `pattern` (a band-name regex).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScaling {
    pub pattern: &'static str,
    pub scale: f64,
    pub offset: f64,
}

/// One allow-listed collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportedCollection {
    pub id: &'static str,
    pub description: &'static str,
    pub cloud_mask: Option<CloudMask>,
    pub scaling: &'static [BandScaling],
    /// Spectral index band letter to collection band name.
    pub band_map: &'static [(&'static str, &'static str)],
}

impl SupportedCollection {
    /// Collection band standing in for a spectral index band letter.
    #[must_use]
    pub fn band_for(&self, letter: &str) -> Option<&'static str> {
        self.band_map
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, band)| *band)
    }
}

const LANDSAT_QA: CloudMask = CloudMask::LandsatQa {
    band: "QA_PIXEL",
    bitmask: 0b1_1110,
};

const LANDSAT_SCALING: &[BandScaling] = &[
    BandScaling {
        pattern: "SR_B.*",
        scale: 0.000_027_5,
        offset: -0.2,
    },
    BandScaling {
        pattern: "ST_B.*",
        scale: 0.003_418_02,
        offset: 149.0,
    },
];

const LANDSAT_TM_BANDS: &[(&str, &str)] = &[
    ("B", "SR_B1"),
    ("G", "SR_B2"),
    ("R", "SR_B3"),
    ("N", "SR_B4"),
    ("S1", "SR_B5"),
    ("S2", "SR_B7"),
    ("T", "ST_B6"),
];

const LANDSAT_OLI_BANDS: &[(&str, &str)] = &[
    ("A", "SR_B1"),
    ("B", "SR_B2"),
    ("G", "SR_B3"),
    ("R", "SR_B4"),
    ("N", "SR_B5"),
    ("S1", "SR_B6"),
    ("S2", "SR_B7"),
    ("T", "ST_B10"),
];

const SENTINEL2_BANDS: &[(&str, &str)] = &[
    ("A", "B1"),
    ("B", "B2"),
    ("G", "B3"),
    ("R", "B4"),
    ("RE1", "B5"),
    ("RE2", "B6"),
    ("RE3", "B7"),
    ("N", "B8"),
    ("N2", "B8A"),
    ("WV", "B9"),
    ("S1", "B11"),
    ("S2", "B12"),
];

/// Every allow-listed collection.
pub const SUPPORTED_COLLECTIONS: &[SupportedCollection] = &[
    SupportedCollection {
        id: "LANDSAT/LT05/C02/T1_L2",
        description: "Landsat 5 TM Surface Reflectance",
        cloud_mask: Some(LANDSAT_QA),
        scaling: LANDSAT_SCALING,
        band_map: LANDSAT_TM_BANDS,
    },
    SupportedCollection {
        id: "LANDSAT/LE07/C02/T1_L2",
        description: "Landsat 7 ETM+ Surface Reflectance",
        cloud_mask: Some(LANDSAT_QA),
        scaling: LANDSAT_SCALING,
        band_map: LANDSAT_TM_BANDS,
    },
    SupportedCollection {
        id: "LANDSAT/LC08/C02/T1_L2",
        description: "Landsat 8 OLI/TIRS Surface Reflectance",
        cloud_mask: Some(LANDSAT_QA),
        scaling: LANDSAT_SCALING,
        band_map: LANDSAT_OLI_BANDS,
    },
    SupportedCollection {
        id: "LANDSAT/LC09/C02/T1_L2",
        description: "Landsat 9 OLI-2/TIRS-2 Surface Reflectance",
        cloud_mask: Some(LANDSAT_QA),
        scaling: LANDSAT_SCALING,
        band_map: LANDSAT_OLI_BANDS,
    },
    SupportedCollection {
        id: "COPERNICUS/S2_SR",
        description: "Sentinel-2 Surface Reflectance",
        cloud_mask: Some(CloudMask::CloudProbability { band: "MSK_CLDPRB" }),
        scaling: &[BandScaling {
            pattern: "B.*",
            scale: 0.0001,
            offset: 0.0,
        }],
        band_map: SENTINEL2_BANDS,
    },
    SupportedCollection {
        id: "CSIRO/SLGA",
        description: "Soil and Landscape Grid of Australia (SLGA)",
        cloud_mask: None,
        scaling: &[],
        band_map: &[],
    },
];

/// Looks up an allow-listed collection by exact id.
#[must_use]
pub fn lookup(collection_id: &str) -> Option<&'static SupportedCollection> {
    SUPPORTED_COLLECTIONS.iter().find(|c| c.id == collection_id)
}
