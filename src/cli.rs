//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Harvest preprocessed satellite imagery from a remote compute service.
///
/// Describe an area of interest, a time range and a collection, either as a
/// YAML document or as flags, and get a cloud-masked, reduced GeoTIFF back.
#[derive(Parser, Debug)]
#[command(name = "geoharvest")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Compute service REST root (overrides config file)
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    /// Environment variable holding the bearer token (overrides config file)
    #[arg(long, global = true)]
    pub token_env: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest every collection of a YAML configuration document
    Auto(AutoArgs),

    /// Harvest one collection described by flags
    Collect(CollectArgs),

    /// Validate a configuration document against the schema
    Validate(ValidateArgs),

    /// Write a commented starter configuration document
    Template {
        /// Destination file
        #[arg(default_value = "geoharvest.yaml")]
        path: PathBuf,
    },

    /// Check whether a collection exists and is supported
    Classify {
        /// Collection id, e.g. LANDSAT/LC08/C02/T1_L2
        collection: Option<String>,

        /// List the supported collections instead
        #[arg(long, conflicts_with = "collection")]
        list: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct AutoArgs {
    /// YAML configuration document
    pub config: PathBuf,

    /// Output directory (overrides the document's outpath)
    #[arg(short, long)]
    pub outpath: Option<PathBuf>,

    /// Validate against a custom schema file
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Show a spinner while remote steps run
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Collection id
    #[arg(long)]
    pub collection: Option<String>,

    /// Bounding box (min_lon,min_lat,max_lon,max_lat) or a point (lon,lat)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub coords: Option<Vec<f64>>,

    /// Start date, YYYY-MM-DD or YYYY
    #[arg(long)]
    pub date_min: Option<String>,

    /// End date, YYYY-MM-DD or YYYY (default: today)
    #[arg(long)]
    pub date_max: Option<String>,

    /// Buffer around a point, in metres
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Use a square instead of a circle around a point
    #[arg(long)]
    pub bound: bool,

    /// Skip cloud and shadow masking
    #[arg(long)]
    pub no_mask: bool,

    /// Cloud probability threshold (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub mask_probability: Option<u8>,

    /// Reducer: median, mean, sum, mode, max, min or mosaic
    #[arg(long, conflicts_with = "no_reduce")]
    pub reduce: Option<String>,

    /// Keep every image instead of reducing
    #[arg(long)]
    pub no_reduce: bool,

    /// Spectral indices to add, e.g. NDVI,EVI
    #[arg(long, value_delimiter = ',')]
    pub spectral: Option<Vec<String>>,

    /// Bands to download, e.g. SR_B2,SR_B3,NDVI
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<String>>,

    /// Resolution in metres
    #[arg(long)]
    pub scale: Option<f64>,

    /// Do not clip images to the region
    #[arg(long)]
    pub no_clip: bool,

    /// Output directory
    #[arg(short, long)]
    pub outpath: Option<PathBuf>,

    /// Download again even if the file exists
    #[arg(long)]
    pub overwrite: bool,

    /// Show a spinner while remote steps run
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// YAML configuration document
    pub config: PathBuf,

    /// Reject keys the schema does not know
    #[arg(long)]
    pub strict: bool,

    /// Custom schema file
    #[arg(long)]
    pub schema: Option<PathBuf>,
}
