//! Effective settings: CLI flags over the config file over built-in defaults.

use std::path::PathBuf;

use geoharvest::catalog::source::{DEFAULT_COLLECTIONS_URL, DEFAULT_INDICES_URL};
use geoharvest::http_client::HttpTimeouts;
use geoharvest::service::DEFAULT_SERVICE_URL;
use geoharvest::session::DEFAULT_TOKEN_ENV;

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Cli;

/// Settings every command runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) service_url: String,
    pub(crate) catalog_url: String,
    pub(crate) indices_url: String,
    pub(crate) token_env: String,
    /// Output directory when neither flags nor the document name one.
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) verbose: u8,
    pub(crate) quiet: bool,
    pub(crate) timeouts: HttpTimeouts,
}

pub(crate) fn resolve_settings(cli: &Cli, file_config: Option<&FileConfig>) -> Settings {
    let file = file_config.cloned().unwrap_or_default();
    let mut timeouts = HttpTimeouts::default();
    if let Some(value) = file.connect_timeout_secs {
        timeouts.connect_secs = value;
    }
    if let Some(value) = file.read_timeout_secs {
        timeouts.read_secs = value;
    }

    let (verbose, quiet) = if cli.verbose > 0 || cli.quiet {
        (cli.verbose, cli.quiet)
    } else {
        match file.verbosity {
            Some(VerbositySetting::Verbose) => (1, false),
            Some(VerbositySetting::Debug) => (2, false),
            Some(VerbositySetting::Quiet) => (0, true),
            Some(VerbositySetting::Default) | None => (0, false),
        }
    };

    Settings {
        service_url: cli
            .service_url
            .clone()
            .or(file.service_url)
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
        catalog_url: file
            .catalog_url
            .unwrap_or_else(|| DEFAULT_COLLECTIONS_URL.to_string()),
        indices_url: file
            .indices_url
            .unwrap_or_else(|| DEFAULT_INDICES_URL.to_string()),
        token_env: cli
            .token_env
            .clone()
            .or(file.token_env)
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
        output_dir: file.output_dir,
        verbose,
        quiet,
        timeouts,
    }
}

pub(crate) fn resolve_default_log_level(settings: &Settings) -> &'static str {
    if settings.quiet {
        "error"
    } else {
        match settings.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn verbosity_label(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        VerbositySetting::Quiet.as_str()
    } else if verbose == 0 {
        VerbositySetting::Default.as_str()
    } else if verbose == 1 {
        VerbositySetting::Verbose.as_str()
    } else {
        VerbositySetting::Debug.as_str()
    }
}
