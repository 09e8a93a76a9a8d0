//! CLI entry point for geoharvest.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    /// Some profiles failed, others completed.
    Partial,
    Failure,
    /// Required arguments were missing.
    Usage,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial | Self::Usage => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_geoharvest().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(app::exit_handler::exit_for_error(&error).code())
        }
    }
}
