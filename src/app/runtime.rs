use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::ProcessExit;
use crate::app::{commands, config_runtime, terminal};
use crate::app_config::load_default_file_config;
use crate::cli::{Cli, Command, ConfigCommand};

pub(crate) async fn run_geoharvest() -> Result<ProcessExit> {
    let cli = Cli::parse();

    let loaded = load_default_file_config()?;
    let settings = config_runtime::resolve_settings(&cli, loaded.config.as_ref());

    let default_level = config_runtime::resolve_default_log_level(&settings);
    let no_color = terminal::is_no_color_requested(cli.no_color);
    terminal::init_tracing(default_level, no_color);
    debug!(?cli, "CLI arguments parsed");

    match &cli.command {
        Command::Auto(args) => commands::run_auto(args, &settings).await,
        Command::Collect(args) => commands::run_collect(args, &settings).await,
        Command::Validate(args) => commands::run_validate(args),
        Command::Template { path } => commands::run_template(path),
        Command::Classify { collection, list } => {
            let collection = if *list { None } else { collection.as_deref() };
            if collection.is_none() && !*list {
                eprintln!("Error: give a collection id, or --list for the supported collections");
                return Ok(ProcessExit::Usage);
            }
            commands::run_classify(collection, &settings).await
        }
        Command::Config {
            command: ConfigCommand::Show,
        } => Ok(commands::run_config_show(&settings, &loaded)),
    }
}
