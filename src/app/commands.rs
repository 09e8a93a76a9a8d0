//! Subcommand handlers.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use geoharvest::catalog::supported::SUPPORTED_COLLECTIONS;
use geoharvest::config::template::write_template;
use geoharvest::{
    CollectionCatalog, CollectionStatus, ConfigResolver, DocumentSource, HarvestArgs, HarvestResult,
    Harvester, HttpCatalogSource, Progress, RestComputeService, SchemaValidator, Session,
    SpectralIndexRegistry, Strictness, build_http_client,
};
use tracing::info;

use crate::ProcessExit;
use crate::app::config_runtime::{Settings, verbosity_label};
use crate::app::{exit_handler, terminal};
use crate::app_config::LoadedConfig;
use crate::cli::{AutoArgs, CollectArgs, ValidateArgs};

fn progress_for(requested: bool, settings: &Settings) -> Progress {
    Progress::from_flag(terminal::should_use_spinner(
        requested,
        io::stderr().is_terminal(),
        settings.quiet,
        terminal::is_dumb_terminal(),
    ))
}

fn catalog_source(settings: &Settings) -> Result<Arc<HttpCatalogSource>> {
    let client = build_http_client(settings.timeouts).context("Failed to build HTTP client")?;
    Ok(Arc::new(HttpCatalogSource::new(
        client,
        settings.catalog_url.clone(),
        settings.indices_url.clone(),
    )))
}

fn build_harvester(settings: &Settings, progress: Progress) -> Result<Harvester> {
    let client = build_http_client(settings.timeouts).context("Failed to build HTTP client")?;
    let session = Arc::new(Session::new(settings.token_env.clone()));
    let service = RestComputeService::new(client, &settings.service_url, Arc::clone(&session))?;
    let source = catalog_source(settings)?;
    Ok(Harvester::new(
        session,
        Arc::new(service),
        Arc::new(CollectionCatalog::new(source.clone())),
        Arc::new(SpectralIndexRegistry::new(source)),
        progress,
    ))
}

fn print_result(result: &HarvestResult) {
    for path in &result.report.paths {
        println!("{}", path.display());
    }
}

fn strictness(strict: bool) -> Strictness {
    if strict { Strictness::Strict } else { Strictness::Lenient }
}

fn validator(schema: Option<&Path>, strict: bool) -> Result<SchemaValidator> {
    let strictness = strictness(strict);
    let validator = match schema {
        Some(path) => SchemaValidator::from_path(path, strictness)?,
        None => SchemaValidator::builtin(strictness)?,
    };
    Ok(validator)
}

pub(crate) async fn run_auto(args: &AutoArgs, settings: &Settings) -> Result<ProcessExit> {
    let resolver = ConfigResolver::new(validator(args.schema.as_deref(), false)?)
        .with_outpath(args.outpath.clone())
        .with_default_outpath(settings.output_dir.clone());
    let harvester = build_harvester(settings, progress_for(args.progress, settings))?;
    let source = DocumentSource::from(args.config.clone());

    let report = harvester.harvest_document(&resolver, &source).await?;
    for result in report.completed() {
        print_result(result);
    }
    for (collection, error) in report.failed() {
        eprintln!("Error: {collection}: {error}");
    }

    let completed = report.completed().count();
    let failed = report.failed().count();
    info!(completed, failed, "Harvest complete");
    Ok(exit_handler::determine_exit_outcome(completed, failed))
}

pub(crate) async fn run_collect(args: &CollectArgs, settings: &Settings) -> Result<ProcessExit> {
    let harvest_args = HarvestArgs {
        collection: args.collection.clone(),
        coords: args.coords.clone(),
        date_min: args.date_min.clone(),
        date_max: args.date_max.clone(),
        buffer: args.buffer,
        bound: args.bound,
        mask_clouds: args.no_mask.then_some(false),
        mask_probability: args.mask_probability,
        reduce: args.reduce.clone(),
        no_reduce: args.no_reduce,
        spectral: args.spectral.clone(),
        bands: args.bands.clone(),
        scale: args.scale,
        clip: args.no_clip.then_some(false),
        outpath: args.outpath.clone().or_else(|| settings.output_dir.clone()),
        overwrite: args.overwrite,
    };
    let spec = ConfigResolver::from_args(harvest_args)?;
    let harvester = build_harvester(settings, progress_for(args.progress, settings))?;
    let result = harvester.harvest(&spec).await?;
    print_result(&result);
    Ok(ProcessExit::Success)
}

pub(crate) fn run_validate(args: &ValidateArgs) -> Result<ProcessExit> {
    let validator = validator(args.schema.as_deref(), args.strict)?;
    let report = validator.validate_path(&args.config)?;
    if report.is_valid() {
        println!("{}: valid", args.config.display());
        return Ok(ProcessExit::Success);
    }
    println!(
        "{}: {} violation(s)",
        args.config.display(),
        report.violations.len()
    );
    for violation in &report.violations {
        println!("  - {violation}");
    }
    Ok(ProcessExit::Failure)
}

pub(crate) fn run_template(path: &Path) -> Result<ProcessExit> {
    write_template(path)?;
    println!("Template written to {}", path.display());
    Ok(ProcessExit::Success)
}

pub(crate) async fn run_classify(collection: Option<&str>, settings: &Settings) -> Result<ProcessExit> {
    let Some(collection) = collection else {
        for supported in SUPPORTED_COLLECTIONS {
            println!("{:<28} {}", supported.id, supported.description);
        }
        return Ok(ProcessExit::Success);
    };
    let catalog = CollectionCatalog::new(catalog_source(settings)?);
    let status = catalog.classify(collection).await?;
    println!("{collection}: {status}");
    Ok(match status {
        CollectionStatus::Absent => ProcessExit::Failure,
        CollectionStatus::Supported | CollectionStatus::PresentUnsupported => ProcessExit::Success,
    })
}

pub(crate) fn run_config_show(settings: &Settings, loaded: &LoadedConfig) -> ProcessExit {
    let resolved_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file() {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("service_url = {}", settings.service_url);
    println!("catalog_url = {}", settings.catalog_url);
    println!("indices_url = {}", settings.indices_url);
    println!("token_env = {}", settings.token_env);
    println!(
        "output_dir = {}",
        settings
            .output_dir
            .as_ref()
            .map_or_else(|| "<per request>".to_string(), |dir| dir.display().to_string())
    );
    println!("connect_timeout_secs = {}", settings.timeouts.connect_secs);
    println!("read_timeout_secs = {}", settings.timeouts.read_secs);
    println!("verbosity = {}", verbosity_label(settings.verbose, settings.quiet));
    ProcessExit::Success
}
