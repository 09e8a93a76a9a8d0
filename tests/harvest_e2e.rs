//! End-to-end harvests of configuration documents against a scripted compute service.

mod support;

use std::path::Path;
use std::sync::Arc;

use geoharvest::{
    CollectionCatalog, ConfigResolver, DocumentSource, FetchOutcome, HarvestError, Harvester,
    Progress, Session, SpectralIndexRegistry, Strictness,
};
use support::{LANDSAT, SENTINEL, ScriptedService, StaticCatalog};
use tempfile::TempDir;

fn harvester(service: Arc<ScriptedService>) -> Harvester {
    let catalog = Arc::new(StaticCatalog::new(&[LANDSAT, SENTINEL]));
    Harvester::new(
        Arc::new(Session::with_token("integration-token")),
        service,
        Arc::new(CollectionCatalog::new(catalog.clone())),
        Arc::new(SpectralIndexRegistry::new(catalog)),
        Progress::Hidden,
    )
}

fn resolver(outpath: &Path) -> ConfigResolver {
    ConfigResolver::with_builtin_schema(Strictness::Lenient)
        .expect("builtin schema should load")
        .with_outpath(Some(outpath.to_path_buf()))
}

fn document(yaml: &str) -> DocumentSource {
    DocumentSource::Value(serde_yaml::from_str(yaml).expect("test document should parse"))
}

fn landsat_document(date_min: &str, date_max: &str) -> String {
    format!(
        "\
target_bbox: [149.799, -30.31, 149.80, -30.309]
date_min: {date_min}
date_max: {date_max}
target_sources:
  GEE:
    preprocess:
      collection: {LANDSAT}
      mask_clouds: true
      reduce: median
      spectral: NDVI
    download:
      bands: [NDVI, SR_B2]
"
    )
}

#[tokio::test]
async fn test_landsat_median_exports_suffixed_bands() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());

    let report = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&landsat_document("2019-01-01", "2019-02-01")))
        .await
        .expect("document should resolve");

    assert_eq!(report.profiles.len(), 1);
    let result = report.completed().next().expect("profile should succeed");
    assert_eq!(result.image_count, 2);
    assert_eq!(result.bands, vec!["SR_B2_median", "NDVI_median"]);
    assert_eq!(result.report.outcome, FetchOutcome::Downloaded);

    let filename = &result.report.filenames[0];
    assert!(filename.starts_with("ee_LANDSAT_"), "unexpected name {filename}");
    assert!(filename.ends_with(".tif"));
    assert!(temp_dir.path().join(filename).exists());
}

#[tokio::test]
async fn test_empty_date_window_stops_before_transformations() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());

    let report = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&landsat_document("2019-02-01", "2019-02-02")))
        .await
        .expect("document should resolve");

    let (collection, error) = report.failed().next().expect("profile should fail");
    assert_eq!(collection, LANDSAT);
    assert!(
        matches!(error, HarvestError::EmptyCollection { date_min, .. } if date_min == "2019-02-01"),
        "unexpected error: {error}"
    );
    assert!(service.called("count"));
    assert!(!service.called("mask_clouds"));
    assert!(!service.called("reduce"));
    assert!(!service.called("export_image"));
}

#[tokio::test]
async fn test_bare_year_end_keeps_images_from_december_31() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new().with_image(LANDSAT, "2019-12-31", "LC08_091084_20191231"));

    let report = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&landsat_document("2019-12-01", "2019")))
        .await
        .expect("document should resolve");

    assert_eq!(report.failed().count(), 0, "unexpected failure");
    let result = report.completed().next().expect("profile should succeed");
    assert_eq!(result.image_count, 1);
    assert!(service.called("export_image"));
}

#[tokio::test]
async fn test_two_collections_run_as_two_profiles() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());
    let yaml = format!(
        "\
target_bbox: [149.799, -30.31, 149.80, -30.309]
date_min: 2019
date_max: 2019
target_sources:
  GEE:
    preprocess:
      collection: [{LANDSAT}, {SENTINEL}]
      reduce: median
    download:
      bands: [[SR_B2, SR_B3], [B8]]
"
    );

    let report = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&yaml))
        .await
        .expect("document should resolve");

    assert_eq!(report.profiles.len(), 2);
    assert_eq!(report.failed().count(), 0);
    let bands: Vec<_> = report.completed().map(|r| r.bands.clone()).collect();
    assert_eq!(bands[0], vec!["SR_B2_median", "SR_B3_median"]);
    assert_eq!(bands[1], vec!["B8_median"]);

    let filenames = report.filenames();
    assert!(filenames[0].starts_with("ee_LANDSAT_"));
    assert!(filenames[1].starts_with("ee_COPERNICUS_"));
    assert_eq!(
        service.calls().iter().filter(|c| *c == "export_image").count(),
        2
    );
}

#[tokio::test]
async fn test_unknown_reducer_fails_before_any_remote_call() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());
    let yaml = landsat_document("2019-01-01", "2019-02-01").replace("reduce: median", "reduce: monkey");

    let err = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&yaml))
        .await
        .expect_err("monkey is not a reducer");

    let HarvestError::UnsupportedReducer { name, allowed } = err else {
        panic!("expected UnsupportedReducer, got {err}");
    };
    assert_eq!(name, "monkey");
    assert!(allowed.contains(&"median"));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_band_list_count_mismatch_runs_no_profile() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());
    let yaml = format!(
        "\
target_bbox: [149.799, -30.31, 149.80, -30.309]
date_min: 2019-01-01
target_sources:
  GEE:
    preprocess:
      collection: [{LANDSAT}, {SENTINEL}]
    download:
      bands: [[SR_B2]]
"
    );

    let err = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&yaml))
        .await
        .expect_err("one band list for two collections");

    assert!(matches!(err, HarvestError::InvalidBandsShape { collections: 2, .. }), "got {err}");
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_repeated_document_is_served_from_disk() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());
    let harvester = harvester(service.clone());
    let resolver = resolver(temp_dir.path());
    let source = document(&landsat_document("2019-01-01", "2019-02-01"));

    let first = harvester.harvest_document(&resolver, &source).await.unwrap();
    let second = harvester.harvest_document(&resolver, &source).await.unwrap();

    assert_eq!(first.filenames(), second.filenames());
    let outcome = second.completed().next().unwrap().report.outcome;
    assert_eq!(outcome, FetchOutcome::Skipped);
    assert_eq!(
        service.calls().iter().filter(|c| *c == "export_image").count(),
        1
    );
}

#[tokio::test]
async fn test_unreduced_collection_writes_one_file_per_image() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let service = Arc::new(ScriptedService::new());
    let yaml = landsat_document("2019-01-01", "2019-12-31").replace("reduce: median", "reduce: null");

    let report = harvester(service.clone())
        .harvest_document(&resolver(temp_dir.path()), &document(&yaml))
        .await
        .unwrap();

    let result = report.completed().next().expect("profile should succeed");
    assert_eq!(result.bands, vec!["SR_B2", "NDVI"]);
    assert!(result.report.destination.is_dir());
    let mut files: Vec<_> = std::fs::read_dir(&result.report.destination)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "LC08_091084_20190115.tif",
            "LC08_091084_20190131.tif",
            "LC08_091084_20190304.tif"
        ]
    );
}
