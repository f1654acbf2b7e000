//! EKMA analysis over the bundled demo data, including run persistence.

use oz_app::*;
use oz_ekma::Regime;
use oz_results::RunPayload;
use std::fs;
use std::path::PathBuf;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn demo_observations_produce_a_classified_surface() {
    let config = load_config(&demos().join("configs/observations_only.yaml")).unwrap();
    let loaded = load_observations(&demos().join("data/observations.csv")).unwrap();
    assert_eq!(loaded.set.len(), 60);
    assert!(loaded.set.rows()[0].timestamp.is_some());

    let outcome = run_ekma(&config, &loaded.set).unwrap();
    assert_eq!(outcome.grid.shape(), (40, 60));
    assert!(outcome.ridge.len() >= 2);
    assert_ne!(outcome.regime, Regime::Undetermined);
    assert!(outcome.mean_abs_slope.is_some());
    assert!(outcome.segments.is_empty());
}

#[test]
fn saved_ekma_run_can_be_listed_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("screening.yaml");
    fs::copy(demos().join("configs/observations_only.yaml"), &config_path).unwrap();

    let config = load_config(&config_path).unwrap();
    let loaded = load_observations(&demos().join("data/observations.csv")).unwrap();
    let outcome = run_ekma(&config, &loaded.set).unwrap();

    let saved = save_ekma(&config_path, &config, &outcome, loaded.set.len(), &loaded.digest).unwrap();
    assert!(!saved.replaced);
    assert_eq!(saved.manifest.kind.label(), "ekma");
    assert!(dir.path().join(".ozonesens/runs").join(&saved.run_id).is_dir());

    // Same config and data give the same id.
    let again = save_ekma(&config_path, &config, &outcome, loaded.set.len(), &loaded.digest).unwrap();
    assert_eq!(again.run_id, saved.run_id);
    assert!(again.replaced);

    let runs = list_runs(&config_path).unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, payload) = load_run(&config_path, &saved.run_id[..10]).unwrap();
    assert_eq!(manifest.config_name, "observation-only screening");
    match payload {
        RunPayload::Ekma(record) => {
            assert_eq!(record.voc_axis.len(), 60);
            assert_eq!(record.o3.len(), 40);
            assert_eq!(record.regime, outcome.regime.label());
            assert_eq!(record.ridge.len(), outcome.ridge.len());
        }
        other => panic!("expected an EKMA payload, got {other:?}"),
    }

    assert_eq!(delete_run(&config_path, &saved.run_id).unwrap(), saved.run_id);
    assert!(matches!(
        load_run(&config_path, &saved.run_id),
        Err(AppError::RunNotFound(_))
    ));
}

#[test]
fn unknown_observation_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obs.txt");
    fs::write(&path, "VOC_ppb NOx_ppb O3_ppb\n").unwrap();
    assert!(matches!(load_observations(&path), Err(AppError::InvalidInput(_))));
    assert!(matches!(
        load_observations(&dir.path().join("missing.csv")),
        Err(AppError::FileRead { .. })
    ));
}
