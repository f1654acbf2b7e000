//! RIR analysis driven through a shell script standing in for the box model.
#![cfg(unix)]

use oz_app::*;
use oz_project::{AnalysisConfig, from_yaml_str};
use oz_rir::{RirMethod, ScenarioStatus};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ORIGINAL: &[u8] = b"NO 1\n";

/// Peak O3 = 60 + 2 HCHO - 0.2 NO, reached at t = 60.
const LINEAR_MODEL: &str =
    r#"awk '{c[$1]=$2} END{print "t O3"; print 0, 1; print 60, 60 + 2*c["HCHO"] - 0.2*c["NO"]}' init.config > out.txt"#;

fn setup(script: &str, workers: usize, extra: &str) -> (TempDir, AnalysisConfig) {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model");
    fs::create_dir(&model).unwrap();
    fs::write(model.join("init.config"), ORIGINAL).unwrap();

    let yaml = format!(
        r#"
version: 1
name: scripted
rir:
  delta: 0.2
  baseline: {{ NO: 50.0, NO2: 30.0, HCHO: 6.0 }}
  targets:
    - {{ label: NOx, species: [NO, NO2] }}
    - {{ label: AVOC, species: [HCHO] }}
  reduction_factors: [0.5]
solver:
  program: sh
  args: ["-c", {script:?}]
  working_dir: model
  concentrations_file: init.config
  output_file: out.txt
  o3_column: O3
  time_column: t
  timeout_s: 20
  parallel_workers: {workers}
  scratch_dir: scratch
{extra}
"#
    );
    let config = from_yaml_str(&yaml).unwrap();
    oz_project::validate_config(&config).unwrap();
    (dir, config)
}

fn assert_untouched(dir: &Path) {
    assert_eq!(fs::read(dir.join("model/init.config")).unwrap(), ORIGINAL);
}

#[test]
fn finite_differences_from_scripted_solver() {
    let (dir, config) = setup(LINEAR_MODEL, 1, "");
    let outcome = run_rir(&config, dir.path(), None).unwrap();

    // baseline, two perturbations per target, one reduction per target
    assert_eq!(outcome.scenarios.len(), 7);
    assert!(outcome.scenarios.iter().all(|s| s.status() == ScenarioStatus::Ok));
    assert_eq!(outcome.scenarios[0].max_o3(), Some(62.0));

    let result = &outcome.result;
    assert_eq!(result.method, RirMethod::FiniteDifference);
    assert!((result.coefficient("NOx").unwrap() + 10.0 / 62.0).abs() < 1e-9);
    assert!((result.coefficient("AVOC").unwrap() - 12.0 / 62.0).abs() < 1e-9);
    assert!(result.skipped.is_empty());

    assert_eq!(outcome.reductions.len(), 2);
    let nox = &outcome.reductions[0];
    assert_eq!((nox.label.as_str(), nox.factor), ("NOx", 0.5));
    assert!((nox.rir.unwrap() + 10.0 / 62.0).abs() < 1e-9);
    assert_untouched(dir.path());
}

#[test]
fn parallel_workers_match_sequential_run() {
    let (dir, config) = setup(LINEAR_MODEL, 3, "");
    let outcome = run_rir(&config, dir.path(), None).unwrap();
    let ids: Vec<&str> = outcome.scenarios.iter().map(|s| s.scenario_id()).collect();
    assert_eq!(ids[0], "base");
    assert_eq!(&ids[1..5], ["NOx_minus", "NOx_plus", "AVOC_minus", "AVOC_plus"]);
    assert!((outcome.result.coefficient("NOx").unwrap() + 10.0 / 62.0).abs() < 1e-9);
    assert_untouched(dir.path());

    // worker copies are cleaned up after the run
    let scratch = dir.path().join("scratch");
    let leftovers = fs::read_dir(&scratch).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn concurrent_runs_sharing_a_scratch_dir_do_not_collide() {
    let (dir, config) = setup(LINEAR_MODEL, 3, "");
    let outcomes: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| s.spawn(|| run_rir(&config, dir.path(), None)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for outcome in outcomes {
        let outcome = outcome.unwrap();
        assert!(outcome.scenarios.iter().all(|s| s.status() == ScenarioStatus::Ok));
        assert!((outcome.result.coefficient("AVOC").unwrap() - 12.0 / 62.0).abs() < 1e-9);
    }
    let leftovers = fs::read_dir(dir.path().join("scratch")).unwrap().count();
    assert_eq!(leftovers, 0);
    assert_untouched(dir.path());
}

#[test]
fn scratch_dir_inside_working_dir_is_rejected() {
    let (dir, mut config) = setup(LINEAR_MODEL, 3, "");
    config.solver.as_mut().unwrap().scratch_dir = Some("model/scratch".to_string());
    let err = run_rir(&config, dir.path(), None).unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "{err}");
    assert!(!dir.path().join("model/scratch").exists());
    assert_untouched(dir.path());
}

#[test]
fn failing_solver_falls_back_without_observations() {
    let (dir, config) = setup("exit 3", 1, "");
    let outcome = run_rir(&config, dir.path(), None).unwrap();
    assert!(outcome.scenarios.iter().all(|s| s.status() == ScenarioStatus::SolverFailed));
    assert_eq!(outcome.result.method, RirMethod::FallbackDefault);
    assert_eq!(outcome.result.coefficient("NOx"), Some(1.8));
    assert!(outcome.result.note.as_deref().unwrap().contains("baseline"));
    assert_untouched(dir.path());
}

#[test]
fn sweep_turns_runs_into_observations() {
    let sweep = r#"
sweep:
  voc_species: [HCHO]
  nox_species: [NO, NO2]
  voc_factors: [0.5, 1.0, 2.0]
  nox_factors: [0.5, 1.0, 2.0]
"#;
    let (dir, config) = setup(LINEAR_MODEL, 1, sweep);
    let outcome = run_ekma_sweep(&config, dir.path()).unwrap();
    assert_eq!(outcome.scenarios.len(), 9);
    assert_eq!(outcome.observations.len(), 9);

    let first = &outcome.observations.rows()[0];
    assert_eq!((first.voc_ppb, first.nox_ppb), (3.0, 40.0));
    // 60 + 2 * 3 - 0.2 * 25
    assert!((first.o3_ppb - 61.0).abs() < 1e-9);
    assert_untouched(dir.path());
}

#[test]
fn rir_run_is_saved_with_scenarios() {
    let (dir, config) = setup(LINEAR_MODEL, 1, "");
    let config_path = dir.path().join("scripted.yaml");
    oz_project::save_yaml(&config_path, &config).unwrap();

    let outcome = run_rir(&config, dir.path(), None).unwrap();
    let saved = save_rir(&config_path, &config, &outcome, "").unwrap();
    assert_eq!(saved.manifest.kind.label(), "rir");

    let (_, payload) = load_run(&config_path, &saved.run_id).unwrap();
    match payload {
        oz_results::RunPayload::Rir(record) => {
            assert_eq!(record.method, "FINITE_DIFFERENCE");
            assert_eq!(record.scenarios.len(), 7);
            assert_eq!(record.scenarios[0].status, "OK");
            assert_eq!(record.reductions.len(), 2);
        }
        other => panic!("expected an RIR payload, got {other:?}"),
    }
}
