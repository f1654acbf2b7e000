use oz_project::*;
use std::collections::BTreeMap;

fn full_config() -> AnalysisConfig {
    AnalysisConfig {
        version: LATEST_VERSION,
        name: "roundtrip".to_string(),
        ekma: EkmaDef {
            voc_points: 40,
            nox_points: 30,
            method: InterpolationMethodDef::Linear,
            smoothing_sigma: 1.5,
            percentile_window: Some([5.0, 95.0]),
            thresholds: SlopeThresholdsDef {
                voc_limited_min: 3.0,
                nox_limited_max: 0.8,
            },
            ratio_thresholds: RatioThresholdsDef::default(),
            segment_window: Some(8),
        },
        rir: Some(RirDef {
            normalization: 100.0,
            strategy: StrategyDef::FiniteDifference,
            fallback_coefficients: BTreeMap::from([("NOx".to_string(), 1.8)]),
            baseline: BTreeMap::from([("NO".to_string(), 50.0), ("NO2".to_string(), 30.0)]),
            targets: vec![TargetDef {
                label: "NOx".to_string(),
                species: vec!["NO".to_string(), "NO2".to_string()],
            }],
            reduction_factors: vec![0.8, 0.5],
            ..RirDef::default()
        }),
        solver: Some(SolverDef {
            program: "./atchem2".to_string(),
            args: vec!["--quiet".to_string()],
            working_dir: "model".to_string(),
            concentrations_file: "configuration/initialConcentrations.config".to_string(),
            output_file: "output/speciesConcentrations.output".to_string(),
            o3_column: "O3".to_string(),
            time_column: Some("t".to_string()),
            ppb_to_molecules: Some(2.46e10),
            timeout_s: 120.0,
            parallel_workers: 4,
            scratch_dir: None,
        }),
        sweep: None,
    }
}

#[test]
fn roundtrip_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis.yaml");
    let config = full_config();
    save_yaml(&path, &config).unwrap();
    assert_eq!(load(&path).unwrap(), config);
}

#[test]
fn roundtrip_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis.json");
    let config = full_config();
    save_json(&path, &config).unwrap();
    assert_eq!(load(&path).unwrap(), config);
}

#[test]
fn save_refuses_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    let mut config = full_config();
    config.rir.as_mut().unwrap().delta = 2.0;
    assert!(matches!(
        save_yaml(&path, &config),
        Err(ProjectError::Validation(_))
    ));
    assert!(!path.exists());
}

#[test]
fn minimal_yaml_fills_defaults() {
    let config = from_yaml_str("version: 1\nname: bare\n").unwrap();
    assert_eq!(config.ekma, EkmaDef::default());
    assert_eq!(config.ekma.method, InterpolationMethodDef::Cubic);
    assert!(config.rir.is_none());
    assert!(config.solver.is_none());
}

#[test]
fn solver_defaults_point_at_standard_layout() {
    let yaml = "version: 1\nname: s\nsolver:\n  program: ./atchem2\n  working_dir: model\n";
    let solver = from_yaml_str(yaml).unwrap().solver.unwrap();
    assert_eq!(solver.output_file, "output/speciesConcentrations.output");
    assert_eq!(solver.time_column.as_deref(), Some("t"));
    assert_eq!(solver.timeout_s, 600.0);
    assert_eq!(solver.parallel_workers, 1);
}

#[test]
fn unknown_extension_is_rejected() {
    assert!(matches!(
        load(std::path::Path::new("analysis.toml")),
        Err(ProjectError::UnknownFormat { .. })
    ));
}
