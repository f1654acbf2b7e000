use clap::{Parser, Subcommand};
use oz_app::{
    AppResult, base_dir_of, ekma_service, load_config, load_observations, rir_service,
    run_service, summarize,
};
use oz_results::RunPayload;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ozonesens")]
#[command(about = "Ozone sensitivity to NOx and VOC precursors (EKMA isopleths and RIR)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an analysis configuration
    Validate {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Build the isopleth surface from observations and classify the regime
    Ekma {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Observation file (.json, .yaml or .csv)
        observations: PathBuf,
        /// Write the gridded surface as CSV
        #[arg(long)]
        grid_csv: Option<PathBuf>,
        /// Store the result next to the configuration
        #[arg(long)]
        save: bool,
    },
    /// Compute relative incremental reactivities
    Rir {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Observations for the correlation strategy or as fallback
        #[arg(short, long)]
        observations: Option<PathBuf>,
        /// Store the result next to the configuration
        #[arg(long)]
        save: bool,
    },
    /// Run the configured VOC x NOx solver sweep
    Sweep {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Where to write the sweep rows as CSV
        #[arg(short, long)]
        output: PathBuf,
        /// Also run the EKMA analysis on the sweep rows
        #[arg(long)]
        classify: bool,
    },
    /// List stored runs for a configuration
    Runs {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
    },
    /// Show a stored run
    ShowRun {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Run ID or unique prefix
        run_id: String,
        /// Print the raw payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a stored run
    DeleteRun {
        /// Path to the configuration (YAML or JSON)
        config_path: PathBuf,
        /// Run ID or unique prefix
        run_id: String,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Ekma {
            config_path,
            observations,
            grid_csv,
            save,
        } => cmd_ekma(&config_path, &observations, grid_csv.as_deref(), save),
        Commands::Rir {
            config_path,
            observations,
            save,
        } => cmd_rir(&config_path, observations.as_deref(), save),
        Commands::Sweep {
            config_path,
            output,
            classify,
        } => cmd_sweep(&config_path, &output, classify),
        Commands::Runs { config_path } => cmd_runs(&config_path),
        Commands::ShowRun {
            config_path,
            run_id,
            json,
        } => cmd_show_run(&config_path, &run_id, json),
        Commands::DeleteRun {
            config_path,
            run_id,
        } => {
            let removed = run_service::delete_run(&config_path, &run_id)?;
            println!("✓ Deleted run {}", removed);
            Ok(())
        }
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = load_config(config_path)?;
    let summary = summarize(&config);
    println!("✓ Configuration is valid");
    println!("  Name: {} (version {})", summary.name, summary.version);
    println!("  Grid: {} x {} (VOC x NOx)", summary.grid.0, summary.grid.1);
    if summary.targets.is_empty() {
        println!("  RIR targets: none");
    } else {
        println!("  RIR targets: {}", summary.targets.join(", "));
    }
    println!("  Solver: {}", if summary.has_solver { "configured" } else { "none" });
    println!("  Sweep: {}", if summary.has_sweep { "configured" } else { "none" });
    Ok(())
}

fn cmd_ekma(
    config_path: &Path,
    observations: &Path,
    grid_csv: Option<&Path>,
    save: bool,
) -> AppResult<()> {
    let config = load_config(config_path)?;
    let loaded = load_observations(observations)?;
    println!(
        "Running EKMA analysis on {} observations from {}",
        loaded.set.len(),
        observations.display()
    );

    let started = Instant::now();
    let outcome = ekma_service::run_ekma(&config, &loaded.set)?;
    print_ekma(&ekma_service::to_record(&outcome));
    println!("  Elapsed: {:.2} s", started.elapsed().as_secs_f64());

    if let Some(path) = grid_csv {
        ekma_service::write_grid_csv(&outcome.grid, path)?;
        println!("✓ Surface written to {}", path.display());
    }
    if save {
        let saved = run_service::save_ekma(
            config_path,
            &config,
            &outcome,
            loaded.set.len(),
            &loaded.digest,
        )?;
        print_saved(&saved);
    }
    Ok(())
}

fn cmd_rir(config_path: &Path, observations: Option<&Path>, save: bool) -> AppResult<()> {
    let config = load_config(config_path)?;
    let loaded = observations.map(load_observations).transpose()?;

    println!("Computing RIR for: {}", config.name);
    let started = Instant::now();
    let outcome = rir_service::run_rir(
        &config,
        &base_dir_of(config_path),
        loaded.as_ref().map(|l| &l.set),
    )?;
    print_rir(&rir_service::to_record(&outcome));
    println!("  Elapsed: {:.2} s", started.elapsed().as_secs_f64());

    if save {
        let digest = loaded.as_ref().map(|l| l.digest.as_str()).unwrap_or("");
        let saved = run_service::save_rir(config_path, &config, &outcome, digest)?;
        print_saved(&saved);
    }
    Ok(())
}

fn cmd_sweep(config_path: &Path, output: &Path, classify: bool) -> AppResult<()> {
    let config = load_config(config_path)?;
    println!("Running EKMA sweep for: {}", config.name);

    let started = Instant::now();
    let outcome = rir_service::run_ekma_sweep(&config, &base_dir_of(config_path))?;
    let failed = outcome.scenarios.iter().filter(|s| !s.is_ok()).count();
    println!(
        "✓ {} scenarios run ({} failed) in {:.2} s",
        outcome.scenarios.len(),
        failed,
        started.elapsed().as_secs_f64()
    );
    oz_app::write_observations_csv(&outcome.observations, output)?;
    println!(
        "✓ {} rows written to {}",
        outcome.observations.len(),
        output.display()
    );

    if classify {
        let ekma = ekma_service::run_ekma(&config, &outcome.observations)?;
        print_ekma(&ekma_service::to_record(&ekma));
    }
    Ok(())
}

fn cmd_runs(config_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(config_path)?;

    if runs.is_empty() {
        println!("No stored runs for: {}", config_path.display());
    } else {
        println!("Stored runs for '{}':", config_path.display());
        for manifest in runs {
            println!(
                "  {} {:<4} {}",
                &manifest.run_id[..12.min(manifest.run_id.len())],
                manifest.kind.label(),
                manifest.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_run(config_path: &Path, run_id: &str, json: bool) -> AppResult<()> {
    let (manifest, payload) = run_service::load_run(config_path, run_id)?;

    if json {
        let text = serde_json::to_string_pretty(&payload)
            .map_err(|e| oz_app::AppError::Results(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Run {}", manifest.run_id);
    println!("  Configuration: {}", manifest.config_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Tool version: {}", manifest.tool_version);
    match payload {
        RunPayload::Ekma(record) => print_ekma(&record),
        RunPayload::Rir(record) => print_rir(&record),
    }
    Ok(())
}

fn print_ekma(record: &oz_results::EkmaRecord) {
    let defined = record.o3.iter().flatten().filter(|v| v.is_some()).count();
    let cells = record.voc_axis.len() * record.nox_axis.len();
    println!("\nEKMA result:");
    println!(
        "  Grid: {} x {} (VOC x NOx), {} of {} cells defined",
        record.voc_axis.len(),
        record.nox_axis.len(),
        defined,
        cells
    );
    println!("  Ridge points: {}", record.ridge.len());
    match record.mean_abs_slope {
        Some(s) => println!("  Mean |dNOx/dVOC|: {:.3}", s),
        None => println!("  Mean |dNOx/dVOC|: n/a"),
    }
    println!("  Regime: {}", record.regime);
    if let Some(ratio) = &record.ratio_regime {
        println!("  Regime by VOC/NOx ratio: {}", ratio);
    }
    if !record.segments.is_empty() {
        println!("  Segments:");
        for seg in &record.segments {
            println!(
                "    VOC {:>8.2} - {:>8.2}: {}",
                seg.voc_start, seg.voc_end, seg.regime
            );
        }
    }
}

fn print_rir(record: &oz_results::RirRecord) {
    println!("\nRIR result ({}):", record.method);
    for (species, value) in &record.coefficients {
        println!("  {:<10} {:>9.4}", species, value);
    }
    if !record.skipped.is_empty() {
        println!("  Skipped: {}", record.skipped.join(", "));
    }
    if let Some(note) = &record.note {
        println!("  Note: {}", note);
    }
    if !record.scenarios.is_empty() {
        let failed: Vec<_> = record.scenarios.iter().filter(|s| s.status != "OK").collect();
        println!(
            "  Scenarios: {} run, {} failed",
            record.scenarios.len(),
            failed.len()
        );
        for s in failed {
            println!("    {} {}", s.id, s.status);
        }
    }
    if !record.reductions.is_empty() {
        println!("  One-sided reductions:");
        for r in &record.reductions {
            match r.rir {
                Some(v) => println!("    {} x{:.2}: {:.4}", r.label, r.factor, v),
                None => println!("    {} x{:.2}: n/a", r.label, r.factor),
            }
        }
    }
}

fn print_saved(saved: &run_service::SavedRun) {
    if saved.replaced {
        println!("✓ Replaced stored run {}", saved.run_id);
    } else {
        println!("✓ Saved run {}", saved.run_id);
    }
}
