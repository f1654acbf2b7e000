//! Chemical-kinetics solver abstraction and the external-process solver.

use crate::concentration::ConcentrationTable;
use crate::error::{RirError, RirResult};
use crate::guard::ConfigGuard;
use crate::output::{O3Series, parse_output};
use oz_core::Real;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Why a solve produced no O3 series.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveFailure {
    /// Could not start, exited non-zero, or its input could not be written.
    Failed(String),
    TimedOut(Duration),
    /// Finished, but the expected output (or its O3 column) was not there.
    OutputMissing(String),
}

/// Something that turns an initial concentration table into an O3 time series.
pub trait KineticsSolver: Sync {
    fn name(&self) -> &str;

    /// Run to completion or until `timeout` elapses.
    fn solve(&self, table: &ConcentrationTable, timeout: Duration)
    -> Result<O3Series, SolveFailure>;
}

/// Settings for a solver installation driven as an external process.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSolverConfig {
    /// Executable. Relative paths containing a separator resolve against `working_dir`.
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Initial concentrations file, relative to `working_dir`.
    pub concentrations_file: PathBuf,
    /// Species output file, relative to `working_dir`.
    pub output_file: PathBuf,
    pub o3_column: String,
    pub time_column: Option<String>,
    /// Multiply concentrations by this on write and divide O3 by it on read.
    pub ppb_to_molecules: Option<Real>,
}

impl ExternalSolverConfig {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            concentrations_file: PathBuf::from("configuration/initialConcentrations.config"),
            output_file: PathBuf::from("output/speciesConcentrations.output"),
            o3_column: "O3".to_string(),
            time_column: Some("t".to_string()),
            ppb_to_molecules: None,
        }
    }
}

/// An on-disk solver installation.
///
/// The installation has one shared concentrations file, so calls on the same
/// instance are serialized. Use [`ExternalSolver::isolated_copies`] for
/// parallel evaluation.
#[derive(Debug)]
pub struct ExternalSolver {
    config: ExternalSolverConfig,
    lock: Mutex<()>,
}

const POLL_MIN: Duration = Duration::from_millis(5);
const POLL_MAX: Duration = Duration::from_millis(100);

impl ExternalSolver {
    pub fn new(config: ExternalSolverConfig) -> RirResult<Self> {
        if let Some(k) = config.ppb_to_molecules {
            if !(k.is_finite() && k > 0.0) {
                return Err(RirError::invalid(format!(
                    "ppb_to_molecules must be finite and > 0 (got {k})"
                )));
            }
        }
        if config.o3_column.trim().is_empty() {
            return Err(RirError::invalid("o3_column is empty"));
        }
        Ok(Self {
            config,
            lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ExternalSolverConfig {
        &self.config
    }

    fn program_path(&self) -> PathBuf {
        let p = &self.config.program;
        if p.is_relative() && p.components().count() > 1 {
            self.config.working_dir.join(p)
        } else {
            p.clone()
        }
    }

    /// Copy the working directory to `root/worker_NN` once per worker.
    pub fn isolated_copies(&self, root: &Path, workers: usize) -> RirResult<Vec<ExternalSolver>> {
        if workers == 0 {
            return Err(RirError::invalid("at least one worker is required"));
        }
        (0..workers)
            .map(|i| {
                let dest = root.join(format!("worker_{i:02}"));
                copy_dir(&self.config.working_dir, &dest)?;
                tracing::debug!(dest = %dest.display(), "created isolated solver copy");
                ExternalSolver::new(ExternalSolverConfig {
                    working_dir: dest,
                    ..self.config.clone()
                })
            })
            .collect()
    }

    fn run_process(&self, timeout: Duration) -> Result<(), SolveFailure> {
        let program = self.program_path();
        let deadline = Instant::now() + timeout;
        let mut cmd = Command::new(&program);
        cmd.args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Own process group, so background children can be killed with it.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd.spawn().map_err(|e| {
            SolveFailure::Failed(format!("cannot start {}: {e}", program.display()))
        })?;

        let (tx, rx) = mpsc::channel();
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                let _ = tx.send(buf);
            });
        }

        match wait_with_timeout(&mut child, timeout) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => {
                // A background child may hold stderr open; wait no longer than the deadline.
                let wait = deadline.saturating_duration_since(Instant::now()).max(STDERR_GRACE);
                let tail = match rx.recv_timeout(wait) {
                    Ok(s) => s.trim().lines().last().unwrap_or_default().to_string(),
                    Err(_) => {
                        kill_group(&child);
                        String::new()
                    }
                };
                Err(SolveFailure::Failed(if tail.is_empty() {
                    format!("exited with {status}")
                } else {
                    format!("exited with {status}: {tail}")
                }))
            }
            Ok(None) => {
                kill_group(&child);
                if let Err(e) = child.kill() {
                    tracing::warn!(error = %e, "failed to kill timed-out solver");
                }
                let _ = child.wait();
                Err(SolveFailure::TimedOut(timeout))
            }
            Err(e) => Err(SolveFailure::Failed(format!("wait failed: {e}"))),
        }
    }
}

/// Minimum time to wait for stderr after the solver exits.
const STDERR_GRACE: Duration = Duration::from_millis(100);

/// SIGKILL the solver's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let status = Command::new("kill")
        .args(["-KILL", &format!("-{}", child.id())])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = status {
        tracing::warn!(error = %e, pid = child.id(), "failed to kill solver process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

impl KineticsSolver for ExternalSolver {
    fn name(&self) -> &str {
        self.config
            .program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("external")
    }

    fn solve(
        &self,
        table: &ConcentrationTable,
        timeout: Duration,
    ) -> Result<O3Series, SolveFailure> {
        let _serial = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let cfg = &self.config;
        let conc_path = cfg.working_dir.join(&cfg.concentrations_file);
        let out_path = cfg.working_dir.join(&cfg.output_file);

        match fs::remove_file(&out_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(SolveFailure::Failed(format!(
                    "cannot remove stale output {}: {e}",
                    out_path.display()
                )));
            }
            _ => {}
        }

        let text = table.to_config_text(cfg.ppb_to_molecules);
        let _guard = ConfigGuard::replace(&conc_path, text.as_bytes()).map_err(|e| {
            SolveFailure::Failed(format!("cannot write {}: {e}", conc_path.display()))
        })?;

        self.run_process(timeout)?;

        let raw = match fs::read_to_string(&out_path) {
            Ok(raw) => raw,
            Err(e) => {
                return Err(SolveFailure::OutputMissing(format!(
                    "{}: {e}",
                    out_path.display()
                )));
            }
        };
        let series = parse_output(&raw, &cfg.o3_column, cfg.time_column.as_deref())
            .map_err(SolveFailure::OutputMissing)?;
        Ok(match cfg.ppb_to_molecules {
            Some(k) => series.rescaled(k),
            None => series,
        })
    }
}

/// `Ok(None)` when the deadline passed with the child still running.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    let mut pause = POLL_MIN;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(pause.min(deadline - now));
        pause = (pause * 2).min(POLL_MAX);
    }
}

fn copy_dir(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
