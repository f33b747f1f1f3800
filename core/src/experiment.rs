//! Experiment bookkeeping: numbered result directories, the build step and
//! the persisted summary

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregator::AggregationReport;
use crate::amdahl::FractionSource;
use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use crate::traits::{Invocation, ProcessRunner, RunOutcome};

/// Prefix of experiment directory names
pub const EXPERIMENT_DIR_PREFIX: &str = "experiment_";

/// Directory name for experiment `number`
pub fn experiment_dir_name(number: u32) -> String {
    format!("{EXPERIMENT_DIR_PREFIX}{number}")
}

/// First `N >= 1` for which `base/experiment_N` does not exist.
///
/// With densely numbered directories this is one more than their count.
pub fn next_experiment_number(base: &Path) -> u32 {
    (1..)
        .find(|&n| !base.join(experiment_dir_name(n)).exists())
        .unwrap_or(u32::MAX)
}

/// Create `base/experiment_N` for the next free `N`, creating `base` if needed.
pub fn create_experiment_dir(base: &Path) -> Result<(u32, PathBuf)> {
    fs::create_dir_all(base)?;
    let number = next_experiment_number(base);
    let dir = base.join(experiment_dir_name(number));
    fs::create_dir_all(&dir)?;
    Ok((number, dir))
}

/// Run each build command in `work_dir`, stopping at the first failure.
///
/// Build commands have no timeout.
pub async fn run_build<R: ProcessRunner>(
    runner: &R,
    commands: &[Vec<String>],
    work_dir: &Path,
) -> Result<()> {
    for command in commands {
        let Some((program, args)) = command.split_first() else {
            continue;
        };
        let invocation = Invocation::new(program)
            .with_args(args.iter().cloned())
            .with_working_dir(work_dir);

        tracing::info!("running build command `{}`", invocation);
        let outcome = runner.run(&invocation).await.map_err(|e| Error::Build {
            command: invocation.to_string(),
            reason: e.to_string(),
        })?;

        if let RunOutcome::NonZeroExit { stdout, stderr, .. } = &outcome {
            tracing::error!("build output:\n{}{}", stdout, stderr);
        }
        if let Some(reason) = outcome.failure_reason() {
            return Err(Error::Build {
                command: invocation.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

/// What was produced for one benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    /// Display name
    pub name: String,
    /// Executable name
    pub executable: String,
    /// Where `p` came from
    pub fraction_source: FractionSource,
    /// The `p` drawn on the chart, if it could be determined
    pub parallel_fraction: Option<f64>,
    /// Chart path, when rendered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
    /// CSV path, when written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    /// Aggregated data and run accounting
    pub aggregation: AggregationReport,
}

impl BenchmarkSummary {
    /// Whether the benchmark produced no data
    pub fn is_empty(&self) -> bool {
        self.aggregation.is_empty()
    }
}

/// Everything an experiment produced, persisted as `experiment.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Experiment number
    pub number: u32,
    /// Experiment directory
    pub directory: PathBuf,
    /// Configuration used
    pub config: ExperimentConfig,
    /// Theoretical overview chart, when rendered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview_chart: Option<PathBuf>,
    /// Per-benchmark results, in registry order
    pub benchmarks: Vec<BenchmarkSummary>,
}

impl ExperimentSummary {
    /// Benchmarks that produced no data
    pub fn skipped(&self) -> impl Iterator<Item = &BenchmarkSummary> {
        self.benchmarks.iter().filter(|b| b.is_empty())
    }
}
