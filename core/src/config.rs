//! Experiment configuration types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// One benchmark executable in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    /// Name used in chart titles and logs (e.g. "Matrix Multiplication")
    pub display_name: String,

    /// Executable file name, resolved against the working directory
    pub executable: String,

    /// Assumed parallelizable fraction `p`
    pub parallel_fraction: f64,
}

impl BenchmarkSpec {
    /// Create a new registry entry
    pub fn new(display_name: &str, executable: &str, parallel_fraction: f64) -> Self {
        Self {
            display_name: display_name.to_string(),
            executable: executable.to_string(),
            parallel_fraction,
        }
    }

    /// File stem for this benchmark's artifacts (`matrix_mul` -> `matrix-mul`)
    pub fn artifact_stem(&self) -> String {
        self.executable.replace('_', "-")
    }
}

/// Settings for the theoretical overview chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewConfig {
    /// Parallel fractions drawn as separate curves
    pub fractions: Vec<f64>,

    /// Largest processor count on the x axis
    pub max_processors: u32,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            fractions: vec![0.5, 0.75, 0.9, 0.95, 0.99],
            max_processors: 16,
        }
    }
}

/// Experiment configuration
///
/// Holds the benchmark registry and how each benchmark is run. The registry in
/// [`Default`] is the fixed set of benchmarks shipped with the harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Benchmarks, run in this order
    pub benchmarks: Vec<BenchmarkSpec>,

    /// Invocations per benchmark
    pub num_runs: usize,

    /// Per-invocation timeout in seconds
    pub run_timeout_secs: u64,

    /// Base directory holding `experiment_<N>` directories
    pub results_dir: PathBuf,

    /// Directory containing the Makefile and the built executables
    pub work_dir: PathBuf,

    /// Build commands run once, in order, before any experiment
    pub build_commands: Vec<Vec<String>>,

    /// Estimate `p` from the data instead of using the registry value
    pub estimate_fraction: bool,

    /// Theoretical overview chart settings
    pub overview: OverviewConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            benchmarks: default_registry(),
            num_runs: 5,
            run_timeout_secs: 300,
            results_dir: PathBuf::from("results"),
            work_dir: PathBuf::from("."),
            build_commands: vec![
                vec!["make".to_string(), "clean".to_string()],
                vec!["make".to_string()],
            ],
            estimate_fraction: false,
            overview: OverviewConfig::default(),
        }
    }
}

/// The benchmarks built by the project Makefile
pub fn default_registry() -> Vec<BenchmarkSpec> {
    vec![
        BenchmarkSpec::new("Matrix Multiplication", "matrix_mul", 0.93),
        BenchmarkSpec::new("Dijkstra", "dijkstra", 0.56),
        BenchmarkSpec::new("TSP", "tsp_solver", 0.00),
        BenchmarkSpec::new("Heterogeneous Workload", "heterogeneous_workload_exe", 0.75),
    ]
}

impl ExperimentConfig {
    /// Per-invocation timeout
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Set the number of runs per benchmark
    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    /// Set the per-run timeout
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the results base directory
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set the working directory
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Replace the build commands (empty skips the build step)
    pub fn with_build_commands(mut self, commands: Vec<Vec<String>>) -> Self {
        self.build_commands = commands;
        self
    }

    /// Replace the benchmark registry
    pub fn with_benchmarks(mut self, benchmarks: Vec<BenchmarkSpec>) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    /// Estimate `p` from observed data
    pub fn with_estimated_fraction(mut self, estimate: bool) -> Self {
        self.estimate_fraction = estimate;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.benchmarks.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        if self.num_runs == 0 {
            return Err(ConfigError::InvalidRuns(
                "number of runs must be at least 1".into(),
            ));
        }

        if self.run_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "run timeout must be at least 1 second".into(),
            ));
        }

        let mut seen = HashSet::new();
        for bench in &self.benchmarks {
            if bench.executable.trim().is_empty() {
                return Err(ConfigError::InvalidBenchmark(format!(
                    "{} has an empty executable name",
                    bench.display_name
                )));
            }
            if !seen.insert(bench.executable.as_str()) {
                return Err(ConfigError::InvalidBenchmark(format!(
                    "executable {} is registered twice",
                    bench.executable
                )));
            }
            check_fraction(bench.parallel_fraction)?;
        }

        for &p in &self.overview.fractions {
            check_fraction(p)?;
        }
        if self.overview.max_processors == 0 {
            return Err(ConfigError::InvalidOverview(
                "max processors must be at least 1".into(),
            ));
        }

        if self.build_commands.iter().any(|cmd| cmd.is_empty()) {
            return Err(ConfigError::InvalidBuild("build command is empty".into()));
        }

        Ok(())
    }
}

fn check_fraction(p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::InvalidFraction(p))
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No benchmarks registered
    #[error("benchmark registry is empty")]
    EmptyRegistry,

    /// Invalid run count
    #[error("Invalid run count: {0}")]
    InvalidRuns(String),

    /// Invalid timeout
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid registry entry
    #[error("Invalid benchmark: {0}")]
    InvalidBenchmark(String),

    /// Parallel fraction outside [0, 1]
    #[error("Invalid parallel fraction: {0} (must be within [0, 1])")]
    InvalidFraction(f64),

    /// Invalid overview settings
    #[error("Invalid overview: {0}")]
    InvalidOverview(String),

    /// Invalid build command
    #[error("Invalid build: {0}")]
    InvalidBuild(String),
}
