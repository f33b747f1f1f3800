//! amdahl-bench-core: measuring parallel speedup against Amdahl's Law
//!
//! This crate holds everything between "launch a benchmark executable" and
//! "a table of averaged speedups":
//!
//! - Amdahl's Law and the single-point estimate of the parallel fraction
//! - Parsing of `threads,time,speedup` benchmark output
//! - The process invocation seam ([`ProcessRunner`]) and its tokio implementation
//! - Aggregation of repeated runs per thread count
//! - Configuration, experiment directories, the build step
//!
//! Rendering lives in `amdahl-bench-report`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod amdahl;
pub mod config;
pub mod error;
pub mod experiment;
pub mod parser;
pub mod process;
pub mod traits;

pub use aggregator::{aggregate_samples, AggregatedPoint, AggregationReport, RunAggregator, RunFailure};
pub use amdahl::{estimate_from_observations, estimate_parallel_fraction, speedup, FractionSource};
pub use config::{BenchmarkSpec, ConfigError, ExperimentConfig, OverviewConfig};
pub use error::*;
pub use experiment::{
    create_experiment_dir, next_experiment_number, run_build, BenchmarkSummary, ExperimentSummary,
};
pub use parser::{parse, ParseIssue, ParsedOutput, Sample, SkippedLine};
pub use process::TokioProcessRunner;
pub use traits::{Invocation, ProcessRunner, RunOutcome};
