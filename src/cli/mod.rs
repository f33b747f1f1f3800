//! CLI argument parsing and command dispatch

use amdahl_bench_core::{ExperimentConfig, FractionSource, OverviewConfig, TokioProcessRunner};
use amdahl_bench_report::{AmdahlPlotter, CsvExporter, Reporter};
use anyhow::{bail, Context, Result};
use clap::{Args, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::ExperimentDriver;

#[derive(Parser, Debug)]
#[command(name = "amdahl-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `run` with default settings
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the benchmarks, run them, and plot their speedup
    Run(RunArgs),
    /// Plot the theoretical Amdahl's Law curves only
    Overview {
        /// Directory for the chart
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Largest processor count on the x axis
        #[arg(short, long, default_value_t = 16)]
        max_processors: u32,
    },
    /// Plot previously recorded speedups from a CSV
    Plot {
        /// CSV with `Threads` first and `Speedup` last
        #[arg(short, long)]
        input: PathBuf,

        /// Algorithm name shown in the title
        #[arg(short, long)]
        name: String,

        /// Parallel fraction for the theoretical curve (estimated when omitted)
        #[arg(short, long)]
        p: Option<f64>,

        /// Directory for the chart and CSV
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Runs per benchmark
    #[arg(short = 'n', long, default_value_t = 5, env = "AMDAHL_RUNS")]
    pub runs: usize,

    /// Per-run timeout in seconds
    #[arg(short, long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Directory holding experiment_N subdirectories
    #[arg(short, long, default_value = "results", env = "AMDAHL_RESULTS_DIR")]
    pub results_dir: PathBuf,

    /// Directory containing the Makefile and benchmark executables
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Skip `make clean` / `make`
    #[arg(long)]
    pub skip_build: bool,

    /// Estimate p from the measurements instead of using the registry value
    #[arg(long)]
    pub estimate_p: bool,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    /// Arguments for a bare `amdahl-bench`: clap defaults plus environment
    fn from_env() -> Result<Self> {
        let matches =
            Self::augment_args(clap::Command::new("run")).try_get_matches_from(["run"])?;
        Ok(Self::from_arg_matches(&matches)?)
    }

    fn to_config(&self) -> ExperimentConfig {
        let config = ExperimentConfig::default()
            .with_num_runs(self.runs)
            .with_run_timeout(Duration::from_secs(self.timeout_secs))
            .with_results_dir(&self.results_dir)
            .with_work_dir(&self.work_dir)
            .with_estimated_fraction(self.estimate_p);
        if self.skip_build {
            config.with_build_commands(Vec::new())
        } else {
            config
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let command = match self.command {
            Some(command) => command,
            None => Commands::Run(RunArgs::from_env()?),
        };
        match command {
            Commands::Run(args) => run_experiment(args).await,
            Commands::Overview {
                output_dir,
                max_processors,
            } => render_overview(output_dir, max_processors),
            Commands::Plot {
                input,
                name,
                p,
                output_dir,
            } => plot_csv(input, &name, p, output_dir),
        }
    }
}

async fn run_experiment(args: RunArgs) -> Result<()> {
    let config = args.to_config();

    println!("{}", "=".repeat(70));
    println!("Amdahl's Law Experiment");
    println!("{}", "=".repeat(70));
    println!("Benchmarks:     {}", config.benchmarks.len());
    println!("Runs each:      {}", config.num_runs);
    println!("Run timeout:    {}s", config.run_timeout_secs);
    println!("Working dir:    {}", config.work_dir.display());
    println!("Results dir:    {}", config.results_dir.display());
    println!(
        "Parallel frac.: {}",
        if config.estimate_fraction {
            "estimated"
        } else {
            "registry"
        }
    );
    println!("{}", "=".repeat(70));

    let summary = ExperimentDriver::new(config, TokioProcessRunner::new(), AmdahlPlotter::new())
        .with_progress(!args.no_progress)
        .run()
        .await?;

    println!("\n{}", "=".repeat(70));
    for benchmark in &summary.benchmarks {
        let points = benchmark.aggregation.points.len();
        let status = match (&benchmark.csv, benchmark.parallel_fraction) {
            (Some(_), Some(p)) => format!("{points} points, p={p:.2}"),
            (Some(_), None) => format!("{points} points"),
            (None, _) => "no data".to_string(),
        };
        println!("{:<28} {}", benchmark.name, status);
    }
    println!("{}", "=".repeat(70));
    Ok(())
}

fn render_overview(output_dir: PathBuf, max_processors: u32) -> Result<()> {
    let overview = OverviewConfig {
        max_processors,
        ..Default::default()
    };
    if overview.max_processors < 1 {
        bail!("--max-processors must be at least 1");
    }
    let path = Reporter::new(AmdahlPlotter::new()).render_overview(&overview, &output_dir)?;
    println!("Theoretical curves saved to {}", path.display());
    Ok(())
}

fn plot_csv(input: PathBuf, name: &str, p: Option<f64>, output_dir: PathBuf) -> Result<()> {
    let source = match p {
        Some(p) if (0.0..=1.0).contains(&p) => FractionSource::Fixed(p),
        Some(p) => bail!("--p must lie in [0, 1], got {p}"),
        None => FractionSource::Estimated,
    };

    let observations = CsvExporter::read_observations(&input)
        .with_context(|| format!("Failed to read speedups from {}", input.display()))?;
    if observations.is_empty() {
        bail!("{} contains no data rows", input.display());
    }

    let artifacts = Reporter::new(AmdahlPlotter::new()).render_observations(
        &observations,
        name,
        source,
        &output_dir,
    )?;
    println!("Chart saved to {}", artifacts.chart.display());
    println!("Data saved to {}", artifacts.csv.display());
    if let (FractionSource::Estimated, Some(p)) = (source, artifacts.parallel_fraction) {
        println!("Estimated parallel fraction: p≈{p:.2}");
    }
    Ok(())
}
