//! Experiment driver
//!
//! Builds the benchmarks, allocates a numbered results directory, then runs
//! each registered benchmark through the aggregator and hands the averaged
//! data to the reporter. Only configuration errors, a failed build, and an
//! unusable results directory abort the experiment; everything per benchmark
//! is logged and skipped.

use amdahl_bench_core::{
    create_experiment_dir, run_build, AggregationReport, BenchmarkSpec, BenchmarkSummary,
    ExperimentConfig, ExperimentSummary, FractionSource, ProcessRunner, RunAggregator,
};
use amdahl_bench_report::{ChartRenderer, JsonExporter, Reporter};
use anyhow::{Context, Result};
use std::path::Path;

/// File name of the persisted experiment summary
pub const SUMMARY_FILE: &str = "experiment.json";

pub struct ExperimentDriver<R, C> {
    config: ExperimentConfig,
    runner: R,
    reporter: Reporter<C>,
    show_progress: bool,
}

impl<R: ProcessRunner, C: ChartRenderer> ExperimentDriver<R, C> {
    pub fn new(config: ExperimentConfig, runner: R, renderer: C) -> Self {
        Self {
            config,
            runner,
            reporter: Reporter::new(renderer),
            show_progress: false,
        }
    }

    /// Show a progress bar per benchmark
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the whole experiment and return what was produced
    pub async fn run(self) -> Result<ExperimentSummary> {
        self.config
            .validate()
            .context("Invalid experiment configuration")?;

        if !self.config.build_commands.is_empty() {
            println!("Compiling benchmarks...");
            run_build(
                &self.runner,
                &self.config.build_commands,
                &self.config.work_dir,
            )
            .await
            .context("Compilation failed")?;
            println!("Compilation successful.");
        }

        let (number, directory) = create_experiment_dir(&self.config.results_dir)
            .with_context(|| {
                format!(
                    "Failed to create experiment directory under {}",
                    self.config.results_dir.display()
                )
            })?;
        println!(
            "Starting experiment {}. Results will be saved in: {}",
            number,
            directory.display()
        );

        let overview_chart = match self
            .reporter
            .render_overview(&self.config.overview, &directory)
        {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("{:#}", e);
                None
            }
        };

        let aggregator = RunAggregator::new(
            &self.runner,
            &self.config.work_dir,
            self.config.run_timeout(),
        )
        .with_progress(self.show_progress);

        let mut benchmarks = Vec::with_capacity(self.config.benchmarks.len());
        for spec in &self.config.benchmarks {
            println!(
                "\nRunning experiment for: {} (executable: {})",
                spec.display_name, spec.executable
            );
            let report = aggregator
                .aggregate(&spec.executable, self.config.num_runs)
                .await;
            print_points(&report);
            benchmarks.push(self.summarize(spec, report, &directory));
        }

        let summary = ExperimentSummary {
            number,
            directory,
            config: self.config,
            overview_chart,
            benchmarks,
        };

        let json = summary.directory.join(SUMMARY_FILE);
        if let Err(e) = JsonExporter::export(&summary, &json) {
            tracing::error!("Failed to write {}: {:#}", json.display(), e);
        }

        let skipped = summary.skipped().count();
        if skipped > 0 {
            tracing::warn!("{} benchmark(s) produced no data", skipped);
        }
        println!(
            "\nExperiments completed. Results saved in {}/",
            summary.directory.display()
        );
        Ok(summary)
    }

    fn fraction_source(&self, spec: &BenchmarkSpec) -> FractionSource {
        if self.config.estimate_fraction {
            FractionSource::Estimated
        } else {
            FractionSource::Fixed(spec.parallel_fraction)
        }
    }

    fn summarize(
        &self,
        spec: &BenchmarkSpec,
        aggregation: AggregationReport,
        directory: &Path,
    ) -> BenchmarkSummary {
        let fraction_source = self.fraction_source(spec);
        let mut summary = BenchmarkSummary {
            name: spec.display_name.clone(),
            executable: spec.executable.clone(),
            fraction_source,
            parallel_fraction: None,
            chart: None,
            csv: None,
            aggregation,
        };

        if summary.is_empty() {
            println!(
                "Skipping plotting and CSV saving for {} due to no data.",
                spec.display_name
            );
            return summary;
        }

        match self.reporter.render_benchmark(
            &summary.aggregation,
            &spec.display_name,
            &spec.artifact_stem(),
            fraction_source,
            directory,
        ) {
            Ok(artifacts) => {
                println!("  Data saved to {}", artifacts.csv.display());
                println!("  Chart saved to {}", artifacts.chart.display());
                summary.parallel_fraction = artifacts.parallel_fraction;
                summary.chart = Some(artifacts.chart);
                summary.csv = Some(artifacts.csv);
            }
            Err(e) => {
                tracing::error!("Failed to render {}: {:#}", spec.display_name, e);
            }
        }
        summary
    }
}

fn print_points(report: &AggregationReport) {
    if report.is_empty() {
        return;
    }
    println!(
        "  {} of {} runs succeeded",
        report.successful_runs,
        report.successful_runs + report.failed_runs.len()
    );
    for point in &report.points {
        println!(
            "    {} threads: Avg Time={:.4}s, Speedup={:.2}x",
            point.threads, point.avg_time_secs, point.speedup
        );
    }
}
