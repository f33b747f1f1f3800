//! Aggregation of repeated benchmark runs
//!
//! A benchmark is run several times; every run reports one sample per thread
//! count. Samples are grouped by thread count across all successful runs and
//! averaged. Speedup is recomputed from the averaged times against the averaged
//! 1-thread baseline, not averaged from the benchmark's own figures.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::parser::{self, Sample};
use crate::traits::{Invocation, ProcessRunner, RunOutcome};

/// Averaged measurements for one thread count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    /// Number of threads
    pub threads: u32,
    /// Mean elapsed time in seconds
    pub avg_time_secs: f64,
    /// Baseline time / mean time, or 0 without a usable baseline
    pub speedup: f64,
    /// Number of samples averaged
    pub samples: usize,
    /// Mean of the speedups reported by the benchmark itself
    pub avg_reported_speedup: f64,
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    time_sum: f64,
    reported_sum: f64,
    count: usize,
}

impl GroupAccumulator {
    fn add(&mut self, sample: &Sample) {
        self.time_sum += sample.elapsed_secs;
        self.reported_sum += sample.reported_speedup;
        self.count += 1;
    }

    fn mean_time(&self) -> f64 {
        self.time_sum / self.count as f64
    }

    fn mean_reported(&self) -> f64 {
        self.reported_sum / self.count as f64
    }
}

/// Average samples per thread count and derive speedups.
///
/// Output is ordered by ascending thread count. Groups may have different
/// sample counts when some runs reported partial data.
pub fn aggregate_samples<'a, I>(samples: I) -> Vec<AggregatedPoint>
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut groups: BTreeMap<u32, GroupAccumulator> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.threads).or_default().add(sample);
    }

    let baseline = groups.get(&1).map(GroupAccumulator::mean_time);
    if baseline.is_none() && !groups.is_empty() {
        tracing::warn!("no 1-thread data, speedup reported as 0");
    }
    let baseline = baseline.unwrap_or(0.0);

    groups
        .iter()
        .map(|(&threads, group)| {
            let avg_time_secs = group.mean_time();
            let speedup = if baseline > 0.0 && avg_time_secs > 0.0 {
                baseline / avg_time_secs
            } else {
                0.0
            };
            AggregatedPoint {
                threads,
                avg_time_secs,
                speedup,
                samples: group.count,
                avg_reported_speedup: group.mean_reported(),
            }
        })
        .collect()
}

/// A run whose data was discarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// 1-based run index
    pub run: usize,
    /// Why the run was discarded
    pub reason: String,
}

/// Outcome of aggregating all runs of one benchmark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Executable name
    pub benchmark: String,
    /// Averaged points, ascending by thread count
    pub points: Vec<AggregatedPoint>,
    /// Runs that contributed data
    pub successful_runs: usize,
    /// Runs whose data was discarded
    pub failed_runs: Vec<RunFailure>,
    /// Malformed output lines across all runs
    pub skipped_lines: usize,
}

impl AggregationReport {
    /// Whether no run produced data
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(threads, speedup)` pairs for plotting and estimation
    pub fn observations(&self) -> Vec<(u32, f64)> {
        self.points.iter().map(|p| (p.threads, p.speedup)).collect()
    }

    /// Mean 1-thread time, if any run reported it
    pub fn baseline_time(&self) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.threads == 1)
            .map(|p| p.avg_time_secs)
    }
}

/// Runs a benchmark repeatedly and averages its output
///
/// Runs are strictly sequential. A run that fails to start, exits non-zero,
/// times out, or prints nothing parsable is logged and discarded; it is never
/// retried.
pub struct RunAggregator<R> {
    runner: R,
    work_dir: PathBuf,
    timeout: Duration,
    show_progress: bool,
}

impl<R: ProcessRunner> RunAggregator<R> {
    /// Create an aggregator resolving executables against `work_dir`.
    ///
    /// A relative `work_dir` is made absolute against the current directory,
    /// since the child resolves its program path after changing into it.
    pub fn new(runner: R, work_dir: impl AsRef<Path>, timeout: Duration) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            runner,
            work_dir: std::path::absolute(work_dir).unwrap_or_else(|_| work_dir.to_path_buf()),
            timeout,
            show_progress: false,
        }
    }

    /// Show a progress bar while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn invocation(&self, benchmark: &str) -> Invocation {
        Invocation::new(self.work_dir.join(benchmark))
            .with_working_dir(&self.work_dir)
            .with_timeout(self.timeout)
    }

    fn progress_bar(&self, num_runs: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(num_runs as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} runs {msg}",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Run `benchmark` `num_runs` times and aggregate whatever succeeded.
    ///
    /// Returns an empty report when every run failed.
    pub async fn aggregate(&self, benchmark: &str, num_runs: usize) -> AggregationReport {
        let invocation = self.invocation(benchmark);
        let mut report = AggregationReport {
            benchmark: benchmark.to_string(),
            ..Default::default()
        };
        let mut samples: Vec<Sample> = Vec::new();

        tracing::info!("running {} {} times", benchmark, num_runs);
        let pb = self.progress_bar(num_runs);

        for run in 1..=num_runs {
            pb.set_message(format!("{benchmark} run {run}"));
            tracing::debug!("run {}/{} of {}", run, num_runs, benchmark);

            match self.run_once(&invocation).await {
                Ok(parsed) => {
                    report.skipped_lines += parsed.skipped.len();
                    report.successful_runs += 1;
                    samples.extend(parsed.samples);
                }
                Err(reason) => {
                    report.skipped_lines += reason.skipped_lines;
                    tracing::warn!(
                        "run {} failed for {}: {}. Skipping this run.",
                        run,
                        benchmark,
                        reason.message
                    );
                    report.failed_runs.push(RunFailure {
                        run,
                        reason: reason.message,
                    });
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        report.points = aggregate_samples(&samples);
        if report.is_empty() {
            tracing::warn!("no data collected for {} after {} runs", benchmark, num_runs);
        }
        report
    }

    async fn run_once(&self, invocation: &Invocation) -> Result<parser::ParsedOutput, Discarded> {
        let outcome = self
            .runner
            .run(invocation)
            .await
            .map_err(|e| Discarded::new(e.to_string()))?;

        match outcome {
            RunOutcome::Success { stdout, .. } => {
                let parsed = parser::parse(&stdout);
                if parsed.is_empty() {
                    let mut discarded = Discarded::new("no parsable data in output".to_string());
                    discarded.skipped_lines = parsed.skipped.len();
                    tracing::debug!("unparsable output:\n{}", stdout);
                    return Err(discarded);
                }
                Ok(parsed)
            }
            failed => {
                if let RunOutcome::NonZeroExit { stderr, .. } = &failed {
                    if !stderr.trim().is_empty() {
                        tracing::debug!("stderr of `{}`:\n{}", invocation, stderr);
                    }
                }
                Err(Discarded::new(failed.failure_reason().unwrap_or_default()))
            }
        }
    }
}

struct Discarded {
    message: String,
    skipped_lines: usize,
}

impl Discarded {
    fn new(message: String) -> Self {
        Self {
            message,
            skipped_lines: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // ========================================================================
    // Scripted runner
    // ========================================================================

    enum Scripted {
        Outcome(RunOutcome),
        SpawnError,
    }

    struct ScriptedRunner {
        script: Mutex<VecDeque<Scripted>>,
        invocations: Mutex<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, invocation: &Invocation) -> Result<RunOutcome> {
            self.invocations.lock().unwrap().push(invocation.clone());
            match self.script.lock().unwrap().pop_front() {
                Some(Scripted::Outcome(outcome)) => Ok(outcome),
                Some(Scripted::SpawnError) | None => Err(Error::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
            }
        }
    }

    fn success(stdout: &str) -> Scripted {
        Scripted::Outcome(RunOutcome::Success {
            stdout: stdout.to_string(),
            stderr: String::new(),
            elapsed: Duration::from_millis(10),
        })
    }

    fn timeout() -> Scripted {
        Scripted::Outcome(RunOutcome::TimedOut {
            after: Duration::from_secs(300),
        })
    }

    const MATRIX_OUTPUT: &str = "Sequential time: 4.100000 seconds\n\n\
        Thread count, Time(s), Speedup\n\
        1, 4.000000, 1.025000\n\
        2, 2.000000, 2.050000\n\
        4, 1.000000, 4.100000\n\
        8, 0.500000, 8.200000\n";

    fn aggregator(runner: &ScriptedRunner) -> RunAggregator<&ScriptedRunner> {
        RunAggregator::new(runner, ".", Duration::from_secs(300))
    }

    // ========================================================================
    // Pure aggregation
    // ========================================================================

    #[test]
    fn test_aggregate_samples_baseline_law() {
        let samples = [
            Sample::new(1, 3.0, 1.0),
            Sample::new(1, 5.0, 1.0),
            Sample::new(4, 1.5, 2.0),
            Sample::new(4, 0.5, 6.0),
        ];
        let points = aggregate_samples(&samples);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].threads, 1);
        assert!((points[0].avg_time_secs - 4.0).abs() < 1e-12);
        assert!((points[0].speedup - 1.0).abs() < 1e-12);
        assert_eq!(points[1].threads, 4);
        assert!((points[1].avg_time_secs - 1.0).abs() < 1e-12);
        assert!((points[1].speedup - 4.0).abs() < 1e-12);
        assert!((points[1].avg_reported_speedup - 4.0).abs() < 1e-12);
        assert_eq!(points[1].samples, 2);
    }

    #[test]
    fn test_aggregate_samples_without_baseline() {
        let samples = [Sample::new(2, 1.0, 2.0), Sample::new(4, 0.5, 4.0)];
        let points = aggregate_samples(&samples);

        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.speedup == 0.0));
        // The benchmark's own figures are still averaged
        assert_eq!(points[1].avg_reported_speedup, 4.0);
    }

    #[test]
    fn test_aggregate_samples_zero_time_gives_zero_speedup() {
        let samples = [Sample::new(1, 1.0, 1.0), Sample::new(2, 0.0, 0.0)];
        let points = aggregate_samples(&samples);
        assert_eq!(points[1].speedup, 0.0);
    }

    #[test]
    fn test_aggregate_samples_sorted_by_threads() {
        let samples = [
            Sample::new(8, 0.5, 8.0),
            Sample::new(1, 4.0, 1.0),
            Sample::new(4, 1.0, 4.0),
            Sample::new(2, 2.0, 2.0),
        ];
        let threads: Vec<u32> = aggregate_samples(&samples).iter().map(|p| p.threads).collect();
        assert_eq!(threads, vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_aggregate_samples_unequal_group_sizes() {
        let samples = [
            Sample::new(1, 2.0, 1.0),
            Sample::new(1, 2.0, 1.0),
            Sample::new(2, 1.0, 2.0),
        ];
        let points = aggregate_samples(&samples);
        assert_eq!(points[0].samples, 2);
        assert_eq!(points[1].samples, 1);
        assert!((points[1].speedup - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_samples_empty() {
        assert!(aggregate_samples(&[]).is_empty());
    }

    // ========================================================================
    // Aggregator over scripted runs
    // ========================================================================

    #[tokio::test]
    async fn test_matrix_mul_end_to_end() {
        let runner = ScriptedRunner::new((0..5).map(|_| success(MATRIX_OUTPUT)).collect());
        let report = aggregator(&runner).aggregate("matrix_mul", 5).await;

        assert_eq!(report.benchmark, "matrix_mul");
        assert_eq!(report.successful_runs, 5);
        assert!(report.failed_runs.is_empty());

        let expected = [(1, 4.0, 1.0), (2, 2.0, 2.0), (4, 1.0, 4.0), (8, 0.5, 8.0)];
        assert_eq!(report.points.len(), expected.len());
        for (point, (threads, time, speedup)) in report.points.iter().zip(expected) {
            assert_eq!(point.threads, threads);
            assert!((point.avg_time_secs - time).abs() < 1e-9);
            assert!((point.speedup - speedup).abs() < 1e-9);
            assert_eq!(point.samples, 5);
        }
        assert_eq!(report.baseline_time(), Some(4.0));
    }

    #[tokio::test]
    async fn test_invocation_targets_work_dir() {
        let runner = ScriptedRunner::new(vec![success(MATRIX_OUTPUT)]);
        RunAggregator::new(&runner, "/opt/bench", Duration::from_secs(7))
            .aggregate("dijkstra", 1)
            .await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("/opt/bench/dijkstra"));
        assert_eq!(calls[0].working_dir, Some(PathBuf::from("/opt/bench")));
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(7)));
        assert!(calls[0].args.is_empty());
    }

    #[tokio::test]
    async fn test_failed_runs_are_discarded() {
        let runner = ScriptedRunner::new(vec![
            timeout(),
            success(MATRIX_OUTPUT),
            timeout(),
            success(MATRIX_OUTPUT),
            success(MATRIX_OUTPUT),
        ]);
        let report = aggregator(&runner).aggregate("matrix_mul", 5).await;

        assert_eq!(runner.calls().len(), 5);
        assert_eq!(report.successful_runs, 3);
        assert_eq!(report.failed_runs.len(), 2);
        assert_eq!(report.failed_runs[0].run, 1);
        assert_eq!(report.failed_runs[1].run, 3);
        assert!(report.failed_runs[0].reason.contains("timed out"));
        assert!(!report.is_empty());
        assert!(report.points.iter().all(|p| p.samples == 3));
    }

    #[tokio::test]
    async fn test_every_kind_of_failure_is_local() {
        let runner = ScriptedRunner::new(vec![
            Scripted::Outcome(RunOutcome::NonZeroExit {
                code: Some(1),
                stdout: MATRIX_OUTPUT.to_string(),
                stderr: "Memory allocation failed".to_string(),
            }),
            Scripted::SpawnError,
            success("Segmentation fault\n"),
            success("threads,time,speedup\n1,2.0,1.0\n2,1.0,2.0\n"),
        ]);
        let report = aggregator(&runner).aggregate("tsp_solver", 4).await;

        assert_eq!(report.successful_runs, 1);
        assert_eq!(report.failed_runs.len(), 3);
        assert!(report.failed_runs[0].reason.contains("status 1"));
        assert!(report.failed_runs[1].reason.contains("failed to spawn"));
        assert!(report.failed_runs[2].reason.contains("no parsable data"));
        assert_eq!(report.observations(), vec![(1, 1.0), (2, 2.0)]);
    }

    #[tokio::test]
    async fn test_all_runs_failing_gives_empty_report() {
        let runner = ScriptedRunner::new(vec![timeout(), timeout(), timeout()]);
        let report = aggregator(&runner).aggregate("dijkstra", 3).await;

        assert!(report.is_empty());
        assert_eq!(report.successful_runs, 0);
        assert_eq!(report.failed_runs.len(), 3);
        assert_eq!(report.baseline_time(), None);
    }

    #[tokio::test]
    async fn test_skipped_lines_are_counted() {
        let runner = ScriptedRunner::new(vec![
            success("threads,time,speedup\n1,2.0,1.0\n2,oops,2.0\n"),
            success("threads,time,speedup\n1,2.0,1.0\n2,1.0\n"),
        ]);
        let report = aggregator(&runner).aggregate("dijkstra", 2).await;

        assert_eq!(report.successful_runs, 2);
        assert_eq!(report.skipped_lines, 2);
        assert_eq!(report.points.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_runs_contribute_unequal_counts() {
        let runner = ScriptedRunner::new(vec![
            success("threads,time,speedup\n1,4.0,1.0\n2,2.0,2.0\n"),
            success("threads,time,speedup\n1,4.0,1.0\n"),
        ]);
        let report = aggregator(&runner).aggregate("matrix_mul", 2).await;

        assert_eq!(report.points[0].samples, 2);
        assert_eq!(report.points[1].samples, 1);
        assert!((report.points[1].speedup - 2.0).abs() < 1e-12);
    }

    // ========================================================================
    // Aggregator over real processes
    // ========================================================================

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_benchmark_in_relative_work_dir() {
        use crate::process::TokioProcessRunner;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir_in(".").unwrap();
        let script = dir.path().join("fake_bench");
        let body = "#!/bin/sh\n\
                    echo 'Thread count, Time(s), Speedup'\n\
                    echo '1, 2.0, 1.0'\n\
                    echo '2, 1.0, 2.0'\n";
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let relative = PathBuf::from(dir.path().file_name().unwrap());
        assert!(relative.is_relative());

        let aggregator =
            RunAggregator::new(TokioProcessRunner::new(), &relative, Duration::from_secs(10));
        let report = aggregator.aggregate("fake_bench", 2).await;

        assert!(report.failed_runs.is_empty(), "{:?}", report.failed_runs);
        assert_eq!(report.successful_runs, 2);
        assert_eq!(report.points.len(), 2);
        assert_eq!(report.points[1].samples, 2);
        assert!((report.points[1].speedup - 2.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_relative_work_dir_is_made_absolute() {
        let runner = ScriptedRunner::new(vec![success(MATRIX_OUTPUT)]);
        RunAggregator::new(&runner, "bench", Duration::from_secs(7))
            .aggregate("dijkstra", 1)
            .await;

        let expected = std::env::current_dir().unwrap().join("bench");
        let calls = runner.calls();
        assert_eq!(calls[0].program, expected.join("dijkstra"));
        assert_eq!(calls[0].working_dir, Some(expected));
    }
}
