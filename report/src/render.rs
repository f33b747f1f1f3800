//! Artifact rendering for an experiment
//!
//! [`Reporter`] is the terminal sink of the pipeline: it takes aggregated
//! data, draws the charts, writes the CSVs, and hands back where they went.
//! Destination directories are created on demand.

use amdahl_bench_core::{AggregationReport, FractionSource, OverviewConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::charts::{ChartRenderer, SpeedupChart};
use crate::csv_export::CsvExporter;

/// File name of the theoretical overview chart
pub const OVERVIEW_CHART: &str = "amdahls_law_theoretical.png";

/// Paths written for one benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifacts {
    /// Speedup chart
    pub chart: PathBuf,
    /// Data CSV
    pub csv: PathBuf,
    /// Fraction used for the theoretical curve
    pub parallel_fraction: Option<f64>,
}

/// File-name form of an algorithm name (`"Matrix Multiplication"` -> `"matrix_multiplication"`)
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Writes charts and CSVs for an experiment
pub struct Reporter<C> {
    renderer: C,
}

impl<C: ChartRenderer> Reporter<C> {
    /// Create a reporter drawing with `renderer`
    pub fn new(renderer: C) -> Self {
        Self { renderer }
    }

    /// Render the theoretical overview into `output_dir`
    pub fn render_overview(&self, overview: &OverviewConfig, output_dir: &Path) -> Result<PathBuf> {
        ensure_dir(output_dir)?;
        let path = output_dir.join(OVERVIEW_CHART);
        self.renderer
            .render_overview(overview, &path)
            .with_context(|| format!("Failed to render overview chart: {}", path.display()))?;
        Ok(path)
    }

    /// Render one benchmark's averaged results.
    ///
    /// Writes `<stem>_data.csv` (`Threads,Average Time (s),Speedup`), then
    /// `<stem>_speedup.png`.
    pub fn render_benchmark(
        &self,
        report: &AggregationReport,
        algorithm_name: &str,
        stem: &str,
        source: FractionSource,
        output_dir: &Path,
    ) -> Result<RenderedArtifacts> {
        ensure_dir(output_dir)?;
        let observations = report.observations();
        let parallel_fraction = resolve_fraction(source, &observations, algorithm_name);

        let csv = output_dir.join(format!("{stem}_data.csv"));
        CsvExporter::export_points(&report.points, &csv)
            .with_context(|| format!("Failed to export CSV to: {}", csv.display()))?;

        let chart = output_dir.join(format!("{stem}_speedup.png"));
        self.draw(algorithm_name, &observations, parallel_fraction, source, &chart)?;

        Ok(RenderedArtifacts {
            chart,
            csv,
            parallel_fraction,
        })
    }

    /// Render bare `(threads, speedup)` observations.
    ///
    /// Writes `<slug>_data.csv` (`Threads,Speedup`), then `amdahls_law_<slug>.png`.
    pub fn render_observations(
        &self,
        observations: &[(u32, f64)],
        algorithm_name: &str,
        source: FractionSource,
        output_dir: &Path,
    ) -> Result<RenderedArtifacts> {
        ensure_dir(output_dir)?;
        let name = slug(algorithm_name);
        let parallel_fraction = resolve_fraction(source, observations, algorithm_name);

        let csv = output_dir.join(format!("{name}_data.csv"));
        CsvExporter::export_speedups(observations, &csv)
            .with_context(|| format!("Failed to export CSV to: {}", csv.display()))?;

        let chart = output_dir.join(format!("amdahls_law_{name}.png"));
        self.draw(algorithm_name, observations, parallel_fraction, source, &chart)?;

        Ok(RenderedArtifacts {
            chart,
            csv,
            parallel_fraction,
        })
    }

    fn draw(
        &self,
        algorithm_name: &str,
        observations: &[(u32, f64)],
        parallel_fraction: Option<f64>,
        fraction_source: FractionSource,
        path: &Path,
    ) -> Result<()> {
        let spec = SpeedupChart {
            algorithm_name,
            observations,
            parallel_fraction,
            fraction_source,
        };
        self.renderer
            .render_speedup(&spec, path)
            .with_context(|| format!("Failed to render chart: {}", path.display()))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

fn resolve_fraction(
    source: FractionSource,
    observations: &[(u32, f64)],
    algorithm_name: &str,
) -> Option<f64> {
    let p = source.resolve(observations);
    match (source, p) {
        (FractionSource::Estimated, Some(p)) => {
            tracing::info!("estimated p={:.2} for {}", p, algorithm_name);
        }
        (FractionSource::Estimated, None) => {
            tracing::warn!(
                "cannot estimate p for {}, drawing without theoretical curve",
                algorithm_name
            );
        }
        _ => {}
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use amdahl_bench_core::AggregatedPoint;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRenderer {
        overviews: RefCell<Vec<PathBuf>>,
        charts: RefCell<Vec<(String, Option<f64>, PathBuf)>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render_overview(&self, _overview: &OverviewConfig, path: &Path) -> Result<()> {
            self.overviews.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn render_speedup(&self, chart: &SpeedupChart<'_>, path: &Path) -> Result<()> {
            self.charts.borrow_mut().push((
                chart.algorithm_name.to_string(),
                chart.parallel_fraction,
                path.to_path_buf(),
            ));
            Ok(())
        }
    }

    fn matrix_report() -> AggregationReport {
        let points = [(1, 4.0, 1.0), (2, 2.0, 2.0), (4, 1.0, 4.0), (8, 0.5, 8.0)]
            .into_iter()
            .map(|(threads, avg_time_secs, speedup)| AggregatedPoint {
                threads,
                avg_time_secs,
                speedup,
                samples: 5,
                avg_reported_speedup: speedup,
            })
            .collect();
        AggregationReport {
            benchmark: "matrix_mul".to_string(),
            points,
            successful_runs: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Matrix Multiplication"), "matrix_multiplication");
        assert_eq!(slug("TSP"), "tsp");
    }

    #[test]
    fn test_render_overview_creates_directory() {
        let base = tempfile::tempdir().unwrap();
        let out = base.path().join("results").join("experiment_1");
        let renderer = RecordingRenderer::default();

        let path = Reporter::new(&renderer)
            .render_overview(&OverviewConfig::default(), &out)
            .unwrap();

        assert!(out.is_dir());
        assert_eq!(path, out.join(OVERVIEW_CHART));
        assert_eq!(*renderer.overviews.borrow(), vec![path]);
    }

    #[test]
    fn test_render_benchmark_with_fixed_fraction() {
        let out = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer::default();

        let artifacts = Reporter::new(&renderer)
            .render_benchmark(
                &matrix_report(),
                "Matrix Multiplication",
                "matrix-mul",
                FractionSource::Fixed(0.93),
                out.path(),
            )
            .unwrap();

        assert_eq!(artifacts.chart, out.path().join("matrix-mul_speedup.png"));
        assert_eq!(artifacts.csv, out.path().join("matrix-mul_data.csv"));
        assert_eq!(artifacts.parallel_fraction, Some(0.93));

        let csv = fs::read_to_string(&artifacts.csv).unwrap();
        assert!(csv.starts_with("Threads,Average Time (s),Speedup\n"));
        assert!(csv.contains("8,0.5,8.0\n"));

        let charts = renderer.charts.borrow();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].0, "Matrix Multiplication");
    }

    #[test]
    fn test_render_benchmark_with_estimated_fraction() {
        let out = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer::default();

        let artifacts = Reporter::new(&renderer)
            .render_benchmark(
                &matrix_report(),
                "Matrix Multiplication",
                "matrix-mul",
                FractionSource::Estimated,
                out.path(),
            )
            .unwrap();

        let expected = amdahl_bench_core::estimate_parallel_fraction(8.0, 8);
        assert_eq!(artifacts.parallel_fraction, expected);
        assert_eq!(renderer.charts.borrow()[0].1, expected);
    }

    #[test]
    fn test_render_observations_simple_variant() {
        let out = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer::default();
        let observations = [(1, 1.0), (2, 1.8), (4, 3.2), (8, 5.1)];

        let artifacts = Reporter::new(&renderer)
            .render_observations(
                &observations,
                "Matrix Multiplication",
                FractionSource::Estimated,
                out.path(),
            )
            .unwrap();

        assert_eq!(
            artifacts.chart,
            out.path().join("amdahls_law_matrix_multiplication.png")
        );
        assert_eq!(
            fs::read_to_string(&artifacts.csv).unwrap(),
            "Threads,Speedup\n1,1.0\n2,1.8\n4,3.2\n8,5.1\n"
        );
    }

    #[test]
    fn test_unestimable_fraction_still_renders() {
        let out = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer::default();

        let artifacts = Reporter::new(&renderer)
            .render_observations(&[(1, 1.0)], "TSP", FractionSource::Estimated, out.path())
            .unwrap();

        assert_eq!(artifacts.parallel_fraction, None);
        assert_eq!(renderer.charts.borrow().len(), 1);
    }
}
