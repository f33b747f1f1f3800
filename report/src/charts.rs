//! Speedup charts

use amdahl_bench_core::amdahl::theoretical_curve;
use amdahl_bench_core::{FractionSource, OverviewConfig};
use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;

/// Colors cycled through for the overview curves
const CURVE_COLORS: [RGBColor; 5] = [RED, GREEN, BLUE, CYAN, MAGENTA];

/// Everything drawn on a per-benchmark speedup chart
#[derive(Debug, Clone, Copy)]
pub struct SpeedupChart<'a> {
    /// Algorithm name shown in the title
    pub algorithm_name: &'a str,
    /// Measured `(threads, speedup)` pairs, ascending by threads
    pub observations: &'a [(u32, f64)],
    /// Fraction for the theoretical curve; no curve when `None`
    pub parallel_fraction: Option<f64>,
    /// Where the fraction came from (affects the legend)
    pub fraction_source: FractionSource,
}

impl SpeedupChart<'_> {
    fn theoretical_label(&self, p: f64) -> String {
        match self.fraction_source {
            FractionSource::Fixed(_) => format!("Theoretical (p={p:.2})"),
            FractionSource::Estimated => format!("Theoretical (p≈{p:.2})"),
        }
    }

    fn max_threads(&self) -> u32 {
        self.observations.iter().map(|(t, _)| *t).max().unwrap_or(1)
    }
}

/// Draws charts to image files
///
/// [`AmdahlPlotter`] is the real backend; tests substitute a recorder.
pub trait ChartRenderer {
    /// Theoretical curves for several fractions plus the ideal line
    fn render_overview(&self, overview: &OverviewConfig, path: &Path) -> Result<()>;

    /// Measured speedup against the theoretical and ideal curves
    fn render_speedup(&self, chart: &SpeedupChart<'_>, path: &Path) -> Result<()>;
}

impl<C: ChartRenderer + ?Sized> ChartRenderer for &C {
    fn render_overview(&self, overview: &OverviewConfig, path: &Path) -> Result<()> {
        (**self).render_overview(overview, path)
    }

    fn render_speedup(&self, chart: &SpeedupChart<'_>, path: &Path) -> Result<()> {
        (**self).render_speedup(chart, path)
    }
}

/// PNG charts via plotters' bitmap backend
#[derive(Debug, Clone)]
pub struct AmdahlPlotter {
    size: (u32, u32),
    curve_samples: usize,
}

impl Default for AmdahlPlotter {
    fn default() -> Self {
        Self {
            size: (1000, 600),
            curve_samples: 100,
        }
    }
}

impl AmdahlPlotter {
    /// Create a plotter with the default image size
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image size in pixels
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

impl ChartRenderer for AmdahlPlotter {
    fn render_overview(&self, overview: &OverviewConfig, path: &Path) -> Result<()> {
        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let max_n = overview.max_processors.max(2) as f64;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                "Amdahl's Law: Theoretical Speedup vs. Number of Processors",
                ("sans-serif", 30),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(1f64..max_n, 0f64..(max_n * 1.05))?;

        chart
            .configure_mesh()
            .x_desc("Number of Processors (n)")
            .y_desc("Speedup")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.1}", y))
            .draw()?;

        for (idx, &p) in overview.fractions.iter().enumerate() {
            let color = CURVE_COLORS[idx % CURVE_COLORS.len()];
            chart
                .draw_series(LineSeries::new(
                    theoretical_curve(p, max_n, self.curve_samples),
                    &color,
                ))?
                .label(format!("p={p:.2}"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        let ideal = BLACK.mix(0.4);
        chart
            .draw_series(LineSeries::new(vec![(1.0, 1.0), (max_n, max_n)], &ideal))?
            .label("Ideal (linear)")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ideal));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }

    fn render_speedup(&self, spec: &SpeedupChart<'_>, path: &Path) -> Result<()> {
        // plotters never returns on an unbounded axis
        if let Some((threads, s)) = spec.observations.iter().find(|(_, s)| !s.is_finite()) {
            anyhow::bail!(
                "cannot plot {}: speedup at {} threads is {}",
                spec.algorithm_name,
                threads,
                s
            );
        }

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        if spec.observations.is_empty() {
            tracing::warn!("no data for {}", spec.algorithm_name);
            return Ok(());
        }

        let max_n = spec.max_threads().max(2) as f64;
        let max_observed = spec
            .observations
            .iter()
            .map(|(_, s)| *s)
            .fold(0.0_f64, f64::max);
        let y_max = max_n.max(max_observed) * 1.1;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Amdahl's Law: {} Implementation", spec.algorithm_name),
                ("sans-serif", 30),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(1f64..max_n, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Number of Threads")
            .y_desc("Speedup")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.1}", y))
            .draw()?;

        if let Some(p) = spec.parallel_fraction {
            chart
                .draw_series(LineSeries::new(
                    theoretical_curve(p, max_n, self.curve_samples),
                    &BLUE,
                ))?
                .label(spec.theoretical_label(p))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        }

        let ideal = BLACK.mix(0.4);
        chart
            .draw_series(LineSeries::new(vec![(1.0, 1.0), (max_n, max_n)], &ideal))?
            .label("Ideal (linear)")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ideal));

        let measured: Vec<(f64, f64)> = spec
            .observations
            .iter()
            .map(|&(t, s)| (t as f64, s))
            .collect();

        chart
            .draw_series(LineSeries::new(measured.clone(), &RED))?
            .label("Experimental")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart.draw_series(
            measured
                .iter()
                .map(|&(t, s)| Circle::new((t, s), 5, RED.filled())),
        )?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}
