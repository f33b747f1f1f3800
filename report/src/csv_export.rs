//! CSV export functionality

use amdahl_bench_core::AggregatedPoint;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, Writer};
use std::fs::File;
use std::path::Path;

/// Header of the averaged-results CSV
pub const POINTS_HEADER: [&str; 3] = ["Threads", "Average Time (s)", "Speedup"];

/// Header of the speedup-only CSV
pub const SPEEDUPS_HEADER: [&str; 2] = ["Threads", "Speedup"];

pub struct CsvExporter;

impl CsvExporter {
    /// Export averaged points as `Threads,Average Time (s),Speedup`
    pub fn export_points(points: &[AggregatedPoint], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(POINTS_HEADER)?;
        for point in points {
            wtr.serialize((point.threads, point.avg_time_secs, point.speedup))?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export `(threads, speedup)` pairs as `Threads,Speedup`
    pub fn export_speedups(observations: &[(u32, f64)], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(SPEEDUPS_HEADER)?;
        for &(threads, speedup) in observations {
            wtr.serialize((threads, speedup))?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Read `(threads, speedup)` pairs from either CSV layout.
    ///
    /// The first column is the thread count and the last column the speedup,
    /// so both `Threads,Speedup` and `Threads,Average Time (s),Speedup` work.
    pub fn read_observations(path: &Path) -> Result<Vec<(u32, f64)>> {
        let mut rdr = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut observations = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let row = idx + 2;
            let record = record.with_context(|| format!("Malformed CSV row {row}"))?;
            if record.len() < 2 {
                anyhow::bail!("Row {row} has {} column(s), expected at least 2", record.len());
            }
            let threads = record[0]
                .parse::<u32>()
                .with_context(|| format!("Invalid thread count on row {row}: {}", &record[0]))?;
            let last = &record[record.len() - 1];
            let speedup = last
                .parse::<f64>()
                .with_context(|| format!("Invalid speedup on row {row}: {last}"))?;
            if !speedup.is_finite() || speedup < 0.0 {
                anyhow::bail!("Speedup on row {row} must be finite and non-negative: {last}");
            }
            observations.push((threads, speedup));
        }

        Ok(observations)
    }
}
