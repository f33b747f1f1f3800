//! JSON export of the experiment summary

use amdahl_bench_core::ExperimentSummary;
use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    /// Write the full experiment summary
    pub fn export(summary: &ExperimentSummary, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, summary)?;
        writer.flush()?;
        Ok(())
    }
}
