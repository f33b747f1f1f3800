//! Report generation for amdahl-bench experiments
//!
//! This crate turns aggregated measurements into files:
//!
//! - Speedup charts against Amdahl's Law (PNG, via plotters)
//! - Averaged data as CSV
//! - The experiment summary as JSON

#![warn(clippy::all)]

pub mod charts;
pub mod csv_export;
pub mod json_export;
pub mod render;

pub use charts::{AmdahlPlotter, ChartRenderer, SpeedupChart};
pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use render::{slug, RenderedArtifacts, Reporter, OVERVIEW_CHART};
