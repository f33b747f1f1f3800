//! Benchmark output parsing
//!
//! Benchmarks print free-form text, then a header line, then one
//! `threads,time,speedup` line per thread count:
//!
//! ```text
//! Sequential time: 4.120000 seconds
//!
//! Thread count, Time(s), Speedup
//! 1, 4.000000, 1.030000
//! 2, 2.000000, 2.060000
//! ```
//!
//! Parsing is best-effort. Malformed lines are recorded in
//! [`ParsedOutput::skipped`] and never abort the parse.

use serde::{Deserialize, Serialize};

/// Separator between fields of a data line
pub const FIELD_SEPARATOR: char = ',';

const HEADER_PHRASE: &str = "thread count";
const HEADER_COLUMNS: &str = "threads,time,speedup";

/// One measurement reported by a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Number of threads used
    pub threads: u32,
    /// Wall time in seconds
    pub elapsed_secs: f64,
    /// Speedup as computed by the benchmark itself
    pub reported_speedup: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(threads: u32, elapsed_secs: f64, reported_speedup: f64) -> Self {
        Self {
            threads,
            elapsed_secs,
            reported_speedup,
        }
    }
}

/// Why a candidate data line was skipped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseIssue {
    /// The line did not split into exactly three fields
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),

    /// A field was not a number
    #[error("{field} is not a number: {value:?}")]
    InvalidNumber {
        /// Field name
        field: &'static str,
        /// Raw field text
        value: String,
    },

    /// A field parsed but is outside its domain
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Parsed value
        value: f64,
    },
}

/// A candidate data line that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based line number in the raw output
    pub line_number: usize,
    /// The trimmed line text
    pub text: String,
    /// Reason for skipping
    pub issue: ParseIssue,
}

/// Result of parsing one benchmark run's output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    /// Successfully parsed samples, in output order
    pub samples: Vec<Sample>,
    /// Candidate lines that were rejected
    pub skipped: Vec<SkippedLine>,
    /// Whether a header line was seen
    pub header_found: bool,
}

impl ParsedOutput {
    /// Whether no sample was parsed
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Whether `line` marks the start of the data region
pub fn is_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.contains(HEADER_PHRASE) {
        return true;
    }
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    compact.contains(HEADER_COLUMNS)
}

/// Parse raw benchmark output into samples.
///
/// Only lines after a header are considered. When no header exists at all,
/// every line containing the separator is tried instead and a warning is logged.
pub fn parse(raw: &str) -> ParsedOutput {
    let header_found = raw.lines().any(is_header);
    if !header_found {
        tracing::warn!("header not found in benchmark output, parsing all separated lines");
    }

    let mut output = ParsedOutput {
        header_found,
        ..Default::default()
    };
    let mut in_data = !header_found;

    for (idx, line) in raw.lines().enumerate() {
        if is_header(line) {
            in_data = true;
            continue;
        }
        if !in_data || !line.contains(FIELD_SEPARATOR) {
            continue;
        }

        let text = line.trim();
        match parse_line(text) {
            Ok(sample) => output.samples.push(sample),
            Err(issue) => {
                tracing::warn!("could not parse line {}: {:?} ({})", idx + 1, text, issue);
                output.skipped.push(SkippedLine {
                    line_number: idx + 1,
                    text: text.to_string(),
                    issue,
                });
            }
        }
    }

    if output.samples.is_empty() {
        tracing::warn!("no data parsed from benchmark output");
    }

    output
}

/// Parse a single `threads,time,speedup` line.
pub fn parse_line(line: &str) -> Result<Sample, ParseIssue> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    let [threads, time, speedup] = fields.as_slice() else {
        return Err(ParseIssue::FieldCount(fields.len()));
    };

    let threads = parse_number("threads", threads)?;
    if threads < 1.0 || threads.fract() != 0.0 || threads > u32::MAX as f64 {
        return Err(ParseIssue::OutOfRange {
            field: "threads",
            value: threads,
        });
    }
    let elapsed_secs = positive("time", parse_number("time", time)?)?;
    let reported_speedup = non_negative("speedup", parse_number("speedup", speedup)?)?;

    Ok(Sample::new(threads as u32, elapsed_secs, reported_speedup))
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ParseIssue> {
    raw.parse::<f64>()
        .map_err(|_| ParseIssue::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn positive(field: &'static str, value: f64) -> Result<f64, ParseIssue> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ParseIssue::OutOfRange { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ParseIssue> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParseIssue::OutOfRange { field, value })
    }
}
