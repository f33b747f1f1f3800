//! Amdahl's Law
//!
//! `speedup(n, p) = 1 / ((1 - p) + p / n)` where `p` is the parallelizable
//! fraction of the work and `n` the number of processors.
//!
//! The inverse ([`estimate_parallel_fraction`]) is a single-point estimate from
//! the best observed speedup. It is not a least-squares fit and is sensitive to
//! noise in that one sample; values at or below 1x give a non-positive `p`.

use serde::{Deserialize, Serialize};

/// Upper bound applied to estimated parallel fractions
pub const MAX_ESTIMATED_FRACTION: f64 = 0.99;

/// Theoretical speedup on `n` processors for parallel fraction `p`.
///
/// `n` must be at least 1; `n == 0` divides by zero and is the caller's bug.
pub fn speedup(n: f64, p: f64) -> f64 {
    debug_assert!(n >= 1.0, "processor count must be >= 1, got {n}");
    1.0 / ((1.0 - p) + p / n)
}

/// Estimate `p` from a speedup `max_speedup` observed at `threads` threads.
///
/// Returns `None` when the inversion is undefined: a single thread, or an
/// observation where `S == 1/N`. The result is capped at
/// [`MAX_ESTIMATED_FRACTION`] but not floored, so a slowdown yields `p < 0`.
pub fn estimate_parallel_fraction(max_speedup: f64, threads: u32) -> Option<f64> {
    if threads <= 1 {
        return None;
    }
    let denominator = max_speedup - 1.0 / threads as f64;
    if denominator == 0.0 {
        return None;
    }
    let p = (max_speedup - 1.0) / denominator;
    p.is_finite().then(|| p.min(MAX_ESTIMATED_FRACTION))
}

/// Estimate `p` from the observation with the highest speedup.
///
/// Ties resolve to the first observation in the slice.
pub fn estimate_from_observations(observations: &[(u32, f64)]) -> Option<f64> {
    let (threads, best) = observations
        .iter()
        .copied()
        .fold(None, |best: Option<(u32, f64)>, (threads, s)| match best {
            Some((_, current)) if current >= s => best,
            _ => Some((threads, s)),
        })?;
    estimate_parallel_fraction(best, threads)
}

/// `samples` evenly spaced points of the theoretical curve over `1..=max_processors`.
pub fn theoretical_curve(p: f64, max_processors: f64, samples: usize) -> Vec<(f64, f64)> {
    linspace(1.0, max_processors.max(1.0), samples)
        .into_iter()
        .map(|n| (n, speedup(n, p)))
        .collect()
}

fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (samples - 1) as f64;
            (0..samples).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Where the parallel fraction for a theoretical curve comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum FractionSource {
    /// Use a known fraction
    Fixed(f64),
    /// Estimate from the best observed speedup
    Estimated,
}

impl FractionSource {
    /// Resolve to a concrete fraction given the observed `(threads, speedup)` pairs.
    pub fn resolve(&self, observations: &[(u32, f64)]) -> Option<f64> {
        match *self {
            FractionSource::Fixed(p) => Some(p),
            FractionSource::Estimated => estimate_from_observations(observations),
        }
    }
}
