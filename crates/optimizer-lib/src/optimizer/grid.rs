//! Constrained share grid
//!
//! The first three channels are enumerated on a discrete grid; the last
//! channel takes whatever share is left and the point is kept only if that
//! share is inside its bounds. Axes are built from integer step counts so
//! both endpoints are always present and never duplicated.

use crate::error::OptimizerError;
use serde::{Deserialize, Serialize};

/// Grid spacing as a fraction of the total budget
pub const DEFAULT_STEP: f64 = 0.05;

/// Slack allowed when testing a derived share against its bounds
pub const SHARE_TOLERANCE: f64 = 1e-9;

/// Allowed share range for one channel, as fractions of the total budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareBounds {
    pub min: f64,
    pub max: f64,
}

impl ShareBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, share: f64) -> bool {
        share >= self.min - SHARE_TOLERANCE && share <= self.max + SHARE_TOLERANCE
    }
}

/// One discretised grid dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    bounds: ShareBounds,
    step: f64,
    steps: usize,
}

impl GridAxis {
    pub fn new(bounds: ShareBounds, step: f64) -> Result<Self, OptimizerError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(OptimizerError::invalid(format!("grid step must be positive, got {}", step)));
        }
        if !(bounds.min.is_finite() && bounds.max.is_finite()) || bounds.min > bounds.max {
            return Err(OptimizerError::invalid(format!(
                "invalid share bounds [{}, {}]",
                bounds.min, bounds.max
            )));
        }
        let steps = ((bounds.max - bounds.min) / step).round() as usize;
        Ok(Self {
            bounds,
            step,
            steps,
        })
    }

    /// Number of grid values, endpoints included
    pub fn point_count(&self) -> usize {
        self.steps + 1
    }

    pub fn value(&self, i: usize) -> f64 {
        if i >= self.steps {
            self.bounds.max
        } else {
            self.bounds.min + i as f64 * self.step
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.point_count()).map(move |i| self.value(i))
    }
}

/// Per-channel share bounds plus grid spacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    /// Bounds in canonical channel order; the last channel is derived
    pub bounds: [ShareBounds; 4],
    pub step: f64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            bounds: [
                ShareBounds::new(0.10, 0.40),
                ShareBounds::new(0.20, 0.50),
                ShareBounds::new(0.05, 0.20),
                ShareBounds::new(0.10, 0.30),
            ],
            step: DEFAULT_STEP,
        }
    }
}

/// Admissible grid points, in enumeration order
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    /// Shares in canonical channel order
    pub accepted: Vec<[f64; 4]>,
    /// Points discarded because the derived share fell outside its bounds
    pub rejected: usize,
}

impl CandidateSet {
    /// Points enumerated before filtering
    pub fn raw_len(&self) -> usize {
        self.accepted.len() + self.rejected
    }
}

impl SearchSpace {
    fn axes(&self) -> Result<[GridAxis; 3], OptimizerError> {
        GridAxis::new(self.bounds[3], self.step)?;
        Ok([
            GridAxis::new(self.bounds[0], self.step)?,
            GridAxis::new(self.bounds[1], self.step)?,
            GridAxis::new(self.bounds[2], self.step)?,
        ])
    }

    /// Shares are within bounds and sum to one
    pub fn admits(&self, shares: &[f64; 4]) -> bool {
        let sum: f64 = shares.iter().sum();
        (sum - 1.0).abs() <= 1e-6
            && shares
                .iter()
                .zip(&self.bounds)
                .all(|(s, b)| b.contains(*s))
    }

    /// Enumerate the grid (first channel major, third channel minor) and
    /// keep the points whose derived share is admissible
    pub fn generate_candidates(&self) -> Result<CandidateSet, OptimizerError> {
        let [first, second, third] = self.axes()?;
        let derived = self.bounds[3];

        let mut accepted = Vec::new();
        let mut rejected = 0;

        for a in first.values() {
            for b in second.values() {
                for c in third.values() {
                    let d = 1.0 - a - b - c;
                    if derived.contains(d) {
                        accepted.push([a, b, c, d]);
                    } else {
                        rejected += 1;
                    }
                }
            }
        }

        Ok(CandidateSet { accepted, rejected })
    }
}
