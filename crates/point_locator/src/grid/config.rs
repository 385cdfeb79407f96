//! GridConfig - bucket grid resolution and merge tolerance.

use crate::constants::{DEFAULT_DIVISIONS, DEFAULT_POINTS_PER_BUCKET, DEFAULT_TOLERANCE};

/// Configuration for a [`GridPointIndex`](super::GridPointIndex).
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
  /// Buckets per axis when sizing is not automatic. Zeros are raised to 1.
  pub divisions: [usize; 3],

  /// Target average bucket occupancy for automatic sizing.
  pub points_per_bucket: usize,

  /// Merge tolerance (absolute distance).
  pub tolerance: f64,

  /// Derive divisions from the point count instead of `divisions`.
  /// Incremental insertion only does so when given a non-zero estimate.
  pub automatic: bool,
}

impl GridConfig {
  /// Fixed resolution, no automatic sizing.
  pub fn fixed(divisions: [usize; 3]) -> Self {
    Self {
      divisions,
      automatic: false,
      ..Self::default()
    }
  }

  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }
}

impl Default for GridConfig {
  fn default() -> Self {
    Self {
      divisions: DEFAULT_DIVISIONS,
      points_per_bucket: DEFAULT_POINTS_PER_BUCKET,
      tolerance: DEFAULT_TOLERANCE,
      automatic: true,
    }
  }
}
