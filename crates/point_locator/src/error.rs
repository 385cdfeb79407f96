//! Setup-time errors.
//!
//! Lookups never fail: absence is `None`. Only configuring an index with
//! unusable input, or inserting into one that was never configured, errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
  /// Bounds slices must be `[xmin, xmax, ymin, ymax, zmin, zmax]`.
  #[error("bounds must hold exactly 6 values, got {0}")]
  InvalidBoundsLength(usize),

  /// A bound is NaN/infinite, or a min exceeds its max.
  #[error("bounds {0:?} are not finite or are inverted")]
  InvalidBounds([f64; 6]),

  /// Bulk build was asked to index nothing.
  #[error("dataset holds no points")]
  EmptyDataset,

  /// Insertion was attempted before `init_point_insertion` or `build_locator`.
  #[error("locator is not initialized for point insertion")]
  NotInitialized,

  #[error("max points per leaf must be at least 1")]
  InvalidLeafCapacity,
}
