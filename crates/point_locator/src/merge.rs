//! Coincident point merging on top of any [`SpatialPointIndex`].
//!
//! Every input point goes through `insert_unique_point`; points within the
//! tolerance of an earlier one collapse onto it.

use crate::constants::DEFAULT_TOLERANCE;
use crate::error::LocatorError;
use crate::locator::{new_locator, LocatorKind, SpatialPointIndex};
use crate::point_store::{Dataset, PointStore};
use crate::types::PointId;

/// Configuration for [`merge_points`].
#[derive(Clone, Debug, PartialEq)]
pub struct MergeConfig {
  /// Strategy used to find coincident points.
  pub kind: LocatorKind,

  /// Merge distance. Absolute, or a fraction of the input's diagonal.
  pub tolerance: f64,

  /// Whether `tolerance` is a distance rather than a fraction.
  pub tolerance_is_absolute: bool,
}

impl MergeConfig {
  pub fn absolute(kind: LocatorKind, tolerance: f64) -> Self {
    Self {
      kind,
      tolerance,
      tolerance_is_absolute: true,
    }
  }

  pub fn relative(kind: LocatorKind, fraction: f64) -> Self {
    Self {
      kind,
      tolerance: fraction,
      tolerance_is_absolute: false,
    }
  }

  /// Absolute merge distance for a dataset with the given diagonal.
  pub fn effective_tolerance(&self, diagonal: f64) -> f64 {
    if self.tolerance_is_absolute {
      self.tolerance
    } else {
      self.tolerance * diagonal
    }
  }
}

impl Default for MergeConfig {
  fn default() -> Self {
    Self {
      kind: LocatorKind::default(),
      tolerance: DEFAULT_TOLERANCE,
      tolerance_is_absolute: true,
    }
  }
}

/// Output of [`merge_points`].
#[derive(Clone, Debug, Default)]
pub struct MergedPoints {
  /// The surviving points, in first-seen order.
  pub points: PointStore,
  /// Input id to merged id.
  pub point_map: Vec<PointId>,
}

impl MergedPoints {
  /// Number of input points absorbed by an earlier one.
  pub fn merged_count(&self) -> usize {
    self.point_map.len() - self.points.count()
  }
}

/// Collapse points of `dataset` closer than the configured tolerance.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "merge::merge_points", fields(kind = ?config.kind)))]
pub fn merge_points(dataset: &dyn Dataset, config: &MergeConfig) -> Result<MergedPoints, LocatorError> {
  let n = dataset.point_count();
  if n == 0 {
    return Ok(MergedPoints::default());
  }

  let bounds = dataset.bounds();
  let tolerance = config.effective_tolerance(bounds.diagonal_length().unwrap_or(0.0));
  let mut locator = new_locator(config.kind);
  locator.set_tolerance(tolerance);
  locator.init_point_insertion(PointStore::with_capacity(n), &bounds.to_array(), n)?;

  let mut point_map = Vec::with_capacity(n);
  for p in dataset.points().iter() {
    point_map.push(locator.insert_unique_point(p)?.id);
  }

  let merged = MergedPoints {
    points: locator.take_points(),
    point_map,
  };
  #[cfg(feature = "tracing")]
  tracing::debug!(
    input = n,
    output = merged.points.count(),
    tolerance,
    "points merged"
  );
  Ok(merged)
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod merge_test;
