//! OctreeConfig - leaf capacity, depth limit and merge tolerance.

use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_POINTS_PER_LEAF, DEFAULT_TOLERANCE};

/// Configuration for an [`OctreePointIndex`](super::OctreePointIndex).
#[derive(Clone, Debug, PartialEq)]
pub struct OctreeConfig {
  /// Ids a leaf holds before it subdivides. Exact duplicates do not count
  /// towards the limit.
  pub max_points_per_leaf: usize,

  /// Merge tolerance (absolute distance).
  pub tolerance: f64,

  /// Grow the root box to a cube so every octant is a cube too.
  pub build_cubic_octree: bool,

  /// Nodes at this depth never subdivide; their id list grows without bound.
  /// Root is depth 0.
  pub max_depth: u32,
}

impl OctreeConfig {
  pub fn with_max_points_per_leaf(mut self, max_points_per_leaf: usize) -> Self {
    self.max_points_per_leaf = max_points_per_leaf;
    self
  }

  pub fn with_tolerance(mut self, tolerance: f64) -> Self {
    self.tolerance = tolerance;
    self
  }
}

impl Default for OctreeConfig {
  fn default() -> Self {
    Self {
      max_points_per_leaf: DEFAULT_MAX_POINTS_PER_LEAF,
      tolerance: DEFAULT_TOLERANCE,
      build_cubic_octree: false,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }
}
