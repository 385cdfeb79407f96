//! Default tuning values shared by the locators.
//!
//! ```text
//! Grid:   bucket width = (max - min) / divisions            (per axis)
//!         auto divisions target  ceil(n / POINTS_PER_BUCKET) buckets
//! Octree: a leaf splits once it holds MAX_POINTS_PER_LEAF ids
//!         (exact duplicates excepted), never below MAX_DEPTH
//! ```

/// Divisions per axis used when a grid is not sized automatically.
pub const DEFAULT_DIVISIONS: [usize; 3] = [50, 50, 50];

/// Target average bucket occupancy for automatic grid sizing.
pub const DEFAULT_POINTS_PER_BUCKET: usize = 3;

/// Merge tolerance (absolute distance) for unique insertion.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Leaf capacity before an octree node subdivides.
pub const DEFAULT_MAX_POINTS_PER_LEAF: usize = 128;

/// Deepest level an octree node may reach. Root is depth 0.
///
/// 128 halvings are far below f64 resolution for any sane root box, so only
/// near-coincident clusters that bisection cannot separate ever hit it.
pub const DEFAULT_MAX_DEPTH: u32 = 128;

/// Fraction of the largest side used to pull the octree root's lower bounds
/// back, so points on the min faces are strictly inside the half-open box.
pub const OCTREE_FUDGE_RATIO: f64 = 10e-6;

/// Sides thinner than this fraction of the largest side are pushed out.
pub const OCTREE_MIN_SIDE_RATIO: f64 = 10e-2;

/// Fraction of the total edge length below which a side counts as zero width
/// when computing grid divisions.
pub const ZERO_WIDTH_RATIO: f64 = 0.001 / 3.0;

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
