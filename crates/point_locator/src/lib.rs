//! point_locator - Incremental spatial indexes over 3D point sets
//!
//! This crate answers "which stored point is near this location" for point
//! clouds that grow one point at a time. It is the building block for merging
//! coincident points, snapping to existing vertices, and nearest-neighbour
//! lookup.
//!
//! # Features
//!
//! - **Uniform grid**: Buckets sized from the point count, O(1) bucket lookup,
//!   shell-by-shell neighbour search
//! - **Adaptive octree**: Leaves split by occupancy, exact duplicates kept
//!   together, exact nearest-point search pruned by data bounds
//! - **Unique insertion**: Points within a tolerance of an existing point
//!   collapse onto it
//! - **Point merging**: Whole-dataset deduplication with either strategy
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use point_locator::{new_locator, LocatorKind, PointStore};
//!
//! let mut locator = new_locator(LocatorKind::Octree);
//! locator.set_tolerance(0.01);
//! locator
//!   .init_point_insertion(PointStore::new(), &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0], 0)
//!   .unwrap();
//!
//! let a = locator.insert_unique_point(DVec3::splat(0.5)).unwrap();
//! let b = locator.insert_unique_point(DVec3::splat(0.505)).unwrap();
//! assert!(a.inserted);
//! assert_eq!(b.id, a.id);
//! assert_eq!(locator.find_closest_point(DVec3::ZERO), Some(a.id));
//! ```

pub mod bounds;
pub mod constants;
pub mod error;
pub mod point_store;
pub mod types;

pub use bounds::Bounds;
pub use error::LocatorError;
pub use point_store::{Dataset, PointStore};
pub use types::{ClosestPoint, InsertMode, InsertOutcome, PointId};

// Shared locator interface
pub mod locator;
pub use locator::{new_locator, LocatorKind, SpatialPointIndex};

// Uniform bucket grid
pub mod grid;
pub use grid::{GridConfig, GridPointIndex, GridStats};

// Adaptive octree
pub mod octree;
pub use octree::{OctreeConfig, OctreePointIndex, OctreeStats};

// Whole-dataset deduplication
pub mod merge;
pub use merge::{merge_points, MergeConfig, MergedPoints};

#[cfg(test)]
mod test_support;
