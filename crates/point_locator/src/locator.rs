//! The interface shared by every point locator.

use glam::DVec3;

use crate::error::LocatorError;
use crate::grid::GridPointIndex;
use crate::octree::OctreePointIndex;
use crate::point_store::{Dataset, PointStore};
use crate::types::{ClosestPoint, InsertOutcome, PointId};

/// Which strategy backs a [`SpatialPointIndex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LocatorKind {
  /// Uniform bucket grid. Cheap to build, best for evenly spread points.
  #[default]
  Grid,
  /// Adaptive octree. Resolution follows the data, clustered input stays fast.
  Octree,
}

/// Incremental 3D point index.
///
/// Queries take `&self` and insertions `&mut self`, so the borrow checker
/// enforces that nothing reads while a point is being inserted. Absence is
/// always `None` (or an empty slice); only setup errors are `Err`.
pub trait SpatialPointIndex {
  fn kind(&self) -> LocatorKind;

  /// Index every point of `dataset`. Ids are the dataset's ids.
  fn build_locator(&mut self, dataset: &dyn Dataset) -> Result<(), LocatorError>;

  /// Prepare for incremental insertion into `points` (which is cleared)
  /// within `bounds = [xmin, xmax, ymin, ymax, zmin, zmax]`.
  ///
  /// `est_num_pts` sizes the structure when non-zero.
  fn init_point_insertion(
    &mut self,
    points: PointStore,
    bounds: &[f64],
    est_num_pts: usize,
  ) -> Result<(), LocatorError>;

  /// Store `x` under `id` without checking for duplicates.
  fn insert_point(&mut self, id: PointId, x: DVec3) -> Result<(), LocatorError>;

  /// Store `x` under the next free id without checking for duplicates.
  fn insert_next_point(&mut self, x: DVec3) -> Result<PointId, LocatorError>;

  /// Store `x` unless a point within tolerance already exists.
  fn insert_unique_point(&mut self, x: DVec3) -> Result<InsertOutcome, LocatorError> {
    if let Some(id) = self.is_inserted_point(x) {
      return Ok(InsertOutcome::existing(id));
    }
    self.insert_next_point(x).map(InsertOutcome::inserted)
  }

  /// Id of a stored point within tolerance of `x`.
  fn is_inserted_point(&self, x: DVec3) -> Option<PointId>;

  fn find_closest_point(&self, x: DVec3) -> Option<PointId>;

  /// Closest point no further than `radius` from `x`.
  ///
  /// A non-zero `input_data_length` caps the search at the distance from `x`
  /// to the indexed bounds plus that length.
  fn find_closest_point_within_radius(
    &self,
    radius: f64,
    x: DVec3,
    input_data_length: f64,
  ) -> Option<ClosestPoint>;

  /// Closest inserted point, `None` when `x` lies outside the indexed bounds.
  fn find_closest_inserted_point(&self, x: DVec3) -> Option<PointId>;

  /// Ids sharing `x`'s bucket (grid) or leaf (octree).
  fn points_in_bucket(&self, x: DVec3) -> &[PointId];

  /// Drop the search structure and the stored points.
  fn free_search_structure(&mut self);

  fn points(&self) -> &PointStore;

  /// Hand the stored points back, leaving the index uninitialized.
  fn take_points(&mut self) -> PointStore;

  /// Merge tolerance (absolute distance).
  fn tolerance(&self) -> f64;

  /// Takes effect at the next `init_point_insertion` or `build_locator`.
  fn set_tolerance(&mut self, tolerance: f64);
}

/// Construct a locator of the requested kind with default configuration.
pub fn new_locator(kind: LocatorKind) -> Box<dyn SpatialPointIndex> {
  match kind {
    LocatorKind::Grid => Box::new(GridPointIndex::default()),
    LocatorKind::Octree => Box::new(OctreePointIndex::default()),
  }
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
