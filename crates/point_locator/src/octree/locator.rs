//! Incremental octree point locator.

use glam::DVec3;

use super::node::NodeId;
use super::tree::{Octree, OctreeStats};
use super::OctreeConfig;
use crate::bounds::Bounds;
use crate::constants::{OCTREE_FUDGE_RATIO, OCTREE_MIN_SIDE_RATIO};
use crate::error::LocatorError;
use crate::locator::{LocatorKind, SpatialPointIndex};
use crate::point_store::{Dataset, PointStore};
use crate::types::{ClosestPoint, InsertMode, PointId};

/// Point locator backed by an adaptive [`Octree`].
///
/// The root box is derived from the insertion bounds: slab-thin axes are
/// pushed out and every other lower bound is pulled back slightly, so points
/// on the min faces are strictly inside the half-open root.
#[derive(Clone, Debug, Default)]
pub struct OctreePointIndex {
  config: OctreeConfig,
  points: PointStore,
  tree: Option<Octree>,
  insert_tolerance2: f64,
  max_dim_size: f64,
}

impl OctreePointIndex {
  pub fn new(config: OctreeConfig) -> Self {
    Self {
      config,
      ..Self::default()
    }
  }

  #[inline]
  pub fn config(&self) -> &OctreeConfig {
    &self.config
  }

  /// The tree, once initialized.
  #[inline]
  pub fn tree(&self) -> Option<&Octree> {
    self.tree.as_ref()
  }

  pub fn number_of_nodes(&self) -> usize {
    self.tree.as_ref().map_or(0, Octree::number_of_nodes)
  }

  /// Largest side of the insertion bounds.
  #[inline]
  pub fn max_dim_size(&self) -> f64 {
    self.max_dim_size
  }

  pub fn stats(&self) -> OctreeStats {
    self.tree.as_ref().map(Octree::stats).unwrap_or_default()
  }

  /// Root box for user bounds `b`.
  fn root_bounds(&mut self, b: Bounds) -> Bounds {
    let mut lo = b.min;
    let mut hi = b.max;
    let mut dims = b.lengths();
    self.max_dim_size = dims.max_element();

    if self.max_dim_size <= 0.0 {
      // A single location: give the root a unit box around it.
      return b.inflate(0.5);
    }

    if self.config.build_cubic_octree {
      for axis in 0..3 {
        let delta = self.max_dim_size - dims[axis];
        if delta != 0.0 {
          lo[axis] -= 0.5 * delta;
          hi[axis] += 0.5 * delta;
          dims[axis] = self.max_dim_size;
        }
      }
    }

    let fudge = self.max_dim_size * OCTREE_FUDGE_RATIO;
    let min_side = self.max_dim_size * OCTREE_MIN_SIDE_RATIO;
    for axis in 0..3 {
      if dims[axis] < min_side {
        let old_lo = lo[axis];
        lo[axis] = hi[axis] - min_side;
        hi[axis] = old_lo + min_side;
      } else {
        lo[axis] -= fudge;
      }
    }
    Bounds::new(lo, hi)
  }

  fn insert_with_mode(&mut self, id: PointId, x: DVec3, mode: InsertMode) -> Result<PointId, LocatorError> {
    let max_pts = self.config.max_points_per_leaf;
    let tree = match self.tree.as_mut() {
      Some(tree) => tree,
      None => {
        #[cfg(feature = "tracing")]
        tracing::error!("octree locator used for insertion before initialization");
        return Err(LocatorError::NotInitialized);
      }
    };
    #[cfg(feature = "tracing")]
    if !tree.root_node().contains_point(x) {
      tracing::warn!(?x, "inserting a point outside the octree root");
    }
    let leaf = tree.leaf_container(x);
    Ok(tree.insert_point(leaf, &mut self.points, x, max_pts, id, mode))
  }

  /// Leaf `x` routes to plus the best point in it. Points outside the root
  /// route to a border leaf, the same one insertion used.
  fn leaf_and_best(&self, x: DVec3) -> Option<(&Octree, NodeId, Option<ClosestPoint>)> {
    let tree = self.tree.as_ref()?;
    if tree.root_node().number_of_points() == 0 {
      return None;
    }
    let leaf = tree.leaf_container(x);
    Some((tree, leaf, tree.closest_point_in_leaf(leaf, &self.points, x)))
  }

  /// Whether every other leaf is at least `sqrt(bound2)` away from `x`.
  /// Only holds for points inside the root, where the inner faces of the
  /// leaf separate it from the rest of the tree.
  fn leaf_is_isolated(tree: &Octree, leaf: NodeId, x: DVec3, bound2: f64) -> bool {
    tree.root_node().contains_point(x)
      && tree.node(leaf).distance2_to_inner_boundary(x, tree.root_node()) >= bound2
  }

  /// Exact nearest point within `sqrt(radius2)`: the leaf holding `x` first,
  /// then the rest of the tree only where it can still beat that.
  fn closest_within(&self, x: DVec3, radius2: f64) -> Option<ClosestPoint> {
    let (tree, leaf, best) = self.leaf_and_best(x)?;
    let best = best.filter(|c| c.dist2 <= radius2);
    let bound2 = best.map_or(radius2, |c| c.dist2);
    if bound2 == 0.0 {
      return best;
    }
    if best.is_some() && Self::leaf_is_isolated(tree, leaf, x, bound2) {
      return best;
    }
    match tree.closest_point_in_sphere(&self.points, x, bound2, Some(leaf)) {
      Some(other) if best.is_none_or(|b| other.dist2 < b.dist2) => Some(other),
      _ => best,
    }
  }

  fn is_inserted_zero_tolerance(&self, x: DVec3) -> Option<PointId> {
    let tree = self.tree.as_ref()?;
    let leaf = tree.leaf_container(x);
    tree.find_duplicate_in_leaf(leaf, &self.points, x)
  }

  fn is_inserted_with_tolerance(&self, x: DVec3) -> Option<PointId> {
    let (tree, leaf, best) = self.leaf_and_best(x)?;
    let tol2 = self.insert_tolerance2;
    if let Some(b) = best {
      if b.dist2 == 0.0 {
        return Some(b.id);
      }
    }

    let mut best = best.filter(|b| b.dist2 <= tol2);
    if !Self::leaf_is_isolated(tree, leaf, x, tol2) {
      let bound2 = best.map_or(tol2, |b| b.dist2);
      if let Some(other) = tree.closest_point_in_sphere(&self.points, x, bound2, Some(leaf)) {
        if best.is_none_or(|b| other.dist2 < b.dist2) {
          best = Some(other);
        }
      }
    }
    best.map(|b| b.id)
  }
}

impl SpatialPointIndex for OctreePointIndex {
  fn kind(&self) -> LocatorKind {
    LocatorKind::Octree
  }

  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::build_locator"))]
  fn build_locator(&mut self, dataset: &dyn Dataset) -> Result<(), LocatorError> {
    let n = dataset.point_count();
    if n == 0 {
      #[cfg(feature = "tracing")]
      tracing::error!("cannot build an octree locator over an empty dataset");
      return Err(LocatorError::EmptyDataset);
    }

    let bounds = dataset.bounds().to_array();
    self.init_point_insertion(PointStore::new(), &bounds, n)?;
    self.points = dataset.points().clone();
    for id in 0..self.points.count() {
      let p = self.points[id];
      self.insert_with_mode(id, p, InsertMode::IndexOnly)?;
    }

    #[cfg(feature = "tracing")]
    {
      let stats = self.stats();
      tracing::debug!(
        points = n,
        nodes = stats.nodes,
        leaves = stats.leaves,
        depth = stats.max_depth,
        "octree built"
      );
    }
    Ok(())
  }

  fn init_point_insertion(
    &mut self,
    mut points: PointStore,
    bounds: &[f64],
    _est_num_pts: usize,
  ) -> Result<(), LocatorError> {
    let bounds = Bounds::from_slice(bounds).inspect_err(|_err| {
      #[cfg(feature = "tracing")]
      tracing::error!(error = %_err, "rejected octree insertion bounds");
    })?;
    if self.config.max_points_per_leaf == 0 {
      #[cfg(feature = "tracing")]
      tracing::error!("octree leaf capacity must be positive");
      return Err(LocatorError::InvalidLeafCapacity);
    }

    self.free_search_structure();
    points.reset();
    self.points = points;
    let root = self.root_bounds(bounds);
    self.tree = Some(Octree::new(root, self.config.max_depth));
    self.insert_tolerance2 = self.config.tolerance * self.config.tolerance;
    Ok(())
  }

  fn insert_point(&mut self, id: PointId, x: DVec3) -> Result<(), LocatorError> {
    self.insert_with_mode(id, x, InsertMode::SetAt).map(|_| ())
  }

  fn insert_next_point(&mut self, x: DVec3) -> Result<PointId, LocatorError> {
    let next = self.points.count();
    self.insert_with_mode(next, x, InsertMode::Append)
  }

  fn is_inserted_point(&self, x: DVec3) -> Option<PointId> {
    if self.insert_tolerance2 == 0.0 {
      self.is_inserted_zero_tolerance(x)
    } else {
      self.is_inserted_with_tolerance(x)
    }
  }

  /// Exact nearest point, wherever `x` lies.
  fn find_closest_point(&self, x: DVec3) -> Option<PointId> {
    self.closest_within(x, f64::MAX).map(|c| c.id)
  }

  /// `input_data_length` only tunes the grid's search; the octree prunes by
  /// data bounds and ignores it.
  fn find_closest_point_within_radius(
    &self,
    radius: f64,
    x: DVec3,
    _input_data_length: f64,
  ) -> Option<ClosestPoint> {
    self.closest_within(x, radius * radius)
  }

  fn find_closest_inserted_point(&self, x: DVec3) -> Option<PointId> {
    let tree = self.tree.as_ref()?;
    if !tree.root_node().contains_point(x) {
      return None;
    }
    self.find_closest_point(x)
  }

  /// Ids of the leaf `x` routes to, which for points outside the root is
  /// the border leaf their insertion used.
  fn points_in_bucket(&self, x: DVec3) -> &[PointId] {
    match self.tree.as_ref() {
      Some(tree) => tree.node(tree.leaf_container(x)).point_ids(),
      None => &[],
    }
  }

  fn free_search_structure(&mut self) {
    self.tree = None;
    self.points.reset();
    self.max_dim_size = 0.0;
  }

  fn points(&self) -> &PointStore {
    &self.points
  }

  fn take_points(&mut self) -> PointStore {
    let points = std::mem::take(&mut self.points);
    self.free_search_structure();
    points
  }

  fn tolerance(&self) -> f64 {
    self.config.tolerance
  }

  fn set_tolerance(&mut self, tolerance: f64) {
    self.config.tolerance = tolerance;
  }
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
