//! OctreeNode - one cell of the adaptive octree.
//!
//! A node carries two boxes: its fixed partition bounds, set once when the
//! node is created, and the tight data bounds of the points at or below it.
//! Membership against the partition is half-open (`min < p <= max`) so a
//! point on a face shared by two siblings belongs to exactly one of them.

use glam::DVec3;

use crate::bounds::Bounds;
use crate::types::PointId;

/// Handle of a node inside an [`Octree`](super::Octree) arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0
  }
}

/// Leaf id list or the eight children, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
  Leaf(Vec<PointId>),
  Internal([NodeId; 8]),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OctreeNode {
  min: DVec3,
  max: DVec3,
  min_data: DVec3,
  max_data: DVec3,
  content: NodeContent,
  parent: Option<NodeId>,
  number_of_points: usize,
  depth: u32,
  /// Set once the depth limit forced this leaf past its capacity.
  pub(crate) overflowed: bool,
}

impl OctreeNode {
  /// Empty leaf with unset (zero) bounds.
  pub fn new(parent: Option<NodeId>, depth: u32) -> Self {
    Self {
      min: DVec3::ZERO,
      max: DVec3::ZERO,
      min_data: DVec3::ZERO,
      max_data: DVec3::ZERO,
      content: NodeContent::Leaf(Vec::new()),
      parent,
      number_of_points: 0,
      depth,
      overflowed: false,
    }
  }

  /// Set the partition bounds. The data bounds are reset inverted
  /// (`min = max corner`, `max = min corner`) so the first point collapses
  /// them onto itself.
  pub fn set_bounds(&mut self, x1: f64, x2: f64, y1: f64, y2: f64, z1: f64, z2: f64) {
    self.min = DVec3::new(x1, y1, z1);
    self.max = DVec3::new(x2, y2, z2);
    self.min_data = self.max;
    self.max_data = self.min;
  }

  #[inline]
  pub fn bounds(&self) -> Bounds {
    Bounds::new(self.min, self.max)
  }

  /// Tight box of the points at or below this node. Inverted while empty.
  #[inline]
  pub fn data_bounds(&self) -> Bounds {
    Bounds::new(self.min_data, self.max_data)
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    matches!(self.content, NodeContent::Leaf(_))
  }

  #[inline]
  pub fn content(&self) -> &NodeContent {
    &self.content
  }

  #[inline]
  pub(crate) fn content_mut(&mut self) -> &mut NodeContent {
    &mut self.content
  }

  /// Ids stored in this leaf; empty for internal nodes.
  #[inline]
  pub fn point_ids(&self) -> &[PointId] {
    match &self.content {
      NodeContent::Leaf(ids) => ids,
      NodeContent::Internal(_) => &[],
    }
  }

  #[inline]
  pub fn children(&self) -> Option<&[NodeId; 8]> {
    match &self.content {
      NodeContent::Internal(children) => Some(children),
      NodeContent::Leaf(_) => None,
    }
  }

  #[inline]
  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  #[inline]
  pub fn depth(&self) -> u32 {
    self.depth
  }

  /// Points at or below this node, duplicates included.
  #[inline]
  pub fn number_of_points(&self) -> usize {
    self.number_of_points
  }

  /// Half-open test against the partition bounds.
  #[inline]
  pub fn contains_point(&self, p: DVec3) -> bool {
    self.min.x < p.x
      && p.x <= self.max.x
      && self.min.y < p.y
      && p.y <= self.max.y
      && self.min.z < p.z
      && p.z <= self.max.z
  }

  /// Closed test against the data bounds.
  #[inline]
  pub fn contains_point_by_data(&self, p: DVec3) -> bool {
    Bounds::new(self.min_data, self.max_data).contains_point(p)
  }

  /// Whether every point held here sits exactly at `p`.
  #[inline]
  pub fn contains_duplicate_points_only(&self, p: DVec3) -> bool {
    self.min_data == p && self.max_data == p
  }

  /// Count `n_hits` more points and, when `update_data`, widen the data
  /// bounds to `p`. Returns whether the data bounds changed.
  pub fn update_counter_and_data_bounds(&mut self, p: DVec3, n_hits: usize, update_data: bool) -> bool {
    self.number_of_points += n_hits;
    if !update_data {
      return false;
    }

    let mut updated = false;
    for axis in 0..3 {
      if p[axis] < self.min_data[axis] {
        self.min_data[axis] = p[axis];
        updated = true;
      }
      if p[axis] > self.max_data[axis] {
        self.max_data[axis] = p[axis];
        updated = true;
      }
    }
    updated
  }

  /// Squared distance from `p` to this node's boundary, plus the closest
  /// boundary point.
  ///
  /// Outside the box this is the distance to the nearest corner, edge or
  /// face. Inside, it is the distance to the nearest face; with `inner_only`
  /// faces lying on the root's hull are ignored, and `f64::MAX` is returned
  /// when none remain. `check_data` measures against data bounds (this
  /// node's and the root's) instead of partition bounds. Non-finite points
  /// are logged and get `f64::MAX`.
  pub fn distance2_to_boundary(
    &self,
    p: DVec3,
    root: &OctreeNode,
    inner_only: bool,
    check_data: bool,
  ) -> (f64, DVec3) {
    if !p.is_finite() {
      #[cfg(feature = "tracing")]
      tracing::error!(?p, "non-finite point in distance2_to_boundary");
      return (f64::MAX, p);
    }

    let (lo, hi, root_lo, root_hi) = if check_data {
      (self.min_data, self.max_data, root.min_data, root.max_data)
    } else {
      (self.min, self.max, root.min, root.max)
    };

    let less = p.cmplt(lo);
    let more = p.cmpgt(hi);
    let within = [
      !less.x && !more.x,
      !less.y && !more.y,
      !less.z && !more.z,
    ];
    let flag = (within[2] as u8) << 2 | (within[1] as u8) << 1 | within[0] as u8;
    let nearest_face = |axis: usize| if less.test(axis) { lo[axis] } else { hi[axis] };

    let mut closest = p;
    match flag {
      // Corner, edges and faces: snap every outside axis onto the box.
      0..=6 => {
        for axis in 0..3 {
          if !within[axis] {
            closest[axis] = nearest_face(axis);
          }
        }
        (p.distance_squared(closest), closest)
      }
      // Inside on every axis.
      _ => {
        let faces = [
          (p.x - lo.x, lo.x == root_lo.x, 0, lo.x),
          (hi.x - p.x, hi.x == root_hi.x, 0, hi.x),
          (p.y - lo.y, lo.y == root_lo.y, 1, lo.y),
          (hi.y - p.y, hi.y == root_hi.y, 1, hi.y),
          (p.z - lo.z, lo.z == root_lo.z, 2, lo.z),
          (hi.z - p.z, hi.z == root_hi.z, 2, hi.z),
        ];
        let mut min_dist = f64::MAX;
        let mut best_face = None;
        for (dist, on_hull, axis, coord) in faces {
          if inner_only && on_hull {
            continue;
          }
          if dist < min_dist {
            min_dist = dist;
            best_face = Some((axis, coord));
          }
        }
        match best_face {
          Some((axis, coord)) => {
            closest[axis] = coord;
            (min_dist * min_dist, closest)
          }
          None => (f64::MAX, closest),
        }
      }
    }
  }

  /// Squared distance from an inside point to the nearest face shared with
  /// another subtree.
  #[inline]
  pub fn distance2_to_inner_boundary(&self, p: DVec3, root: &OctreeNode) -> f64 {
    self.distance2_to_boundary(p, root, true, false).0
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
