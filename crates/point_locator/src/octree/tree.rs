//! Octree - arena owning every node of one adaptive octree.
//!
//! Nodes are never removed while the tree is built, so a `Vec` index is a
//! stable handle. Children point back to their parent through a [`NodeId`];
//! the parent's `Internal` content is the only owning edge.
//!
//! ```text
//! child i covers, per axis a:  bit (i >> a) & 1 == 0  ->  [min, mid]
//!                                                 1  ->  [mid, max]
//! child_index(p) = (p.x > mid.x) | (p.y > mid.y) << 1 | (p.z > mid.z) << 2
//! ```

use glam::DVec3;
use smallvec::SmallVec;

use super::node::{NodeContent, NodeId, OctreeNode};
use crate::bounds::Bounds;
use crate::point_store::PointStore;
use crate::types::{ClosestPoint, InsertMode, PointId};

/// Shape summary of an octree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OctreeStats {
  pub nodes: usize,
  pub leaves: usize,
  /// Deepest node. Root is depth 0.
  pub max_depth: u32,
  /// Longest leaf id list.
  pub largest_leaf: usize,
  /// Points counted at the root.
  pub points: usize,
  /// Leaves that exceeded their capacity because of the depth limit.
  pub overflowed_leaves: usize,
}

#[derive(Clone, Debug)]
pub struct Octree {
  nodes: Vec<OctreeNode>,
  max_depth: u32,
}

impl Octree {
  /// Tree made of a single empty root leaf covering `bounds`.
  pub fn new(bounds: Bounds, max_depth: u32) -> Self {
    let mut root = OctreeNode::new(None, 0);
    root.set_bounds(
      bounds.min.x,
      bounds.max.x,
      bounds.min.y,
      bounds.max.y,
      bounds.min.z,
      bounds.max.z,
    );
    Self {
      nodes: vec![root],
      max_depth,
    }
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  #[inline]
  pub fn root_node(&self) -> &OctreeNode {
    &self.nodes[0]
  }

  #[inline]
  pub fn node(&self, id: NodeId) -> &OctreeNode {
    &self.nodes[id.0]
  }

  #[inline]
  pub fn number_of_nodes(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn max_depth(&self) -> u32 {
    self.max_depth
  }

  /// Octant of internal node `node` that `p` routes to.
  ///
  /// Child 0's max corner is the split point on every axis, and points equal
  /// to it route low, matching the half-open membership of the children.
  /// Leaves have no octants and route everything to 0.
  pub fn child_index(&self, node: NodeId, p: DVec3) -> usize {
    let Some(children) = self.nodes[node.0].children() else {
      return 0;
    };
    let mid = self.nodes[children[0].0].bounds().max;
    (p.x > mid.x) as usize | ((p.y > mid.y) as usize) << 1 | ((p.z > mid.z) as usize) << 2
  }

  /// Leaf whose partition `p` routes to.
  pub fn leaf_container(&self, p: DVec3) -> NodeId {
    let mut node = self.root();
    while let Some(children) = self.nodes[node.0].children() {
      node = children[self.child_index(node, p)];
    }
    node
  }

  /// Record `new_pnt` in leaf `leaf`, subdividing when it is full.
  ///
  /// `mode` decides how the coordinate reaches `points`; the returned id is
  /// `pnt_id` unless `mode` is [`InsertMode::Append`].
  ///
  /// * empty leaf, or below `max_pts`, or `new_pnt` duplicates every point
  ///   already here: append.
  /// * full leaf: split into eight octants and redistribute. A leaf holding
  ///   only exact duplicates keeps bisecting until the new point separates.
  /// * at the depth limit: append anyway, past `max_pts`.
  pub fn insert_point(
    &mut self,
    leaf: NodeId,
    points: &mut PointStore,
    new_pnt: DVec3,
    max_pts: usize,
    pnt_id: PointId,
    mode: InsertMode,
  ) -> PointId {
    let max_pts = max_pts.max(1);
    let node = &self.nodes[leaf.0];
    let len = node.point_ids().len();
    if len < max_pts || node.contains_duplicate_points_only(new_pnt) {
      return self.append_to_leaf(leaf, points, new_pnt, pnt_id, mode);
    }
    if node.depth() >= self.max_depth {
      self.note_overflow(leaf);
      return self.append_to_leaf(leaf, points, new_pnt, pnt_id, mode);
    }

    let ids = self.take_ids(leaf);
    self.create_child_nodes(leaf, ids, points, new_pnt, max_pts, pnt_id, mode)
  }

  /// Walk from `node` up to, but excluding, `end_node` (the root when
  /// `None`), counting `n_hits` points everywhere and widening data bounds
  /// while they keep changing. Returns whether the last visited node's data
  /// bounds changed.
  pub fn update_counter_and_data_bounds_recursively(
    &mut self,
    node: NodeId,
    p: DVec3,
    n_hits: usize,
    update_data: bool,
    end_node: Option<NodeId>,
  ) -> bool {
    let mut current = node;
    let mut update = update_data;
    loop {
      let n = &mut self.nodes[current.0];
      let updated = n.update_counter_and_data_bounds(p, n_hits, update);
      match n.parent() {
        Some(parent) if Some(parent) != end_node => {
          current = parent;
          // An ancestor already covers `p` once a descendant's box stops growing.
          update = updated;
        }
        _ => return updated,
      }
    }
  }

  /// Closest point stored in leaf `leaf`.
  pub fn closest_point_in_leaf(&self, leaf: NodeId, points: &PointStore, p: DVec3) -> Option<ClosestPoint> {
    let mut best: Option<ClosestPoint> = None;
    for &id in self.nodes[leaf.0].point_ids() {
      let dist2 = points[id].distance_squared(p);
      if best.is_none_or(|b| dist2 < b.dist2) {
        best = Some(ClosestPoint { id, dist2 });
        if dist2 == 0.0 {
          break;
        }
      }
    }
    best
  }

  /// Id in `leaf` whose coordinate equals `p` exactly.
  pub fn find_duplicate_in_leaf(&self, leaf: NodeId, points: &PointStore, p: DVec3) -> Option<PointId> {
    let node = &self.nodes[leaf.0];
    if !node.contains_point_by_data(p) {
      return None;
    }
    node.point_ids().iter().copied().find(|&id| points[id] == p)
  }

  /// Closest point no further than `sqrt(radius2)` from `p`, searching every
  /// leaf except `mask`.
  ///
  /// Subtrees are pruned by the distance from `p` to their data bounds, and
  /// the pruning radius shrinks to the best distance found so far.
  pub fn closest_point_in_sphere(
    &self,
    points: &PointStore,
    p: DVec3,
    radius2: f64,
    mask: Option<NodeId>,
  ) -> Option<ClosestPoint> {
    let root = self.root();
    if mask == Some(root) || self.nodes[root.0].number_of_points() == 0 {
      return None;
    }

    let mut best: Option<ClosestPoint> = None;
    let mut ref_dist2 = radius2;
    let mut stack: SmallVec<[NodeId; 64]> = SmallVec::new();
    stack.push(root);

    while let Some(id) = stack.pop() {
      match self.nodes[id.0].content() {
        NodeContent::Internal(children) => {
          for &child in children {
            let node = &self.nodes[child.0];
            if Some(child) == mask || node.number_of_points() == 0 {
              continue;
            }
            if node.data_bounds().distance_squared_to_point(p) <= ref_dist2 {
              stack.push(child);
            }
          }
        }
        NodeContent::Leaf(_) => {
          if let Some(found) = self.closest_point_in_leaf(id, points, p) {
            if found.dist2 <= ref_dist2 && best.is_none_or(|b| found.dist2 < b.dist2) {
              ref_dist2 = found.dist2;
              best = Some(found);
              if found.dist2 == 0.0 {
                break;
              }
            }
          }
        }
      }
    }
    best
  }

  pub fn stats(&self) -> OctreeStats {
    let mut stats = OctreeStats {
      nodes: self.nodes.len(),
      points: self.nodes[0].number_of_points(),
      ..OctreeStats::default()
    };
    for node in &self.nodes {
      stats.max_depth = stats.max_depth.max(node.depth());
      if node.is_leaf() {
        stats.leaves += 1;
        stats.largest_leaf = stats.largest_leaf.max(node.point_ids().len());
        stats.overflowed_leaves += node.overflowed as usize;
      }
    }
    stats
  }

  /// Store the coordinate according to `mode` and return its id.
  fn record(points: &mut PointStore, new_pnt: DVec3, pnt_id: PointId, mode: InsertMode) -> PointId {
    match mode {
      InsertMode::IndexOnly => pnt_id,
      InsertMode::SetAt => {
        points.append_at(pnt_id, new_pnt);
        pnt_id
      }
      InsertMode::Append => points.append(new_pnt),
    }
  }

  fn append_to_leaf(
    &mut self,
    leaf: NodeId,
    points: &mut PointStore,
    new_pnt: DVec3,
    pnt_id: PointId,
    mode: InsertMode,
  ) -> PointId {
    let id = Self::record(points, new_pnt, pnt_id, mode);
    if let NodeContent::Leaf(ids) = self.nodes[leaf.0].content_mut() {
      ids.push(id);
    }
    self.update_counter_and_data_bounds_recursively(leaf, new_pnt, 1, true, None);
    id
  }

  fn take_ids(&mut self, leaf: NodeId) -> Vec<PointId> {
    match self.nodes[leaf.0].content_mut() {
      NodeContent::Leaf(ids) => std::mem::take(ids),
      NodeContent::Internal(_) => Vec::new(),
    }
  }

  fn note_overflow(&mut self, leaf: NodeId) {
    let node = &mut self.nodes[leaf.0];
    if !node.overflowed {
      node.overflowed = true;
      #[cfg(feature = "tracing")]
      tracing::warn!(
        depth = node.depth(),
        points = node.point_ids().len(),
        "octree leaf at max depth exceeds its capacity"
      );
    }
  }

  /// Turn leaf `node` into an internal node with eight empty leaf children.
  fn subdivide(&mut self, node: NodeId) -> [NodeId; 8] {
    let parent = &self.nodes[node.0];
    let bounds = parent.bounds();
    let depth = parent.depth() + 1;
    let mid = bounds.center();
    let corners = [bounds.min, mid, bounds.max];

    let first = self.nodes.len();
    let children: [NodeId; 8] = std::array::from_fn(|i| NodeId(first + i));
    for i in 0..8 {
      let lo = |axis: usize| corners[(i >> axis) & 1][axis];
      let hi = |axis: usize| corners[((i >> axis) & 1) + 1][axis];
      let mut child = OctreeNode::new(Some(node), depth);
      child.set_bounds(lo(0), hi(0), lo(1), hi(1), lo(2), hi(2));
      self.nodes.push(child);
    }
    *self.nodes[node.0].content_mut() = NodeContent::Internal(children);
    children
  }

  /// Split a full leaf whose ids were moved into `ids`, then place `new_pnt`.
  #[allow(clippy::too_many_arguments)]
  fn create_child_nodes(
    &mut self,
    node: NodeId,
    ids: Vec<PointId>,
    points: &mut PointStore,
    new_pnt: DVec3,
    max_pts: usize,
    pnt_id: PointId,
    mode: InsertMode,
  ) -> PointId {
    if self.nodes[node.0].depth() >= self.max_depth {
      *self.nodes[node.0].content_mut() = NodeContent::Leaf(ids);
      self.note_overflow(node);
      return self.append_to_leaf(node, points, new_pnt, pnt_id, mode);
    }

    let sample = points[ids[0]];
    if self.nodes[node.0].contains_duplicate_points_only(sample) {
      return self.separate_exactly_duplicate_points(node, ids, points, new_pnt, max_pts, pnt_id, mode);
    }

    let children = self.subdivide(node);
    let mut counts = [0usize; 8];
    for &id in &ids {
      let p = points[id];
      let target = self.child_index(node, p);
      let child = &mut self.nodes[children[target].0];
      if let NodeContent::Leaf(list) = child.content_mut() {
        list.push(id);
      }
      child.update_counter_and_data_bounds(p, 1, true);
      counts[target] += 1;
    }

    let target = self.child_index(node, new_pnt);
    if counts[target] >= max_pts {
      // Everything landed in the octant the new point needs: split it too.
      let child_ids = self.take_ids(children[target]);
      self.create_child_nodes(children[target], child_ids, points, new_pnt, max_pts, pnt_id, mode)
    } else {
      self.append_to_leaf(children[target], points, new_pnt, pnt_id, mode)
    }
  }

  /// Bisect until the duplicate cluster in `node` and `new_pnt` fall into
  /// different octants.
  #[allow(clippy::too_many_arguments)]
  fn separate_exactly_duplicate_points(
    &mut self,
    node: NodeId,
    ids: Vec<PointId>,
    points: &mut PointStore,
    new_pnt: DVec3,
    max_pts: usize,
    pnt_id: PointId,
    mode: InsertMode,
  ) -> PointId {
    let dup_pnt = points[ids[0]];
    let n_dups = ids.len();
    let mut current = node;

    let (duplic, single) = loop {
      let children = self.subdivide(current);
      let duplic = children[self.child_index(current, dup_pnt)];
      let single = children[self.child_index(current, new_pnt)];
      if duplic != single {
        break (duplic, single);
      }
      if self.nodes[duplic.0].depth() >= self.max_depth {
        // Bisection cannot go further: keep both in the deepest octant.
        *self.nodes[duplic.0].content_mut() = NodeContent::Leaf(ids);
        self.update_counter_and_data_bounds_recursively(duplic, dup_pnt, n_dups, true, Some(node));
        if n_dups >= max_pts {
          self.note_overflow(duplic);
        }
        return self.append_to_leaf(duplic, points, new_pnt, pnt_id, mode);
      }
      current = duplic;
    };

    let id = self.append_to_leaf(single, points, new_pnt, pnt_id, mode);
    *self.nodes[duplic.0].content_mut() = NodeContent::Leaf(ids);
    self.update_counter_and_data_bounds_recursively(duplic, dup_pnt, n_dups, true, Some(node));
    id
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
