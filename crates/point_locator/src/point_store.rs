//! Id-addressed coordinate storage and the bulk-build dataset contract.

use std::cell::Cell;
use std::ops::Index;

use glam::DVec3;

use crate::bounds::Bounds;
use crate::types::PointId;

/// Growable container of 3D coordinates addressed by dense ids.
///
/// Every mutation bumps an epoch counter. [`PointStore::bounds`] caches its
/// result against that epoch, so repeated reads between mutations are free and
/// a stale cache is detected by comparison rather than by timestamps.
#[derive(Clone, Debug, Default)]
pub struct PointStore {
  points: Vec<DVec3>,
  epoch: u64,
  cached_bounds: Cell<Option<(u64, Bounds)>>,
}

impl PointStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      points: Vec::with_capacity(capacity),
      ..Self::default()
    }
  }

  /// Number of ids currently addressable.
  #[inline]
  pub fn count(&self) -> usize {
    self.points.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  #[inline]
  pub fn get(&self, id: PointId) -> Option<DVec3> {
    self.points.get(id).copied()
  }

  /// Overwrite an existing id. Returns `false` (and stores nothing) when the
  /// id was never allocated; use [`append_at`](Self::append_at) to grow.
  pub fn set(&mut self, id: PointId, p: DVec3) -> bool {
    match self.points.get_mut(id) {
      Some(slot) => {
        *slot = p;
        self.touch();
        true
      }
      None => false,
    }
  }

  /// Store `p` under the next free id and return that id.
  pub fn append(&mut self, p: DVec3) -> PointId {
    let id = self.points.len();
    self.points.push(p);
    self.touch();
    id
  }

  /// Store `p` under an explicit id, growing the store as needed.
  ///
  /// Ids skipped over by the growth are zero-filled.
  pub fn append_at(&mut self, id: PointId, p: DVec3) {
    if id >= self.points.len() {
      self.points.resize(id + 1, DVec3::ZERO);
    }
    self.points[id] = p;
    self.touch();
  }

  /// Drop every point. Ids restart at 0.
  pub fn reset(&mut self) {
    self.points.clear();
    self.touch();
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = DVec3> + '_ {
    self.points.iter().copied()
  }

  #[inline]
  pub fn as_slice(&self) -> &[DVec3] {
    &self.points
  }

  /// Monotonic modification counter.
  #[inline]
  pub fn epoch(&self) -> u64 {
    self.epoch
  }

  /// Tight bounds of all stored points, [`Bounds::UNINITIALIZED`] when empty.
  pub fn bounds(&self) -> Bounds {
    if let Some((epoch, bounds)) = self.cached_bounds.get() {
      if epoch == self.epoch {
        return bounds;
      }
    }
    let bounds = Bounds::from_points(self.iter());
    self.cached_bounds.set(Some((self.epoch, bounds)));
    bounds
  }

  #[inline]
  fn touch(&mut self) {
    self.epoch = self.epoch.wrapping_add(1);
  }
}

impl Index<PointId> for PointStore {
  type Output = DVec3;

  #[inline]
  fn index(&self, id: PointId) -> &DVec3 {
    &self.points[id]
  }
}

impl From<Vec<DVec3>> for PointStore {
  fn from(points: Vec<DVec3>) -> Self {
    Self {
      points,
      ..Self::default()
    }
  }
}

impl FromIterator<DVec3> for PointStore {
  fn from_iter<I: IntoIterator<Item = DVec3>>(iter: I) -> Self {
    Self::from(iter.into_iter().collect::<Vec<_>>())
  }
}

/// Point-bearing input for bulk builds.
pub trait Dataset {
  /// Bounds of every point in the dataset.
  fn bounds(&self) -> Bounds;

  fn point_count(&self) -> usize;

  fn points(&self) -> &PointStore;
}

impl Dataset for PointStore {
  fn bounds(&self) -> Bounds {
    PointStore::bounds(self)
  }

  fn point_count(&self) -> usize {
    self.count()
  }

  fn points(&self) -> &PointStore {
    self
  }
}

#[cfg(test)]
#[path = "point_store_test.rs"]
mod point_store_test;
