//! Uniform bucket grid over a [`PointStore`].

use std::collections::HashMap;

use glam::DVec3;

use super::neighbors::{overlapping, shell, Ijk, IjkBox};
use super::GridConfig;
use crate::bounds::Bounds;
use crate::constants::DEFAULT_DIVISIONS;
use crate::error::LocatorError;
use crate::locator::{LocatorKind, SpatialPointIndex};
use crate::point_store::{Dataset, PointStore};
use crate::types::{ClosestPoint, PointId};

/// Occupancy summary of a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridStats {
  /// Total buckets in the grid, occupied or not.
  pub buckets: usize,
  /// Buckets holding at least one id.
  pub occupied: usize,
  /// Largest bucket.
  pub max_occupancy: usize,
  /// Mean ids per occupied bucket.
  pub mean_occupancy: f64,
  /// Ids across all buckets.
  pub points: usize,
}

/// Spatial hash over a fixed-resolution grid of buckets.
///
/// A point lands in bucket `floor((p - min) / width)`, clamped per axis to
/// `[0, divisions - 1]`, so points on a shared face belong to the upper
/// bucket and points outside the bounds land in the border buckets.
#[derive(Clone, Debug)]
pub struct GridPointIndex {
  config: GridConfig,
  points: PointStore,
  bounds: Bounds,
  divisions: [usize; 3],
  /// Bucket width per axis.
  h: DVec3,
  inv_h: DVec3,
  buckets: HashMap<usize, Vec<PointId>>,
  insertion_tol2: f64,
  /// Shells `is_inserted_point` must visit to honour the tolerance.
  insertion_level: usize,
  initialized: bool,
}

impl Default for GridPointIndex {
  fn default() -> Self {
    Self::new(GridConfig::default())
  }
}

impl GridPointIndex {
  pub fn new(config: GridConfig) -> Self {
    let insertion_tol2 = config.tolerance * config.tolerance;
    Self {
      config,
      points: PointStore::new(),
      bounds: Bounds::UNINITIALIZED,
      divisions: DEFAULT_DIVISIONS,
      h: DVec3::ZERO,
      inv_h: DVec3::ZERO,
      buckets: HashMap::new(),
      insertion_tol2,
      insertion_level: 0,
      initialized: false,
    }
  }

  #[inline]
  pub fn config(&self) -> &GridConfig {
    &self.config
  }

  #[inline]
  pub fn bounds(&self) -> Bounds {
    self.bounds
  }

  #[inline]
  pub fn divisions(&self) -> [usize; 3] {
    self.divisions
  }

  #[inline]
  pub fn bucket_width(&self) -> DVec3 {
    self.h
  }

  #[inline]
  pub fn number_of_buckets(&self) -> usize {
    self.divisions.iter().product()
  }

  #[inline]
  pub fn insertion_level(&self) -> usize {
    self.insertion_level
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Bucket coordinates of `p`, clamped into the grid.
  pub fn bucket_indices(&self, p: DVec3) -> Ijk {
    let f = ((p - self.bounds.min) * self.inv_h).floor();
    // `as usize` saturates: negatives and NaN land in bucket 0.
    [
      (f.x as usize).min(self.divisions[0] - 1),
      (f.y as usize).min(self.divisions[1] - 1),
      (f.z as usize).min(self.divisions[2] - 1),
    ]
  }

  /// Flattened bucket id of `p`.
  #[inline]
  pub fn bucket_index(&self, p: DVec3) -> usize {
    self.flatten(self.bucket_indices(p))
  }

  pub fn stats(&self) -> GridStats {
    let occupied = self.buckets.len();
    let points: usize = self.buckets.values().map(Vec::len).sum();
    GridStats {
      buckets: if self.initialized { self.number_of_buckets() } else { 0 },
      occupied,
      max_occupancy: self.buckets.values().map(Vec::len).max().unwrap_or(0),
      mean_occupancy: if occupied == 0 { 0.0 } else { points as f64 / occupied as f64 },
      points,
    }
  }

  #[inline]
  fn flatten(&self, ijk: Ijk) -> usize {
    ijk[0] + ijk[1] * self.divisions[0] + ijk[2] * self.divisions[0] * self.divisions[1]
  }

  fn bucket(&self, ijk: Ijk) -> &[PointId] {
    self
      .buckets
      .get(&self.flatten(ijk))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// Squared distance from `x` to the region whose points hash to bucket
  /// `ijk`. Border buckets also hold points clamped in from outside the
  /// bounds, so their region is open towards the outside.
  fn distance2_to_bucket(&self, x: DVec3, ijk: Ijk) -> f64 {
    let lo = DVec3::new(ijk[0] as f64, ijk[1] as f64, ijk[2] as f64);
    let mut min = self.bounds.min + lo * self.h;
    let mut max = min + self.h;
    for a in 0..3 {
      if ijk[a] == 0 {
        min[a] = f64::NEG_INFINITY;
      }
      if ijk[a] + 1 == self.divisions[a] {
        max[a] = f64::INFINITY;
      }
    }
    Bounds::new(min, max).distance_squared_to_point(x)
  }

  /// Buckets overlapping the cube `x ± dist`.
  fn bucket_range(&self, x: DVec3, dist: f64) -> IjkBox {
    IjkBox {
      min: self.bucket_indices(x - DVec3::splat(dist)),
      max: self.bucket_indices(x + DVec3::splat(dist)),
    }
  }

  /// Closest id over the given buckets, starting from `best`.
  fn scan<'a>(
    &self,
    x: DVec3,
    ids: impl IntoIterator<Item = &'a PointId>,
    best: &mut Option<ClosestPoint>,
    min_dist2: &mut f64,
  ) {
    for &id in ids {
      let d2 = self.points[id].distance_squared(x);
      if d2 < *min_dist2 {
        *min_dist2 = d2;
        *best = Some(ClosestPoint { id, dist2: d2 });
      }
    }
  }

  /// Resolution, widths and tolerance level for `bounds` sized for
  /// `target_points` (0 means use the configured divisions).
  fn configure(&mut self, bounds: Bounds, target_points: usize) {
    let (divisions, bounds) = if self.config.automatic && target_points > 0 {
      let bins = target_points.div_ceil(self.config.points_per_bucket.max(1));
      bounds.compute_divisions(bins)
    } else {
      (self.config.divisions.map(|d| d.max(1)), bounds.min_inflate())
    };

    self.bounds = bounds;
    self.divisions = divisions;
    self.h = bounds.lengths() / DVec3::new(divisions[0] as f64, divisions[1] as f64, divisions[2] as f64);
    self.inv_h = self.h.recip();
    self.buckets.clear();

    self.insertion_tol2 = self.config.tolerance * self.config.tolerance;
    let hmin = self.h.min_element();
    let max_divs = divisions.into_iter().max().unwrap_or(1);
    let level = (self.config.tolerance / hmin).ceil();
    self.insertion_level = if level.is_finite() && level >= 0.0 {
      (level as usize).min(max_divs)
    } else {
      max_divs
    };
    self.initialized = true;
  }

  fn hash_point(&mut self, id: PointId, x: DVec3) {
    let key = self.bucket_index(x);
    self.buckets.entry(key).or_default().push(id);
  }

  fn ensure_initialized(&self) -> Result<(), LocatorError> {
    if self.initialized {
      Ok(())
    } else {
      #[cfg(feature = "tracing")]
      tracing::error!("grid locator used for insertion before initialization");
      Err(LocatorError::NotInitialized)
    }
  }
}

impl SpatialPointIndex for GridPointIndex {
  fn kind(&self) -> LocatorKind {
    LocatorKind::Grid
  }

  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "grid::build_locator"))]
  fn build_locator(&mut self, dataset: &dyn Dataset) -> Result<(), LocatorError> {
    let n = dataset.point_count();
    if n == 0 {
      #[cfg(feature = "tracing")]
      tracing::error!("cannot build a grid locator over an empty dataset");
      return Err(LocatorError::EmptyDataset);
    }

    self.points = dataset.points().clone();
    self.configure(dataset.bounds(), n);
    for id in 0..self.points.count() {
      let p = self.points[id];
      self.hash_point(id, p);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
      points = n,
      divisions = ?self.divisions,
      occupied = self.buckets.len(),
      "grid built"
    );
    Ok(())
  }

  fn init_point_insertion(
    &mut self,
    mut points: PointStore,
    bounds: &[f64],
    est_num_pts: usize,
  ) -> Result<(), LocatorError> {
    let bounds = Bounds::from_slice(bounds).inspect_err(|_err| {
      #[cfg(feature = "tracing")]
      tracing::error!(error = %_err, "rejected grid insertion bounds");
    })?;

    self.free_search_structure();
    points.reset();
    self.points = points;
    self.configure(bounds, est_num_pts);
    Ok(())
  }

  fn insert_point(&mut self, id: PointId, x: DVec3) -> Result<(), LocatorError> {
    self.ensure_initialized()?;
    self.hash_point(id, x);
    self.points.append_at(id, x);
    Ok(())
  }

  fn insert_next_point(&mut self, x: DVec3) -> Result<PointId, LocatorError> {
    self.ensure_initialized()?;
    let id = self.points.append(x);
    self.hash_point(id, x);
    Ok(id)
  }

  fn is_inserted_point(&self, x: DVec3) -> Option<PointId> {
    if !self.initialized {
      return None;
    }
    let ijk = self.bucket_indices(x);
    for level in 0..=self.insertion_level {
      for nei in shell(ijk, self.divisions, level) {
        for &id in self.bucket(nei) {
          if self.points[id].distance_squared(x) <= self.insertion_tol2 {
            return Some(id);
          }
        }
      }
    }
    None
  }

  /// Closest point found in the first non-empty shell around `x`.
  ///
  /// This is not guaranteed to be the global nearest: a point in the next
  /// shell can be closer than the best one in the current shell. Use
  /// [`find_closest_point_within_radius`](SpatialPointIndex::find_closest_point_within_radius)
  /// when exactness matters.
  fn find_closest_point(&self, x: DVec3) -> Option<PointId> {
    if !self.initialized {
      return None;
    }
    let ijk = self.bucket_indices(x);
    let max_level = self.divisions.into_iter().max().unwrap_or(1);
    let mut best = None;
    let mut min_dist2 = f64::MAX;
    for level in 0..max_level {
      for nei in shell(ijk, self.divisions, level) {
        self.scan(x, self.bucket(nei), &mut best, &mut min_dist2);
      }
      if best.is_some() {
        break;
      }
    }
    best.map(|b| b.id)
  }

  fn find_closest_point_within_radius(
    &self,
    radius: f64,
    x: DVec3,
    input_data_length: f64,
  ) -> Option<ClosestPoint> {
    if !self.initialized {
      return None;
    }
    let radius2 = radius * radius;
    // Slightly larger start so a point right on the radius is still picked
    // up by the scan; the final check below is exact.
    let mut min_dist2 = 1.01 * radius2;
    let mut best = None;

    let ijk = self.bucket_indices(x);
    self.scan(x, self.bucket(ijk), &mut best, &mut min_dist2);

    let (mut refined, mut refined2) = if min_dist2 < radius2 {
      (min_dist2.sqrt(), min_dist2)
    } else {
      (radius, radius2)
    };

    if input_data_length != 0.0 {
      let max_distance = self.bounds.distance_squared_to_point(x).sqrt() + input_data_length;
      if refined > max_distance {
        refined = max_distance;
        refined2 = max_distance * max_distance;
      }
    }

    let mut radius_level = 0;
    for a in 0..3 {
      let level = (refined / self.h[a]).floor();
      let level = if level >= 0.0 { level as usize } else { 0 };
      radius_level = radius_level.max(level.min(self.divisions[a] / 2));
    }
    let mut ii = radius_level.max(1);

    let mut visited = IjkBox::single(ijk);
    while ii >= 1 {
      let current = refined;
      let range = self.bucket_range(x, refined / ii as f64);
      for nei in overlapping(range, &mut visited) {
        if self.distance2_to_bucket(x, nei) >= refined2 {
          continue;
        }
        for &id in self.bucket(nei) {
          let d2 = self.points[id].distance_squared(x);
          if d2 < min_dist2 {
            min_dist2 = d2;
            best = Some(ClosestPoint { id, dist2: d2 });
            refined = d2.sqrt();
            refined2 = d2;
          }
        }
      }

      // The radius shrank: skip ring levels that now cover the same buckets.
      if refined < current && ii > 2 {
        ii = ((ii as f64 * (refined / current)).floor() as usize + 1).max(2);
      }
      ii -= 1;
    }

    best.filter(|b| b.dist2 <= radius2)
  }

  fn find_closest_inserted_point(&self, x: DVec3) -> Option<PointId> {
    if !self.initialized || !self.bounds.contains_point(x) {
      return None;
    }

    let ijk = self.bucket_indices(x);
    let max_level = self.divisions.into_iter().max().unwrap_or(1);
    let mut best = None;
    let mut min_dist2 = f64::MAX;
    let mut level = 0;
    while best.is_none() && level < max_level {
      for nei in shell(ijk, self.divisions, level) {
        self.scan(x, self.bucket(nei), &mut best, &mut min_dist2);
      }
      level += 1;
    }

    // One more shell, restricted to buckets whose near face can still win.
    for nei in shell(ijk, self.divisions, level) {
      let mut dist2 = 0.0;
      for a in 0..3 {
        if ijk[a] != nei[a] {
          let multiple = if ijk[a] > nei[a] { nei[a] + 1 } else { nei[a] };
          let diff = self.bounds.min[a] + multiple as f64 * self.h[a] - x[a];
          dist2 += diff * diff;
        }
      }
      if dist2 < min_dist2 {
        self.scan(x, self.bucket(nei), &mut best, &mut min_dist2);
      }
    }

    best.map(|b| b.id)
  }

  fn points_in_bucket(&self, x: DVec3) -> &[PointId] {
    if !self.initialized {
      return &[];
    }
    self.bucket(self.bucket_indices(x))
  }

  fn free_search_structure(&mut self) {
    self.buckets.clear();
    self.points.reset();
    self.divisions = DEFAULT_DIVISIONS;
    self.bounds = Bounds::UNINITIALIZED;
    self.h = DVec3::ZERO;
    self.inv_h = DVec3::ZERO;
    self.insertion_level = 0;
    self.initialized = false;
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
