use glam::DVec3;
use proptest::prelude::*;

use super::*;
use crate::test_support::{brute_force_dist2, brute_force_within, random_cloud};
use crate::types::InsertOutcome;

const UNIT: [f64; 6] = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

fn fixed_grid(divisions: [usize; 3], tolerance: f64) -> GridPointIndex {
  let mut grid = GridPointIndex::new(GridConfig::fixed(divisions).with_tolerance(tolerance));
  grid
    .init_point_insertion(PointStore::new(), &UNIT, 0)
    .expect("unit bounds are valid");
  grid
}

fn filled_grid(divisions: [usize; 3], points: &[DVec3]) -> GridPointIndex {
  let mut grid = fixed_grid(divisions, 0.0);
  for &p in points {
    grid.insert_next_point(p).unwrap();
  }
  grid
}

// =========================================================================
// Setup
// =========================================================================

#[test]
fn test_init_rejects_short_bounds() {
  let mut grid = GridPointIndex::default();
  let err = grid
    .init_point_insertion(PointStore::new(), &[0.0, 1.0, 0.0, 1.0, 0.0], 0)
    .unwrap_err();
  assert_eq!(err, LocatorError::InvalidBoundsLength(5));
  assert!(!grid.is_initialized());
}

#[test]
fn test_init_rejects_inverted_bounds() {
  let mut grid = GridPointIndex::default();
  let bad = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
  assert_eq!(
    grid.init_point_insertion(PointStore::new(), &bad, 0),
    Err(LocatorError::InvalidBounds(bad))
  );
}

#[test]
fn test_insert_before_init_fails() {
  let mut grid = GridPointIndex::default();
  assert_eq!(grid.insert_next_point(DVec3::ZERO), Err(LocatorError::NotInitialized));
  assert_eq!(grid.insert_unique_point(DVec3::ZERO), Err(LocatorError::NotInitialized));
  assert_eq!(grid.is_inserted_point(DVec3::ZERO), None);
  assert!(grid.points_in_bucket(DVec3::ZERO).is_empty());
}

/// Init clears whatever the handed-in store held.
#[test]
fn test_init_resets_store() {
  let mut grid = GridPointIndex::new(GridConfig::fixed([2, 2, 2]));
  let store = PointStore::from(vec![DVec3::ONE; 4]);
  grid.init_point_insertion(store, &UNIT, 0).unwrap();
  assert_eq!(grid.points().count(), 0);
  assert_eq!(grid.insert_next_point(DVec3::ZERO), Ok(0));
}

#[test]
fn test_insertion_level_follows_tolerance() {
  // width 0.25, tolerance 0.3 -> two shells
  let grid = fixed_grid([4, 4, 4], 0.3);
  assert_eq!(grid.bucket_width(), DVec3::splat(0.25));
  assert_eq!(grid.insertion_level(), 2);

  // capped at the largest division count
  let grid = fixed_grid([4, 2, 1], 50.0);
  assert_eq!(grid.insertion_level(), 4);

  let grid = fixed_grid([4, 4, 4], 0.0);
  assert_eq!(grid.insertion_level(), 0);
}

#[test]
fn test_automatic_divisions_from_estimate() {
  let mut grid = GridPointIndex::default();
  grid.init_point_insertion(PointStore::new(), &UNIT, 300).unwrap();
  let divs = grid.divisions();
  assert_eq!(divs[0], divs[1]);
  assert_eq!(divs[1], divs[2]);
  assert!(grid.number_of_buckets() <= 100);

  // Without an estimate the configured divisions apply.
  grid.init_point_insertion(PointStore::new(), &UNIT, 0).unwrap();
  assert_eq!(grid.divisions(), DEFAULT_DIVISIONS);
}

// =========================================================================
// Insertion and merging
// =========================================================================

/// Bounds [0,1]^3, 2×2×2 buckets, tolerance 1e-6: a point 1e-9 away from a
/// stored one merges into it.
#[test]
fn test_scenario_grid_merge() {
  let mut grid = fixed_grid([2, 2, 2], 1e-6);
  let first = grid.insert_unique_point(DVec3::ZERO).unwrap();
  assert_eq!(first, InsertOutcome::inserted(0));

  let second = grid.insert_unique_point(DVec3::new(1e-9, 0.0, 0.0)).unwrap();
  assert_eq!(second, InsertOutcome::existing(first.id));
  assert_eq!(grid.points().count(), 1);
}

#[test]
fn test_unique_insert_is_idempotent_and_round_trips() {
  let mut grid = fixed_grid([8, 8, 8], 0.01);
  let p = DVec3::new(0.3, 0.6, 0.9);
  let a = grid.insert_unique_point(p).unwrap();
  let before = grid.points_in_bucket(p).len();
  let b = grid.insert_unique_point(p + DVec3::splat(0.001)).unwrap();

  assert!(a.inserted);
  assert!(!b.inserted);
  assert_eq!(a.id, b.id);
  assert_eq!(grid.points_in_bucket(p).len(), before);
  assert_eq!(grid.is_inserted_point(p), Some(a.id));
}

/// Points straddling a bucket face still merge through the neighbour shell.
#[test]
fn test_merge_across_bucket_face() {
  let mut grid = fixed_grid([2, 2, 2], 1e-3);
  let below = DVec3::new(0.4999999, 0.2, 0.2);
  let above = DVec3::new(0.5000001, 0.2, 0.2);
  assert_ne!(grid.bucket_index(below), grid.bucket_index(above));

  let a = grid.insert_unique_point(below).unwrap();
  let b = grid.insert_unique_point(above).unwrap();
  assert_eq!(a.id, b.id);
  assert!(!b.inserted);
}

#[test]
fn test_distinct_points_get_distinct_ids() {
  let mut grid = fixed_grid([4, 4, 4], 1e-3);
  let a = grid.insert_unique_point(DVec3::splat(0.1)).unwrap();
  let b = grid.insert_unique_point(DVec3::splat(0.2)).unwrap();
  assert!(a.inserted && b.inserted);
  assert_ne!(a.id, b.id);
}

#[test]
fn test_insert_point_explicit_id() {
  let mut grid = fixed_grid([2, 2, 2], 1e-3);
  grid.insert_point(5, DVec3::splat(0.75)).unwrap();
  assert_eq!(grid.points().count(), 6);
  assert_eq!(grid.points_in_bucket(DVec3::splat(0.9)), &[5]);
  assert_eq!(grid.is_inserted_point(DVec3::splat(0.75)), Some(5));
}

/// A point exactly on a shared face belongs to the upper bucket only.
#[test]
fn test_boundary_point_counted_once() {
  let mut grid = fixed_grid([2, 2, 2], 0.0);
  let on_face = DVec3::new(0.5, 0.25, 0.25);
  let id = grid.insert_next_point(on_face).unwrap();

  assert_eq!(grid.bucket_indices(on_face), [1, 0, 0]);
  assert_eq!(grid.points_in_bucket(DVec3::new(0.75, 0.25, 0.25)), &[id]);
  assert!(grid.points_in_bucket(DVec3::new(0.25, 0.25, 0.25)).is_empty());
  assert_eq!(grid.stats().points, 1);
  assert_eq!(grid.stats().occupied, 1);
}

#[test]
fn test_outside_points_clamp_to_border() {
  let grid = fixed_grid([4, 4, 4], 0.0);
  assert_eq!(grid.bucket_indices(DVec3::splat(-3.0)), [0, 0, 0]);
  assert_eq!(grid.bucket_indices(DVec3::splat(7.0)), [3, 3, 3]);
  assert_eq!(grid.bucket_indices(DVec3::ONE), [3, 3, 3]);
}

// =========================================================================
// Bulk build
// =========================================================================

#[test]
fn test_build_hashes_every_point_once() {
  let cloud = random_cloud(11, 1000, -2.0, 3.0);
  let store = PointStore::from(cloud.clone());
  let mut grid = GridPointIndex::default();
  grid.build_locator(&store).unwrap();

  assert!(grid.number_of_buckets() <= 1000usize.div_ceil(3));
  let stats = grid.stats();
  assert_eq!(stats.points, 1000);
  assert!(stats.max_occupancy >= 1);

  for (id, p) in cloud.iter().enumerate() {
    let hits = grid.points_in_bucket(*p).iter().filter(|&&i| i == id).count();
    assert_eq!(hits, 1, "point {id} must sit in its own bucket");
  }
}

#[test]
fn test_build_rejects_empty_dataset() {
  let mut grid = GridPointIndex::default();
  assert_eq!(grid.build_locator(&PointStore::new()), Err(LocatorError::EmptyDataset));
}

/// Bulk build also prepares unique insertion on top of the loaded points.
#[test]
fn test_build_then_unique_insert() {
  let store = PointStore::from(vec![DVec3::ZERO, DVec3::ONE, DVec3::splat(0.5)]);
  let mut grid = GridPointIndex::default();
  grid.build_locator(&store).unwrap();

  let hit = grid.insert_unique_point(DVec3::splat(0.5)).unwrap();
  assert_eq!(hit, InsertOutcome::existing(2));
  let miss = grid.insert_unique_point(DVec3::splat(0.25)).unwrap();
  assert_eq!(miss, InsertOutcome::inserted(3));
}

/// Coplanar input still yields a usable grid.
#[test]
fn test_build_flat_dataset() {
  let store: PointStore = (0..50)
    .map(|i| DVec3::new(i as f64 * 0.1, (i % 7) as f64, 2.0))
    .collect();
  let mut grid = GridPointIndex::default();
  grid.build_locator(&store).unwrap();
  assert_eq!(grid.divisions()[2], 1);
  assert!(grid.bucket_width().z > 0.0);
  assert_eq!(grid.stats().points, 50);
}

// =========================================================================
// Queries
// =========================================================================

/// One bucket means one shell holds everything, so the heuristic is exact.
#[test]
fn test_find_closest_point_single_bucket_matches_brute_force() {
  for seed in 0..8 {
    let cloud = random_cloud(seed, 200, 0.0, 1.0);
    let grid = filled_grid([1, 1, 1], &cloud);
    for q in random_cloud(seed + 100, 20, -0.2, 1.2) {
      let id = grid.find_closest_point(q).unwrap();
      assert_eq!(cloud[id].distance_squared(q), brute_force_dist2(&cloud, q).unwrap());
    }
  }
}

#[test]
fn test_find_closest_point_finds_far_shell() {
  let grid = filled_grid([10, 10, 10], &[DVec3::splat(0.95)]);
  assert_eq!(grid.find_closest_point(DVec3::splat(0.05)), Some(0));
}

#[test]
fn test_queries_on_empty_grid() {
  let grid = fixed_grid([3, 3, 3], 0.1);
  let q = DVec3::splat(0.5);
  assert_eq!(grid.find_closest_point(q), None);
  assert_eq!(grid.find_closest_point_within_radius(10.0, q, 0.0), None);
  assert_eq!(grid.find_closest_inserted_point(q), None);
}

#[test]
fn test_within_radius_matches_brute_force() {
  for seed in 0..6 {
    let cloud = random_cloud(seed, 300, 0.0, 1.0);
    let grid = filled_grid([6, 6, 6], &cloud);
    for q in random_cloud(seed + 50, 25, -0.1, 1.1) {
      for radius in [0.01, 0.05, 0.2, 2.0] {
        let got = grid.find_closest_point_within_radius(radius, q, 0.0);
        let expected = brute_force_within(&cloud, q, radius);
        assert_eq!(got.map(|c| c.dist2), expected, "seed {seed} q {q} r {radius}");
        if let Some(c) = got {
          assert_eq!(cloud[c.id].distance_squared(q), c.dist2);
        }
      }
    }
  }
}

#[test]
fn test_within_radius_excludes_far_points() {
  let grid = filled_grid([4, 4, 4], &[DVec3::splat(0.9)]);
  assert_eq!(grid.find_closest_point_within_radius(0.1, DVec3::splat(0.1), 0.0), None);
  let hit = grid
    .find_closest_point_within_radius(2.0, DVec3::splat(0.1), 0.0)
    .unwrap();
  assert_eq!(hit.id, 0);
  assert!((hit.dist2 - 3.0 * 0.64).abs() < 1e-12);
}

/// Points stored outside the bounds live in border buckets and must still
/// be reachable from queries near them.
#[test]
fn test_within_radius_finds_points_clamped_into_border() {
  let mut grid = fixed_grid([2, 2, 2], 0.0);
  let far = grid.insert_next_point(DVec3::new(5.0, 0.1, 0.5)).unwrap();
  let below = grid.insert_next_point(DVec3::new(0.5, -3.0, 0.2)).unwrap();

  let hit = grid
    .find_closest_point_within_radius(1.0, DVec3::new(5.0, 0.9, 0.5), 0.0)
    .unwrap();
  assert_eq!(hit.id, far);
  assert!((hit.dist2 - 0.64).abs() < 1e-12);

  let hit = grid
    .find_closest_point_within_radius(0.5, DVec3::new(0.5, -3.0, 0.6), 0.0)
    .unwrap();
  assert_eq!(hit.id, below);
  assert!((hit.dist2 - 0.16).abs() < 1e-12);

  assert_eq!(
    grid.find_closest_point_within_radius(0.7, DVec3::new(5.0, 0.9, 0.5), 0.0),
    None
  );
}

/// The first non-empty shell can hold a farther point than the next one;
/// the extra shell pass must pick the closer point.
#[test]
fn test_find_closest_inserted_point_checks_next_shell() {
  let grid = filled_grid(
    [10, 10, 10],
    &[DVec3::new(0.01, 0.41, 0.41), DVec3::new(0.31, 0.55, 0.55)],
  );
  let q = DVec3::new(0.19, 0.55, 0.55);
  // Shell 1 around the query holds only point 0.
  assert_eq!(grid.find_closest_point(q), Some(0));
  assert_eq!(grid.find_closest_inserted_point(q), Some(1));
}

#[test]
fn test_find_closest_inserted_point() {
  let cloud = random_cloud(3, 150, 0.0, 1.0);
  let grid = filled_grid([5, 5, 5], &cloud);

  assert_eq!(grid.find_closest_inserted_point(DVec3::splat(1.5)), None);
  assert_eq!(grid.find_closest_inserted_point(DVec3::new(0.5, -0.01, 0.5)), None);

  let q = cloud[17];
  let id = grid.find_closest_inserted_point(q).unwrap();
  assert_eq!(cloud[id].distance_squared(q), 0.0);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_free_search_structure() {
  let mut grid = filled_grid([2, 2, 2], &[DVec3::splat(0.3)]);
  grid.free_search_structure();
  assert_eq!(grid.divisions(), DEFAULT_DIVISIONS);
  assert!(!grid.bounds().is_valid());
  assert_eq!(grid.points().count(), 0);
  assert_eq!(grid.stats(), GridStats::default());
  assert_eq!(grid.is_inserted_point(DVec3::splat(0.3)), None);
}

#[test]
fn test_take_points_hands_back_store() {
  let mut grid = filled_grid([2, 2, 2], &[DVec3::splat(0.3), DVec3::splat(0.6)]);
  let store = grid.take_points();
  assert_eq!(store.count(), 2);
  assert!(!grid.is_initialized());
}

proptest! {
  #[test]
  fn prop_within_radius_is_exact(
    pts in prop::collection::vec((0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64), 1..80),
    q in (-0.5..1.5f64, -0.5..1.5f64, -0.5..1.5f64),
    radius in 0.001..1.0f64,
  ) {
    let cloud: Vec<DVec3> = pts.into_iter().map(|(x, y, z)| DVec3::new(x, y, z)).collect();
    let q = DVec3::new(q.0, q.1, q.2);
    let grid = filled_grid([5, 3, 4], &cloud);
    let got = grid.find_closest_point_within_radius(radius, q, 0.0).map(|c| c.dist2);
    prop_assert_eq!(got, brute_force_within(&cloud, q, radius));
  }

  #[test]
  fn prop_unique_insert_round_trip(
    pts in prop::collection::vec((0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64), 1..40),
  ) {
    let mut grid = fixed_grid([7, 7, 7], 1e-4);
    for (x, y, z) in pts {
      let p = DVec3::new(x, y, z);
      let out = grid.insert_unique_point(p).unwrap();
      prop_assert_eq!(grid.is_inserted_point(p).map(|id| grid.points()[id].distance(p) <= 1e-4), Some(true));
      let again = grid.insert_unique_point(p).unwrap();
      prop_assert!(!again.inserted);
      if out.inserted {
        prop_assert_eq!(again.id, out.id);
      }
    }
  }
}
