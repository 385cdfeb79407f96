use glam::DVec3;

use super::*;
use crate::test_support::random_cloud;

const KINDS: [LocatorKind; 2] = [LocatorKind::Grid, LocatorKind::Octree];

#[test]
fn test_duplicates_map_together() {
  let store = PointStore::from(vec![
    DVec3::ZERO,
    DVec3::ONE,
    DVec3::new(1e-5, 0.0, 0.0),
    DVec3::splat(0.5),
    DVec3::new(1.0, 1.0, 1.0 - 1e-5),
  ]);
  for kind in KINDS {
    let merged = merge_points(&store, &MergeConfig::absolute(kind, 1e-3)).unwrap();
    assert_eq!(merged.point_map, vec![0, 1, 0, 2, 1], "{kind:?}");
    assert_eq!(merged.points.count(), 3);
    assert_eq!(merged.merged_count(), 2);
    assert_eq!(merged.points[2], DVec3::splat(0.5));
  }
}

#[test]
fn test_relative_tolerance_scales_with_diagonal() {
  // Diagonal 100 * sqrt(3) ~ 173; 1e-3 of it merges points 0.1 apart.
  let store = PointStore::from(vec![
    DVec3::ZERO,
    DVec3::splat(100.0),
    DVec3::new(50.0, 50.0, 50.0),
    DVec3::new(50.1, 50.0, 50.0),
  ]);
  let config = MergeConfig::relative(LocatorKind::Octree, 1e-3);
  assert!((config.effective_tolerance(10.0) - 0.01).abs() < 1e-12);

  let merged = merge_points(&store, &config).unwrap();
  assert_eq!(merged.point_map, vec![0, 1, 2, 2]);

  let absolute = merge_points(&store, &MergeConfig::absolute(LocatorKind::Octree, 1e-3)).unwrap();
  assert_eq!(absolute.points.count(), 4);
}

#[test]
fn test_empty_dataset() {
  let merged = merge_points(&PointStore::new(), &MergeConfig::default()).unwrap();
  assert!(merged.points.is_empty());
  assert!(merged.point_map.is_empty());
}

/// Merged output is free of pairs closer than the tolerance, and every input
/// point lies within tolerance of its representative.
#[test]
fn test_merge_output_properties() {
  let tol = 0.02;
  let mut cloud = random_cloud(9, 300, 0.0, 1.0);
  let copies: Vec<DVec3> = cloud.iter().take(100).map(|p| *p + DVec3::splat(0.001)).collect();
  cloud.extend(copies);
  let store = PointStore::from(cloud.clone());

  for kind in KINDS {
    let merged = merge_points(&store, &MergeConfig::absolute(kind, tol)).unwrap();
    assert_eq!(merged.point_map.len(), cloud.len());
    for (input, &out) in merged.point_map.iter().enumerate() {
      assert!(cloud[input].distance(merged.points[out]) <= tol, "{kind:?}");
    }
    let out = merged.points.as_slice();
    for i in 0..out.len() {
      for j in (i + 1)..out.len() {
        assert!(out[i].distance(out[j]) > tol, "{kind:?}: {i} and {j} should have merged");
      }
    }
    assert!(merged.merged_count() >= 90);
  }
}

#[test]
fn test_both_strategies_agree() {
  let mut cloud = random_cloud(3, 200, -1.0, 1.0);
  cloud.extend(cloud.clone());
  let store = PointStore::from(cloud);
  let grid = merge_points(&store, &MergeConfig::absolute(LocatorKind::Grid, 0.0)).unwrap();
  let octree = merge_points(&store, &MergeConfig::absolute(LocatorKind::Octree, 0.0)).unwrap();
  assert_eq!(grid.point_map, octree.point_map);
  assert_eq!(grid.points.count(), 200);
}
