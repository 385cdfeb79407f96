//! Shared fixtures for unit tests.

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `n` points uniformly spread over `[lo, hi]^3`, reproducible per seed.
pub fn random_cloud(seed: u64, n: usize, lo: f64, hi: f64) -> Vec<DVec3> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..n)
    .map(|_| {
      DVec3::new(
        rng.random_range(lo..hi),
        rng.random_range(lo..hi),
        rng.random_range(lo..hi),
      )
    })
    .collect()
}

/// Smallest squared distance from `q` to any of `points`.
pub fn brute_force_dist2(points: &[DVec3], q: DVec3) -> Option<f64> {
  points
    .iter()
    .map(|p| p.distance_squared(q))
    .min_by(|a, b| a.total_cmp(b))
}

/// Smallest squared distance among points no further than `radius`.
pub fn brute_force_within(points: &[DVec3], q: DVec3, radius: f64) -> Option<f64> {
  brute_force_dist2(points, q).filter(|d2| *d2 <= radius * radius)
}
