//! Bucket enumeration around a home bucket.
//!
//! ```text
//!   level 2   . . . . .      hollow shell: every bucket whose Chebyshev
//!   level 1   . x x x .      distance to H is exactly `level`, clipped
//!   level 0   . x H x .      to the grid
//!             . x x x .
//!             . . . . .
//! ```

use smallvec::SmallVec;

/// Integer bucket coordinates.
pub type Ijk = [usize; 3];

/// Buckets visited by one query step. Shells up to level 1 fit inline.
pub type BucketList = SmallVec<[Ijk; 27]>;

/// Buckets at exactly Chebyshev distance `level` from `ijk`, clipped to
/// `[0, divs - 1]` on every axis. Level 0 is the home bucket alone.
pub fn shell(ijk: Ijk, divs: [usize; 3], level: usize) -> BucketList {
  let mut out = BucketList::new();
  if level == 0 {
    out.push(ijk);
    return out;
  }

  let lo: [usize; 3] = std::array::from_fn(|a| ijk[a].saturating_sub(level));
  let hi: [usize; 3] = std::array::from_fn(|a| (ijk[a] + level).min(divs[a].saturating_sub(1)));
  let on_face = |a: usize, v: usize| v == ijk[a] + level || (ijk[a] >= level && v == ijk[a] - level);

  for i in lo[0]..=hi[0] {
    for j in lo[1]..=hi[1] {
      for k in lo[2]..=hi[2] {
        if on_face(0, i) || on_face(1, j) || on_face(2, k) {
          out.push([i, j, k]);
        }
      }
    }
  }
  out
}

/// Inclusive bucket-coordinate box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IjkBox {
  pub min: Ijk,
  pub max: Ijk,
}

impl IjkBox {
  /// The single bucket `ijk`.
  pub fn single(ijk: Ijk) -> Self {
    Self { min: ijk, max: ijk }
  }

  #[inline]
  pub fn contains(&self, ijk: Ijk) -> bool {
    (0..3).all(|a| ijk[a] >= self.min[a] && ijk[a] <= self.max[a])
  }
}

/// Buckets inside `range` but outside `visited`, then widen `visited` to
/// `range`. Repeated calls with growing ranges visit every bucket once.
pub fn overlapping(range: IjkBox, visited: &mut IjkBox) -> BucketList {
  let mut out = BucketList::new();
  for i in range.min[0]..=range.max[0] {
    for j in range.min[1]..=range.max[1] {
      for k in range.min[2]..=range.max[2] {
        if !visited.contains([i, j, k]) {
          out.push([i, j, k]);
        }
      }
    }
  }
  *visited = range;
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_level_zero_is_home() {
    assert_eq!(shell([3, 3, 3], [8, 8, 8], 0).as_slice(), &[[3, 3, 3]]);
  }

  #[test]
  fn test_interior_shell_sizes() {
    // (2l+1)^3 - (2l-1)^3
    assert_eq!(shell([4, 4, 4], [9, 9, 9], 1).len(), 26);
    assert_eq!(shell([4, 4, 4], [9, 9, 9], 2).len(), 98);
  }

  #[test]
  fn test_shell_clipped_at_corner() {
    let s = shell([0, 0, 0], [4, 4, 4], 1);
    assert_eq!(s.len(), 7);
    assert!(!s.contains(&[0, 0, 0]));
  }

  /// Shells partition the grid: each bucket is reached at exactly one level.
  #[test]
  fn test_shells_partition_grid() {
    let divs = [5, 3, 4];
    let home = [1, 2, 0];
    let mut seen = std::collections::HashSet::new();
    for level in 0..5 {
      for ijk in shell(home, divs, level) {
        assert!(seen.insert(ijk), "{ijk:?} visited twice");
      }
    }
    assert_eq!(seen.len(), 5 * 3 * 4);
  }

  #[test]
  fn test_overlapping_skips_visited() {
    let mut visited = IjkBox::single([2, 2, 2]);
    let first = overlapping(IjkBox { min: [1, 2, 2], max: [3, 2, 2] }, &mut visited);
    assert_eq!(first.as_slice(), &[[1, 2, 2], [3, 2, 2]]);

    let second = overlapping(IjkBox { min: [0, 2, 2], max: [3, 2, 2] }, &mut visited);
    assert_eq!(second.as_slice(), &[[0, 2, 2]]);
    assert_eq!(visited.min, [0, 2, 2]);
  }
}
