//! Axis-aligned bounding box with double precision.
//!
//! Bounds are exchanged with callers in the flat
//! `[xmin, xmax, ymin, ymax, zmin, zmax]` layout; internally they are two
//! corners.

use glam::DVec3;

use crate::constants::ZERO_WIDTH_RATIO;
use crate::error::LocatorError;

/// Double-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl Bounds {
	/// Inverted box, ready to grow with [`expand_to_include`](Self::expand_to_include).
	pub const UNINITIALIZED: Self = Self {
		min: DVec3::INFINITY,
		max: DVec3::NEG_INFINITY,
	};

	/// Create a box from min and max corners.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		Self { min, max }
	}

	/// Create a box from `[xmin, xmax, ymin, ymax, zmin, zmax]`.
	pub fn from_array(b: [f64; 6]) -> Self {
		Self {
			min: DVec3::new(b[0], b[2], b[4]),
			max: DVec3::new(b[1], b[3], b[5]),
		}
	}

	/// Validate caller-supplied bounds.
	///
	/// The slice must hold six finite values with `min <= max` on every axis.
	pub fn from_slice(b: &[f64]) -> Result<Self, LocatorError> {
		let arr: [f64; 6] = b
			.try_into()
			.map_err(|_| LocatorError::InvalidBoundsLength(b.len()))?;
		let bounds = Self::from_array(arr);
		if !arr.iter().all(|v| v.is_finite()) || !bounds.is_valid() {
			return Err(LocatorError::InvalidBounds(arr));
		}
		Ok(bounds)
	}

	/// Flatten to `[xmin, xmax, ymin, ymax, zmin, zmax]`.
	pub fn to_array(&self) -> [f64; 6] {
		[
			self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
		]
	}

	/// Tight box around a set of points. Empty input yields
	/// [`UNINITIALIZED`](Self::UNINITIALIZED).
	pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
		let mut bounds = Self::UNINITIALIZED;
		for p in points {
			bounds.expand_to_include(p);
		}
		bounds
	}

	/// Check min <= max on all axes. NaN corners are invalid.
	#[inline]
	pub fn is_valid(&self) -> bool {
		self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
	}

	/// Grow to include a point.
	#[inline]
	pub fn expand_to_include(&mut self, p: DVec3) {
		self.min = self.min.min(p);
		self.max = self.max.max(p);
	}

	/// Side lengths (max - min).
	#[inline]
	pub fn lengths(&self) -> DVec3 {
		self.max - self.min
	}

	/// Longest side.
	#[inline]
	pub fn max_length(&self) -> f64 {
		self.lengths().max_element()
	}

	/// Length of the diagonal, `None` for an uninitialized box.
	pub fn diagonal_length(&self) -> Option<f64> {
		self.is_valid().then(|| self.lengths().length())
	}

	/// Center of the box.
	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// Closed containment test.
	#[inline]
	pub fn contains_point(&self, p: DVec3) -> bool {
		p.x >= self.min.x
			&& p.x <= self.max.x
			&& p.y >= self.min.y
			&& p.y <= self.max.y
			&& p.z >= self.min.z
			&& p.z <= self.max.z
	}

	/// Squared distance from `p` to the closest point of the box; zero inside.
	#[inline]
	pub fn distance_squared_to_point(&self, p: DVec3) -> f64 {
		let below = (self.min - p).max(DVec3::ZERO);
		let above = (p - self.max).max(DVec3::ZERO);
		(below + above).length_squared()
	}

	/// Grow every side outwards by `delta`.
	#[inline]
	pub fn inflate(&self, delta: f64) -> Self {
		Self {
			min: self.min - DVec3::splat(delta),
			max: self.max + DVec3::splat(delta),
		}
	}

	/// Give zero-width sides a non-zero extent.
	///
	/// Flat sides are pushed out by 0.5% of the largest side on each end; a
	/// box collapsed to a point grows by 0.5 in every direction.
	pub fn min_inflate(&self) -> Self {
		let lengths = self.lengths();
		let max = lengths.max_element();
		if !(max > 0.0) {
			return self.inflate(0.5);
		}

		let mut out = *self;
		let d = 0.005 * max;
		for axis in 0..3 {
			if !(lengths[axis] > 0.0) {
				out.min[axis] -= d;
				out.max[axis] += d;
			}
		}
		out
	}

	/// Split the box into roughly `total_bins` cells in proportion to its side
	/// lengths.
	///
	/// Returns the divisions per axis and the bounds the cells should tile:
	/// zero-width sides get half a cell of padding on each end, and a fully
	/// degenerate box becomes one unit cell around the point.
	pub fn compute_divisions(&self, total_bins: usize) -> ([usize; 3], Bounds) {
		let total_bins = total_bins.max(1);
		let lengths = self.lengths();
		let tot_len = lengths.x + lengths.y + lengths.z;
		let zero_tol = tot_len * ZERO_WIDTH_RATIO;

		let mut non_zero = [false; 3];
		let mut num_non_zero = 0;
		let mut max_idx = 0;
		let mut max = 0.0;
		for axis in 0..3 {
			if lengths[axis] > max {
				max_idx = axis;
				max = lengths[axis];
			}
			if lengths[axis] > zero_tol {
				non_zero[axis] = true;
				num_non_zero += 1;
			}
		}

		if num_non_zero == 0 {
			return ([1, 1, 1], self.inflate(0.5));
		}

		let mut f = total_bins as f64;
		for axis in 0..3 {
			if non_zero[axis] {
				f /= lengths[axis] / tot_len;
			}
		}
		f = f.powf(1.0 / num_non_zero as f64);

		let mut divs = [1usize; 3];
		for axis in 0..3 {
			if non_zero[axis] {
				divs[axis] = ((f * lengths[axis]) / tot_len).floor().max(1.0) as usize;
			}
		}
		clamp_divisions(total_bins, &mut divs);

		let delta = 0.5 * lengths[max_idx] / divs[max_idx] as f64;
		let mut adjusted = *self;
		for axis in 0..3 {
			if !non_zero[axis] {
				adjusted.min[axis] -= delta;
				adjusted.max[axis] += delta;
			}
		}
		(divs, adjusted)
	}
}

impl Default for Bounds {
	fn default() -> Self {
		Self::UNINITIALIZED
	}
}

/// Shrink `divs` uniformly until their product fits `target_bins`.
pub fn clamp_divisions(target_bins: usize, divs: &mut [usize; 3]) {
	for d in divs.iter_mut() {
		*d = (*d).max(1);
	}
	while divs[0] * divs[1] * divs[2] > target_bins.max(1) {
		for d in divs.iter_mut() {
			*d = if *d > 1 { *d - 1 } else { 1 };
		}
	}
}
