//! Axis-aligned bounding box with double precision for projected domains.

use glam::DVec2;

/// Double-precision axis-aligned bounding box.
///
/// Used for domain bounds, cell bounds and block bounds. Serialized as
/// `[min_x, min_y, max_x, max_y]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb2 {
	/// Minimum corner (inclusive).
	pub min: DVec2,
	/// Maximum corner (inclusive).
	pub max: DVec2,
}

impl DAabb2 {
	/// Inverted box that any `union` replaces.
	pub const EMPTY: Self = Self {
		min: DVec2::splat(f64::INFINITY),
		max: DVec2::splat(f64::NEG_INFINITY),
	};

	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on both axes.
	pub fn new(min: DVec2, max: DVec2) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create from `[min_x, min_y, max_x, max_y]` without validation.
	pub fn from_array(bounds: [f64; 4]) -> Self {
		Self {
			min: DVec2::new(bounds[0], bounds[1]),
			max: DVec2::new(bounds[2], bounds[3]),
		}
	}

	/// `[min_x, min_y, max_x, max_y]`.
	#[inline]
	pub fn to_array(&self) -> [f64; 4] {
		[self.min.x, self.min.y, self.max.x, self.max.y]
	}

	/// Finite and strictly positive extent on both axes.
	pub fn is_valid(&self) -> bool {
		self.min.is_finite() && self.max.is_finite() && self.min.x < self.max.x && self.min.y < self.max.y
	}

	/// Smallest box containing both.
	#[inline]
	pub fn union(&self, other: &DAabb2) -> DAabb2 {
		Self {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}

	/// Check if this AABB overlaps with another.
	///
	/// Two AABBs overlap if they share any interior or boundary points.
	#[inline]
	pub fn overlaps(&self, other: &DAabb2) -> bool {
		self.min.x <= other.max.x
			&& self.max.x >= other.min.x
			&& self.min.y <= other.max.y
			&& self.max.y >= other.min.y
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec2) -> bool {
		point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> DVec2 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> DVec2 {
		(self.min + self.max) * 0.5
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_array_roundtrip() {
		let aabb = DAabb2::from_array([1.0, 2.0, 3.0, 4.0]);
		assert_eq!(aabb.min, DVec2::new(1.0, 2.0));
		assert_eq!(aabb.to_array(), [1.0, 2.0, 3.0, 4.0]);
	}

	#[test]
	fn test_union_from_empty() {
		let a = DAabb2::from_array([0.0, 0.0, 10.0, 5.0]);
		let b = DAabb2::from_array([-5.0, 2.0, 3.0, 20.0]);
		let u = DAabb2::EMPTY.union(&a).union(&b);
		assert_eq!(u.to_array(), [-5.0, 0.0, 10.0, 20.0]);
	}

	#[test]
	fn test_empty_is_invalid() {
		assert!(!DAabb2::EMPTY.is_valid());
		assert!(!DAabb2::from_array([0.0, 0.0, 0.0, 1.0]).is_valid());
		assert!(DAabb2::from_array([0.0, 0.0, 1.0, 1.0]).is_valid());
	}

	#[test]
	fn test_overlaps_touching() {
		// Touching at boundary should count as overlapping
		let a = DAabb2::new(DVec2::ZERO, DVec2::splat(10.0));
		let b = DAabb2::new(DVec2::splat(10.0), DVec2::splat(20.0));
		assert!(a.overlaps(&b));
		assert!(b.overlaps(&a));
	}

	#[test]
	fn test_overlaps_false() {
		let a = DAabb2::new(DVec2::ZERO, DVec2::splat(10.0));
		let b = DAabb2::new(DVec2::new(11.0, 0.0), DVec2::splat(20.0));
		assert!(!a.overlaps(&b));
	}

	#[test]
	fn test_contains_point() {
		let aabb = DAabb2::new(DVec2::ZERO, DVec2::splat(10.0));
		assert!(aabb.contains_point(DVec2::splat(5.0)));
		assert!(aabb.contains_point(DVec2::splat(10.0)));
		assert!(!aabb.contains_point(DVec2::new(10.1, 5.0)));
	}

	#[test]
	fn test_size_and_center() {
		let aabb = DAabb2::from_array([-10.0, 0.0, 10.0, 40.0]);
		assert_eq!(aabb.size(), DVec2::new(20.0, 40.0));
		assert_eq!(aabb.center(), DVec2::new(0.0, 20.0));
	}
}
