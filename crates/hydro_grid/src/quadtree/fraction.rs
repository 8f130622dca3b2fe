//! Exact fractional coordinates relative to the level-0 unit square.
//!
//! Cell boundaries at every level are rationals `u / width`. Keeping them
//! reduced makes structural equality coincide with numeric equality, so
//! fractions can key hash maps directly.

use std::cmp::Ordering;

/// Reduced non-negative fraction `num / den`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Fraction {
  pub num: u32,
  pub den: u32,
}

impl Fraction {
  /// Create a reduced fraction. `den` must be non-zero.
  pub fn new(num: u32, den: u32) -> Self {
    debug_assert!(den != 0, "fraction denominator must be non-zero");
    let g = gcd(num, den).max(1);
    Self {
      num: num / g,
      den: den / g,
    }
  }

  /// Real value (for coordinates only, never for comparisons).
  #[inline]
  pub fn value(self) -> f64 {
    self.num as f64 / self.den as f64
  }
}

impl Ord for Fraction {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.num as u64 * other.den as u64).cmp(&(other.num as u64 * self.den as u64))
  }
}

impl PartialOrd for Fraction {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
  while b != 0 {
    (a, b) = (b, a % b);
  }
  a
}

/// The four boundary fractions of a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellFractions {
  pub x_min: Fraction,
  pub x_max: Fraction,
  pub y_min: Fraction,
  pub y_max: Fraction,
}
