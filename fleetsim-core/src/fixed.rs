//! Fixed-point arithmetic for deterministic combat and economy math.
//!
//! Every tunable and every intermediate quantity in the engine is a [`Fixed`].
//! Floats only appear at the edges (test fixtures, display).

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Fixed-point value with scale 10000.
///
/// 0.25 is stored as 2500, 1.0 as 10000. Serializes as the raw integer, so a
/// config file writes `15000` for a multiplier of 1.5.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(pub i64);

impl Fixed {
    /// Scale factor: 10000 = 1.0
    pub const SCALE: i64 = 10000;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(10000);
    pub const HALF: Fixed = Fixed(5000);
    pub const TENTH: Fixed = Fixed(1000);

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Create from integer (e.g., 5 → 50_000)
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Fixed(v * Self::SCALE)
    }

    /// `num / den` without going through floats. Zero denominator yields zero.
    #[inline]
    pub const fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Fixed::ZERO;
        }
        Fixed(((num as i128 * Self::SCALE as i128) / den as i128) as i64)
    }

    /// Convert from f32 (fixtures and display only).
    ///
    /// Uses `.round()` for cross-platform determinism. Guards against NaN/Inf/overflow.
    #[inline]
    pub fn from_f32(v: f32) -> Self {
        if !v.is_finite() {
            return Fixed::ZERO;
        }
        let scaled = v * Self::SCALE as f32;
        if scaled > i64::MAX as f32 {
            return Fixed(i64::MAX);
        }
        if scaled < i64::MIN as f32 {
            return Fixed(i64::MIN);
        }
        Fixed(scaled.round() as i64)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Self::SCALE as f32
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Truncate to integer (rounds toward zero)
    #[inline]
    pub const fn to_int(self) -> i64 {
        self.0 / Self::SCALE
    }

    /// Truncate toward zero and clamp into `u32`. Negative values become 0.
    #[inline]
    pub fn floor_to_u32(self) -> u32 {
        self.to_int().clamp(0, u32::MAX as i64) as u32
    }

    #[inline]
    pub fn min(self, other: Fixed) -> Fixed {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn max(self, other: Fixed) -> Fixed {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn clamp(self, lo: Fixed, hi: Fixed) -> Fixed {
        self.max(lo).min(hi)
    }

    /// Clamp into the unit interval [0, 1].
    #[inline]
    pub fn unit(self) -> Fixed {
        self.clamp(Fixed::ZERO, Fixed::ONE)
    }

    #[inline]
    pub fn abs(self) -> Fixed {
        Fixed(self.0.abs())
    }

    #[inline]
    pub fn saturating_add(self, other: Fixed) -> Fixed {
        Fixed(self.0.saturating_add(other.0))
    }

    #[inline]
    pub fn saturating_sub(self, other: Fixed) -> Fixed {
        Fixed(self.0.saturating_sub(other.0))
    }

    /// Multiply two fixed-point values: (a × b) / SCALE
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Fixed) -> Fixed {
        self * other
    }

    /// Divide two fixed-point values: (a × SCALE) / b
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, other: Fixed) -> Fixed {
        self / other
    }

    /// Multiply by a plain integer count.
    #[inline]
    pub fn mul_int(self, n: i64) -> Fixed {
        Fixed(self.0.saturating_mul(n))
    }
}

impl From<u32> for Fixed {
    fn from(v: u32) -> Self {
        Fixed::from_int(v as i64)
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0 + other.0)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Fixed) {
        self.0 += other.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0 - other.0)
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Fixed) {
        self.0 -= other.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, other: Fixed) -> Fixed {
        Fixed((self.0 as i128 * other.0 as i128 / Fixed::SCALE as i128) as i64)
    }
}

impl MulAssign for Fixed {
    #[inline]
    fn mul_assign(&mut self, other: Fixed) {
        *self = *self * other;
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, other: Fixed) -> Fixed {
        if other.0 == 0 {
            return Fixed::ZERO;
        }
        Fixed((self.0 as i128 * Fixed::SCALE as i128 / other.0 as i128) as i64)
    }
}

impl DivAssign for Fixed {
    #[inline]
    fn div_assign(&mut self, other: Fixed) {
        *self = *self / other;
    }
}

impl std::iter::Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Fixed {
        iter.fold(Fixed::ZERO, |acc, x| acc + x)
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f32())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.to_f32())
    }
}
