use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// A Fixed value clamped to `[min, max]`.
/// Used for: crisis severity (0 to 1), war exhaustion (0 to 1), force morale, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedFixed {
    value: Fixed,
    min: Fixed,
    max: Fixed,
}

impl BoundedFixed {
    pub const fn new(value: Fixed, min: Fixed, max: Fixed) -> Self {
        let value = if value.raw() < min.raw() {
            min
        } else if value.raw() > max.raw() {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    pub fn get(&self) -> Fixed {
        self.value
    }

    pub fn min(&self) -> Fixed {
        self.min
    }

    pub fn max(&self) -> Fixed {
        self.max
    }

    pub fn add(&mut self, delta: Fixed) {
        self.value = (self.value + delta).clamp(self.min, self.max);
    }

    pub fn set(&mut self, value: Fixed) {
        self.value = value.clamp(self.min, self.max);
    }

    pub fn is_at_max(&self) -> bool {
        self.value == self.max
    }

    /// Ratio from 0.0 to 1.0 as Fixed.
    /// Returns 0 if max == min.
    pub fn ratio(&self) -> Fixed {
        let range = self.max - self.min;
        if range == Fixed::ZERO {
            return Fixed::ZERO;
        }
        (self.value - self.min).div(range)
    }

    /// Move toward `target` by `rate` of the remaining gap.
    ///
    /// `value = value + (target - value) * rate`
    pub fn decay_toward(&mut self, target: Fixed, rate: Fixed) {
        let delta = (target - self.value).mul(rate);
        self.value = (self.value + delta).clamp(self.min, self.max);
    }
}

pub type CrisisSeverity = BoundedFixed;
pub type WarExhaustion = BoundedFixed;
pub type Tradition = BoundedFixed;

pub const fn new_crisis_severity() -> BoundedFixed {
    BoundedFixed::new(Fixed::ZERO, Fixed::ZERO, Fixed::ONE)
}

pub const fn new_war_exhaustion() -> BoundedFixed {
    BoundedFixed::new(Fixed::ZERO, Fixed::ZERO, Fixed::ONE)
}

/// Force-level morale in [0, 1], starting at `initial`.
pub const fn new_morale(initial: Fixed) -> BoundedFixed {
    BoundedFixed::new(initial, Fixed::ZERO, Fixed::ONE)
}

pub const fn new_tradition() -> BoundedFixed {
    BoundedFixed::new(Fixed::ZERO, Fixed::ZERO, Fixed::from_int(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_fixed_clamps() {
        let mut b = BoundedFixed::new(Fixed::ZERO, Fixed::from_int(-10), Fixed::from_int(10));

        b.add(Fixed::from_int(5));
        assert_eq!(b.get(), Fixed::from_int(5));

        b.add(Fixed::from_int(10));
        assert_eq!(b.get(), Fixed::from_int(10));
        assert!(b.is_at_max());

        b.add(Fixed::from_int(-30));
        assert_eq!(b.get(), Fixed::from_int(-10));
    }

    #[test]
    fn test_constructor_clamps() {
        let b = BoundedFixed::new(Fixed::from_int(2), Fixed::ZERO, Fixed::ONE);
        assert_eq!(b.get(), Fixed::ONE);
    }

    #[test]
    fn test_crisis_severity_steps() {
        let mut severity = new_crisis_severity();
        for _ in 0..15 {
            severity.add(Fixed::TENTH);
        }
        assert_eq!(severity.get(), Fixed::ONE);

        severity.add(-Fixed::from_raw(500));
        assert_eq!(severity.get(), Fixed::from_raw(9500));
    }

    #[test]
    fn test_decay_toward() {
        let mut morale = new_morale(Fixed::from_raw(2000));
        morale.decay_toward(Fixed::ONE, Fixed::HALF);
        assert_eq!(morale.get(), Fixed::from_raw(6000));
    }

    #[test]
    fn test_ratio() {
        let t = BoundedFixed::new(Fixed::from_int(25), Fixed::ZERO, Fixed::from_int(100));
        assert_eq!(t.ratio(), Fixed::from_raw(2500));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn value_always_within_bounds(deltas in prop::collection::vec(-20_000i64..20_000, 0..50)) {
                let mut b = new_crisis_severity();
                for d in deltas {
                    b.add(Fixed::from_raw(d));
                    prop_assert!(b.get() >= Fixed::ZERO && b.get() <= Fixed::ONE);
                }
            }
        }
    }
}
