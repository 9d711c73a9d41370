//! Fixed-precision decimal values carrying a unit label (spec §3, §4.1).
//!
//! `Quantity` is the only numeric currency that crosses a stream-store
//! boundary in this engine — raw `Decimal`/`f64` never leak out of a
//! conversion or recalc strategy. This mirrors how the teacher wraps every
//! primitive (`Price`, `Quantity`, `Tick`, ...) in a newtype rather than
//! passing bare `f64` around (see `data::domain`).

pub mod context;
pub mod convert;
pub mod units;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

pub use units::{BaseUnit, Units};

/// A decimal value with a unit label, and optionally the original string it
/// was parsed from (spec §3: "original-string preservation for idempotent
/// echo").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    pub units: Units,
    pub original_string: Option<String>,
}

impl Quantity {
    pub fn new(value: Decimal, units: Units) -> Self {
        Self {
            value,
            units,
            original_string: None,
        }
    }

    pub fn with_original(value: Decimal, units: Units, original_string: impl Into<String>) -> Self {
        Self {
            value,
            units,
            original_string: Some(original_string.into()),
        }
    }

    pub fn zero(units: Units) -> Self {
        Self::new(Decimal::ZERO, units)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Clamp negative values to zero, per spec §3/§7's non-negativity
    /// invariant. Returns whether a clamp occurred, so callers can log it.
    pub fn clamp_non_negative(&mut self) -> bool {
        if self.value.is_sign_negative() && !self.value.is_zero() {
            self.value = Decimal::ZERO;
            true
        } else {
            false
        }
    }

    /// Same-unit addition. Units must already match — conversion is the
    /// converter's job, not arithmetic's.
    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        if self.units != other.units {
            return None;
        }
        Some(Quantity::new(self.value + other.value, self.units.clone()))
    }

    pub fn checked_sub(&self, other: &Quantity) -> Option<Quantity> {
        if self.units != other.units {
            return None;
        }
        Some(Quantity::new(self.value - other.value, self.units.clone()))
    }

    /// Multiply by a dimensionless scalar (e.g. a percent rate already
    /// expressed as a fraction), preserving units.
    pub fn scale(&self, factor: Decimal) -> Quantity {
        Quantity::new(self.value * factor, self.units.clone())
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units && self.value == other.value
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        debug_assert_eq!(self.units, rhs.units, "adding quantities of mismatched units");
        Quantity::new(self.value + rhs.value, self.units)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        debug_assert_eq!(
            self.units, rhs.units,
            "subtracting quantities of mismatched units"
        );
        Quantity::new(self.value - rhs.value, self.units)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity::new(-self.value, self.units)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(mut iter: I) -> Quantity {
        let first = iter.next().unwrap_or_else(|| Quantity::zero(Units::KG));
        iter.fold(first, |acc, x| acc + x)
    }
}
