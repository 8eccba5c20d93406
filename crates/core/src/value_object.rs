//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A rate expressed in basis points (1/100 of a percent; `10_000` = 100%).
///
/// Fees, discounts and taxes are all expressed this way so money math stays
/// in integers and results are reproducible bit for bit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl ValueObject for BasisPoints {}

impl BasisPoints {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(10_000);

    pub const fn new(bps: u32) -> Self {
        Self(bps)
    }

    /// Build from a whole percentage (e.g. `10` → 10%).
    pub const fn from_percent(percent: u32) -> Self {
        Self(percent.saturating_mul(100))
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Apply the rate to `amount`, rounding half-up to the nearest unit.
    pub fn apply_to(self, amount: u64) -> u64 {
        let scaled = u128::from(amount) * u128::from(self.0) + 5_000;
        u64::try_from(scaled / 10_000).unwrap_or(u64::MAX)
    }
}

impl core::fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}
