use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
pub struct DegreeCelsius(pub f64);

impl DegreeCelsius {
    /// Rounds to whole degrees, halfway cases away from zero
    pub fn rounded(self) -> Self {
        DegreeCelsius(self.0.round())
    }

    pub fn clamp(self, min: DegreeCelsius, max: DegreeCelsius) -> Self {
        DegreeCelsius(self.0.clamp(min.0, max.0))
    }

    /// Tolerant comparison for values that went through float arithmetic or a device round trip
    pub fn is_close_to(&self, other: &DegreeCelsius) -> bool {
        const REL_TOLERANCE: f64 = 1e-9;
        const ABS_TOLERANCE: f64 = 1e-6;

        let diff = (self.0 - other.0).abs();
        diff <= ABS_TOLERANCE || diff <= REL_TOLERANCE * self.0.abs().max(other.0.abs())
    }
}

impl From<f64> for DegreeCelsius {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<DegreeCelsius> for f64 {
    fn from(value: DegreeCelsius) -> Self {
        value.0
    }
}

impl Display for DegreeCelsius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

impl std::ops::Add for DegreeCelsius {
    type Output = DegreeCelsius;

    fn add(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 + rhs.0)
    }
}

impl std::ops::Sub for DegreeCelsius {
    type Output = DegreeCelsius;

    fn sub(self, rhs: Self) -> Self::Output {
        DegreeCelsius(self.0 - rhs.0)
    }
}
