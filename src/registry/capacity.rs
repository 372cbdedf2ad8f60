use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::RegistryError;

/// Per-event cap on simultaneously registered listeners
///
/// The cap is a leak-detection heuristic: an event that keeps accumulating
/// listeners is almost always a bug (a subscription made per request and
/// never removed). `Unbounded` switches the check off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CapacityRepr", into = "CapacityRepr")]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    /// Capacity used when none is given
    pub const DEFAULT: Capacity = Capacity::Bounded(10);

    /// Whether an event may hold `count` listeners under this cap
    pub fn allows(&self, count: usize) -> bool {
        match self {
            Capacity::Bounded(max) => count <= *max,
            Capacity::Unbounded => true,
        }
    }

    /// The numeric cap, or `None` when unbounded
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Capacity::Bounded(max) => Some(*max),
            Capacity::Unbounded => None,
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::DEFAULT
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(max) => write!(f, "{}", max),
            Capacity::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl From<usize> for Capacity {
    fn from(max: usize) -> Self {
        Capacity::Bounded(max)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = RegistryError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value).map(Capacity::Bounded).map_err(|_| {
            RegistryError::invalid_argument(format!(
                "max listeners must be a non-negative integer, got {}",
                value
            ))
        })
    }
}

impl TryFrom<f64> for Capacity {
    type Error = RegistryError;

    /// `f64::INFINITY` is the unbounded sentinel; anything else must be a
    /// non-negative whole number that fits in `usize`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == f64::INFINITY {
            return Ok(Capacity::Unbounded);
        }
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(RegistryError::invalid_argument(format!(
                "max listeners must be a non-negative integer or infinity, got {}",
                value
            )));
        }
        if value >= usize::MAX as f64 {
            return Err(RegistryError::invalid_argument(format!(
                "max listeners is out of range, got {}",
                value
            )));
        }
        Ok(Capacity::Bounded(value as usize))
    }
}

impl FromStr for Capacity {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "unbounded" | "infinity" | "inf" => Ok(Capacity::Unbounded),
            other => {
                let value: i64 = other.parse().map_err(|_| {
                    RegistryError::invalid_argument(format!(
                        "max listeners must be a non-negative integer or 'unbounded', got '{}'",
                        s
                    ))
                })?;
                Capacity::try_from(value)
            }
        }
    }
}

impl TryFrom<&str> for Capacity {
    type Error = RegistryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Wire shape: a plain integer, or the string "unbounded"
///
/// `Signed` only matches negative numbers, which are then rejected with a
/// readable message.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Count(usize),
    Signed(i64),
    Text(String),
}

impl TryFrom<CapacityRepr> for Capacity {
    type Error = RegistryError;

    fn try_from(repr: CapacityRepr) -> Result<Self, Self::Error> {
        match repr {
            CapacityRepr::Count(value) => Ok(Capacity::Bounded(value)),
            CapacityRepr::Signed(value) => Capacity::try_from(value),
            CapacityRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Capacity> for CapacityRepr {
    fn from(capacity: Capacity) -> Self {
        match capacity {
            Capacity::Bounded(max) => CapacityRepr::Count(max),
            Capacity::Unbounded => CapacityRepr::Text("unbounded".to_string()),
        }
    }
}
