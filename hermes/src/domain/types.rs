//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a core number where
//! a call identifier is expected, and make function signatures more expressive.

use serde::{Serialize, Serializer};
use std::fmt;

/// CPU core on the traced device (0 or 1 on the dual-core target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CoreId(pub u32);

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core#{}", self.0)
    }
}

/// Device-assigned call identifier correlating an enter with its exit
///
/// The firmware never hands out `0`, so it doubles as "no parent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FuncCallId(pub u32);

impl FuncCallId {
    /// Parent of a top-level call
    pub const NONE: FuncCallId = FuncCallId(0);

    /// Returns true if this is the "no parent" sentinel
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for FuncCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call#{}", self.0)
    }
}

/// Host wall-clock timestamp in microseconds since the Unix epoch
///
/// Serialized as a decimal string: subscribers render timestamps relative to
/// each other and need all 16+ digits, which JavaScript numbers cannot hold
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostMicros(pub i64);

impl HostMicros {
    /// Current wall-clock reading
    #[must_use]
    pub fn now() -> Self {
        let micros = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
        Self(micros)
    }

    /// Offset by a signed number of microseconds
    #[must_use]
    pub fn offset(self, micros: i64) -> Self {
        Self(self.0.saturating_add(micros))
    }

    /// Microseconds elapsed since `earlier` (negative if `earlier` is later)
    #[must_use]
    pub fn since(self, earlier: HostMicros) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for HostMicros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for HostMicros {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
