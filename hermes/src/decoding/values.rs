//! Argument and return value decoding
//!
//! The firmware captures every argument as a raw 32-bit word and records how
//! to read it back in `value_types`, two bits per slot:
//!
//! ```text
//!  bit  7 6   5 4   3 2   1 0
//!      slot3 slot2 slot1 slot0
//!
//!  00 = u32   01 = f32 (bit pattern)   10 = i32 (two's complement)
//! ```
//!
//! Return values always use slot 0.

use hermes_common::MAX_FUNC_ARGS;
use serde::{Serialize, Serializer};

const TAG_FLOAT: u8 = 0b01;
const TAG_SIGNED: u8 = 0b10;

/// A decoded argument or return value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgValue {
    Unsigned(u32),
    Signed(i32),
    Float(f32),
}

impl Default for ArgValue {
    fn default() -> Self {
        ArgValue::Unsigned(0)
    }
}

/// Serialized as a bare JSON number, whatever the variant.
impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ArgValue::Unsigned(v) => serializer.serialize_u32(v),
            ArgValue::Signed(v) => serializer.serialize_i32(v),
            ArgValue::Float(v) => serializer.serialize_f32(v),
        }
    }
}

/// How the 2-bit tag of a slot is isolated from `value_types`
///
/// Deployed host tooling masks with the decimal literal `11` (`0b1011`)
/// instead of `0b11`. With that mask bit `2*slot+3` (the high bit of the next
/// slot's tag) leaks into the tag, and any slot whose neighbour is tagged
/// signed falls back to unsigned. Downstream dashboards were built against
/// that output, so it stays the default until the firmware side confirms the
/// intended encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMask {
    #[default]
    Legacy,
    Strict,
}

impl TagMask {
    fn bits(self) -> u8 {
        match self {
            TagMask::Legacy => 11,
            TagMask::Strict => 0b11,
        }
    }
}

/// Extract the type tag of `slot` from `value_types`
#[must_use]
pub fn slot_tag(value_types: u8, slot: usize, mask: TagMask) -> u8 {
    let Ok(shift) = u32::try_from(slot * 2) else {
        return 0;
    };
    // Bits shifted past bit 7 are dropped, exactly like the 8-bit device code.
    let slot_mask = mask.bits().checked_shl(shift).unwrap_or(0);
    (value_types & slot_mask).checked_shr(shift).unwrap_or(0)
}

/// Reinterpret one raw word according to its slot's tag
#[must_use]
pub fn decode_value(word: u32, value_types: u8, slot: usize, mask: TagMask) -> ArgValue {
    match slot_tag(value_types, slot, mask) {
        TAG_FLOAT => ArgValue::Float(f32::from_bits(word)),
        TAG_SIGNED => ArgValue::Signed(i32::from_ne_bytes(word.to_ne_bytes())),
        _ => ArgValue::Unsigned(word),
    }
}

/// Decode all argument slots of an enter entry
#[must_use]
pub fn decode_args(
    words: [u32; MAX_FUNC_ARGS],
    value_types: u8,
    mask: TagMask,
) -> [ArgValue; MAX_FUNC_ARGS] {
    std::array::from_fn(|slot| decode_value(words[slot], value_types, slot, mask))
}

/// Decode a return value (always slot 0)
#[must_use]
pub fn decode_return(word: u32, value_types: u8, mask: TagMask) -> ArgValue {
    decode_value(word, value_types, 0, mask)
}
