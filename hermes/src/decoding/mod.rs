//! Wire decoding
//!
//! - `packet`: raw frame → [`TraceEntry`]
//! - `values`: packed argument/return words → [`ArgValue`]

pub mod packet;
pub mod values;

pub use packet::{decode_frame, encode_entry, fixed_bytes, fixed_str, RawFrame, TraceEntry};
pub use values::{decode_args, decode_return, decode_value, ArgValue, TagMask};
