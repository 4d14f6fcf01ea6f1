//! # Packet Decoding
//!
//! Turns a raw 72-byte frame into one of the four typed entries defined in
//! `hermes-common`. Frames are parsed field by field in little-endian order
//! rather than transmuted, so decoding is safe on any host and a short buffer
//! is reported instead of read past.
//!
//! ## Classification
//!
//! The first 4 bytes select the layout:
//!
//! - `TRACE_ENTER` → [`TraceEnterEntry`] (56 bytes)
//! - `TRACE_EXIT` → [`TraceExitEntry`] (56 bytes)
//! - `TRACE_PANIC` → [`TracePanicEntry`] (72 bytes)
//! - `TRACE_RESTART` → [`TraceRestartEntry`] (24 bytes)
//!
//! Anything else is [`DecodeError::UnknownTraceType`]. Bytes past the end of
//! the selected layout are ignored.

use hermes_common::{
    TraceEnterEntry, TraceExitEntry, TraceHeader, TracePanicEntry, TraceRestartEntry,
    RAW_PACKET_SIZE, TRACE_ENTER, TRACE_ENTER_SIZE, TRACE_EXIT, TRACE_EXIT_SIZE, TRACE_PANIC,
    TRACE_PANIC_SIZE, TRACE_RESTART, TRACE_RESTART_SIZE,
};

use crate::domain::DecodeError;

/// One frame as delivered by a transport
pub type RawFrame = [u8; RAW_PACKET_SIZE];

/// A decoded trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEntry {
    Enter(TraceEnterEntry),
    Exit(TraceExitEntry),
    Panic(TracePanicEntry),
    Restart(TraceRestartEntry),
}

impl TraceEntry {
    /// Header shared by all variants
    #[must_use]
    pub fn header(&self) -> &TraceHeader {
        match self {
            TraceEntry::Enter(e) => &e.header,
            TraceEntry::Exit(e) => &e.header,
            TraceEntry::Panic(e) => &e.header,
            TraceEntry::Restart(e) => &e.header,
        }
    }

    /// Number of frame bytes this variant occupies
    #[must_use]
    pub fn wire_size(&self) -> usize {
        match self {
            TraceEntry::Enter(_) => TRACE_ENTER_SIZE,
            TraceEntry::Exit(_) => TRACE_EXIT_SIZE,
            TraceEntry::Panic(_) => TRACE_PANIC_SIZE,
            TraceEntry::Restart(_) => TRACE_RESTART_SIZE,
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEntry::Enter(_) => "enter",
            TraceEntry::Exit(_) => "exit",
            TraceEntry::Panic(_) => "panic",
            TraceEntry::Restart(_) => "restart",
        }
    }
}

/// Decode a raw frame
///
/// # Errors
///
/// - [`DecodeError::Truncated`] if `bytes` is shorter than the discriminant
///   or the layout it selects
/// - [`DecodeError::UnknownTraceType`] for an unrecognized discriminant
pub fn decode_frame(bytes: &[u8]) -> Result<TraceEntry, DecodeError> {
    let Some(tag) = bytes.get(..4) else {
        return Err(DecodeError::Truncated { trace_type: None, needed: 4, got: bytes.len() });
    };
    let trace_type = u32::from_le_bytes([tag[0], tag[1], tag[2], tag[3]]);

    let needed = match trace_type {
        TRACE_ENTER => TRACE_ENTER_SIZE,
        TRACE_EXIT => TRACE_EXIT_SIZE,
        TRACE_PANIC => TRACE_PANIC_SIZE,
        TRACE_RESTART => TRACE_RESTART_SIZE,
        other => return Err(DecodeError::UnknownTraceType(other)),
    };
    if bytes.len() < needed {
        return Err(DecodeError::Truncated {
            trace_type: Some(trace_type),
            needed,
            got: bytes.len(),
        });
    }

    let mut r = FieldReader::new(&bytes[..needed]);
    let header = r.header();
    let entry = match trace_type {
        TRACE_ENTER => TraceEntry::Enter(TraceEnterEntry {
            header,
            value_types: r.u8(),
            arg_count: r.u8(),
            _padding: r.array(),
            func_args: [r.u32(), r.u32(), r.u32(), r.u32()],
            func_name: r.array(),
        }),
        TRACE_EXIT => TraceEntry::Exit(TraceExitEntry {
            header,
            value_types: r.u8(),
            _padding: r.array(),
            return_val: r.u32(),
            _reserved: r.array(),
            func_name: r.array(),
        }),
        TRACE_PANIC => TraceEntry::Panic(TracePanicEntry {
            header,
            faulting_pc: r.u32(),
            exception_reason: r.array(),
        }),
        _ => TraceEntry::Restart(TraceRestartEntry { header, restart_reason: r.u32() }),
    };
    Ok(entry)
}

/// Encode an entry into a zero-filled frame, the inverse of [`decode_frame`]
#[must_use]
pub fn encode_entry(entry: &TraceEntry) -> RawFrame {
    let mut w = FieldWriter::new();
    w.header(entry.header());
    match entry {
        TraceEntry::Enter(e) => {
            w.u8(e.value_types);
            w.u8(e.arg_count);
            w.bytes(&e._padding);
            for arg in e.func_args {
                w.u32(arg);
            }
            w.bytes(&e.func_name);
        }
        TraceEntry::Exit(e) => {
            w.u8(e.value_types);
            w.bytes(&e._padding);
            w.u32(e.return_val);
            w.bytes(&e._reserved);
            w.bytes(&e.func_name);
        }
        TraceEntry::Panic(e) => {
            w.u32(e.faulting_pc);
            w.bytes(&e.exception_reason);
        }
        TraceEntry::Restart(e) => w.u32(e.restart_reason),
    }
    w.finish()
}

/// Normalize a fixed-width, zero-padded text field into an owned string
///
/// Trailing zero bytes are trimmed; anything that is not UTF-8 is replaced.
#[must_use]
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copy a string into a fixed-width, zero-padded field (truncating)
#[must_use]
pub fn fixed_bytes<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let len = text.len().min(N);
    out[..len].copy_from_slice(&text.as_bytes()[..len]);
    out
}

/// Sequential little-endian reader over a buffer already checked for length
struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(src) = self.bytes.get(self.pos..self.pos + N) {
            out.copy_from_slice(src);
        }
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        let [b] = self.array::<1>();
        b
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn header(&mut self) -> TraceHeader {
        TraceHeader {
            trace_type: self.u32(),
            core_id: self.u32(),
            timestamp: self.u32(),
            trace_id: self.u32(),
            func_num_id: self.u32(),
        }
    }
}

struct FieldWriter {
    frame: RawFrame,
    pos: usize,
}

impl FieldWriter {
    fn new() -> Self {
        Self { frame: [0; RAW_PACKET_SIZE], pos: 0 }
    }

    fn bytes(&mut self, src: &[u8]) {
        let end = (self.pos + src.len()).min(RAW_PACKET_SIZE);
        let len = end - self.pos;
        self.frame[self.pos..end].copy_from_slice(&src[..len]);
        self.pos = end;
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn header(&mut self, h: &TraceHeader) {
        self.u32(h.trace_type);
        self.u32(h.core_id);
        self.u32(h.timestamp);
        self.u32(h.trace_id);
        self.u32(h.func_num_id);
    }

    fn finish(self) -> RawFrame {
        self.frame
    }
}
