//! # Shared Wire Layout (Device ↔ Host)
//!
//! Defines the trace entry layouts written by the instrumented firmware and
//! read by the host. All types use `#[repr(C)]` so the structs match the C
//! structs compiled into the device image byte for byte (little-endian,
//! 4-byte aligned, explicit padding).
//!
//! ## Frame Layout
//!
//! Every entry travels in a fixed 72-byte frame. The first field of every
//! entry is its trace type, so the host can classify a frame by reading the
//! first 4 bytes. Shorter entries leave the tail of the frame unused.
//!
//! ```text
//! 0        4        8        12       16       20
//! ┌────────┬────────┬────────┬────────┬────────┬──────────────────────────┐
//! │  type  │  core  │   ts   │ trace  │ func   │ variant payload ...      │
//! └────────┴────────┴────────┴────────┴────────┴──────────────────────────┘
//! ```
//!
//! ## Key Types
//!
//! - [`TraceHeader`] - common 20-byte prefix
//! - [`TraceEnterEntry`] / [`TraceExitEntry`] - function instrumentation hooks
//! - [`TracePanicEntry`] - CPU exception report
//! - [`TraceRestartEntry`] - first entry after a device boot

#![cfg_attr(not(test), no_std)]

// ============================================================================
// Trace Type Constants
// ============================================================================

/// Function entry hook fired
pub const TRACE_ENTER: u32 = 0;

/// Function exit hook fired
///
/// Paired with: `TRACE_ENTER` via `func_num_id`
pub const TRACE_EXIT: u32 = 1;

/// Unhandled CPU exception on the device
pub const TRACE_PANIC: u32 = 2;

/// Device booted; carries the reset cause reported by the bootloader
pub const TRACE_RESTART: u32 = 3;

/// **Host only**: completed call record (enter + exit joined) for flame graphs
pub const TRACE_FLAME_GRAPH_ENTRY: u32 = 4;

/// **Host only**: periodic per-function statistics snapshot
pub const TRACE_STAT_UPDATES: u32 = 5;

// ============================================================================
// Sizes
// ============================================================================

/// Size of one raw frame as delivered by the transport
pub const RAW_PACKET_SIZE: usize = 72;

/// Terminator the firmware appends after every frame on byte-stream links
pub const FRAME_TERMINATOR: [u8; 2] = *b"\r\n";

/// Frame plus terminator, as it appears on a serial line
pub const STREAM_FRAME_SIZE: usize = RAW_PACKET_SIZE + FRAME_TERMINATOR.len();

/// Number of argument slots captured per function entry
pub const MAX_FUNC_ARGS: usize = 4;

/// Width of the function name buffer (truncated, zero padded)
pub const FUNC_NAME_LEN: usize = 16;

/// Width of the exception reason buffer (truncated, zero padded)
pub const EXCEPTION_REASON_LEN: usize = 48;

pub const TRACE_HEADER_SIZE: usize = core::mem::size_of::<TraceHeader>();
pub const TRACE_ENTER_SIZE: usize = core::mem::size_of::<TraceEnterEntry>();
pub const TRACE_EXIT_SIZE: usize = core::mem::size_of::<TraceExitEntry>();
pub const TRACE_PANIC_SIZE: usize = core::mem::size_of::<TracePanicEntry>();
pub const TRACE_RESTART_SIZE: usize = core::mem::size_of::<TraceRestartEntry>();

// Layout must match the firmware exactly.
const _: () = assert!(TRACE_HEADER_SIZE == 20);
const _: () = assert!(TRACE_ENTER_SIZE == 56);
const _: () = assert!(TRACE_EXIT_SIZE == 56);
const _: () = assert!(TRACE_PANIC_SIZE == RAW_PACKET_SIZE);
const _: () = assert!(TRACE_RESTART_SIZE == 24);

// ============================================================================
// Entry Layouts
// ============================================================================

/// Common prefix of every trace entry
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceHeader {
    /// One of the `TRACE_*` constants
    pub trace_type: u32,

    /// CPU core that emitted the entry (0 or 1 on the dual-core target)
    pub core_id: u32,

    /// Device monotonic timer, microseconds since boot
    ///
    /// Restarts from zero on every reset. Not expected to wrap within one boot.
    pub timestamp: u32,

    /// Sequence number assigned by the firmware trace buffer
    pub trace_id: u32,

    /// Call identifier correlating an enter with its exit
    ///
    /// `0` is reserved as the "no parent" sentinel on the host side.
    pub func_num_id: u32,
}

/// Function entry
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceEnterEntry {
    pub header: TraceHeader,

    /// Packed 2-bit type tags, one per argument slot (slot 0 in bits 0..2)
    ///
    /// - `0b00`: unsigned 32-bit
    /// - `0b01`: IEEE-754 single precision
    /// - `0b10`: signed 32-bit
    pub value_types: u8,

    /// Number of meaningful slots in `func_args`
    pub arg_count: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 2],

    /// Raw argument words, reinterpreted per `value_types`
    pub func_args: [u32; MAX_FUNC_ARGS],

    /// Function name, zero padded
    pub func_name: [u8; FUNC_NAME_LEN],
}

/// Function exit
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceExitEntry {
    pub header: TraceHeader,

    /// Type tag of the return value lives in slot 0
    pub value_types: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 3],

    /// Raw return word
    pub return_val: u32,

    /// Keeps `func_name` at the same offset as in [`TraceEnterEntry`]
    #[allow(clippy::pub_underscore_fields)]
    pub _reserved: [u8; 12],

    pub func_name: [u8; FUNC_NAME_LEN],
}

/// CPU exception
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TracePanicEntry {
    pub header: TraceHeader,

    /// Program counter at the time of the exception
    pub faulting_pc: u32,

    /// Human readable exception cause, zero padded
    pub exception_reason: [u8; EXCEPTION_REASON_LEN],
}

impl Default for TracePanicEntry {
    fn default() -> Self {
        Self {
            header: TraceHeader::default(),
            faulting_pc: 0,
            exception_reason: [0; EXCEPTION_REASON_LEN],
        }
    }
}

/// Device boot
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceRestartEntry {
    pub header: TraceHeader,

    /// Reset cause (see `RST_*` constants)
    pub restart_reason: u32,
}

// ============================================================================
// Reset Causes
// ============================================================================

pub const RST_UNKNOWN: u32 = 0;
pub const RST_POWERON: u32 = 1;
pub const RST_EXT: u32 = 2;
pub const RST_SW: u32 = 3;
pub const RST_PANIC: u32 = 4;
pub const RST_INT_WDT: u32 = 5;
pub const RST_TASK_WDT: u32 = 6;
pub const RST_WDT: u32 = 7;
pub const RST_DEEPSLEEP: u32 = 8;
pub const RST_BROWNOUT: u32 = 9;
pub const RST_SDIO: u32 = 10;
pub const RST_USB: u32 = 11;
pub const RST_JTAG: u32 = 12;
pub const RST_EFUSE: u32 = 13;
pub const RST_PWR_GLITCH: u32 = 14;
pub const RST_CPU_LOCKUP: u32 = 15;

/// Descriptions indexed by reset cause code
const RESET_REASONS: [&str; 16] = [
    "Unknown reset reason",
    "Power-on reset",
    "External pin reset",
    "Software reset via esp_restart",
    "Software reset due to exception/panic",
    "Interrupt watchdog reset",
    "Task watchdog reset",
    "Other watchdog reset",
    "Wakeup from deep sleep",
    "Brownout reset (voltage dip)",
    "Reset over SDIO",
    "Reset by USB peripheral",
    "Reset by JTAG",
    "Reset due to efuse error",
    "Power glitch detected",
    "CPU lock up (double exception)",
];

/// Returned for codes outside the firmware's enum
pub const INVALID_RESET_REASON: &str = "Invalid reset reason";

/// Describe a firmware reset cause
#[must_use]
pub fn reset_reason(code: u32) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|idx| RESET_REASONS.get(idx))
        .copied()
        .unwrap_or(INVALID_RESET_REASON)
}
