//! # Hermes - Embedded Function Trace Decoder
//!
//! Hermes ingests the binary trace stream of a dual-core embedded device whose
//! firmware is instrumented with function enter/exit hooks. It decodes each
//! fixed-size frame, rebuilds the call tree, keeps running per-function
//! statistics, and republishes everything as JSON events.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Instrumented Firmware                         │
//! │        (enter / exit / panic hooks, restart on boot)            │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ 72-byte frames (UDP, serial, capture)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  transport ──▶ FrameQueue (bounded, block | drop-oldest)        │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ RawFrame
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Processing Loop                              │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Decoding   │──▶│  Call Tree   │──▶│ StatTracker  │         │
//! │  │ (packet/tag) │   │ + TimeKeeper │   │  (locked)    │         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │                            │ events           │ every N s       │
//! │                            ▼                  ▼                 │
//! │                     ┌──────────────────────────────┐            │
//! │                     │        BroadcastSink         │            │
//! │                     └──────────────┬───────────────┘            │
//! └────────────────────────────────────┼────────────────────────────┘
//!                                      ▼
//!                 SubscriberHub ──▶ JSON lines (stdout, file)
//! ```
//!
//! ## Module Structure
//!
//! - [`decoding`]: frame classification and field decoding
//!   - `packet`: discriminant dispatch into typed entries, fixed-width text
//!   - `values`: 2-bit type tags turning raw words into unsigned/signed/float
//!
//! - [`processing`]: the core, driven by one thread
//!   - `time_keeper`: device ticks onto the host clock, rebased on reboot
//!   - `call_tree`: per-core call stacks, completed call records
//!   - `stats`: running per-function statistics and the periodic publisher
//!   - `event_processor`: the loop tying the above to the queue and sink
//!
//! - [`output`]: emitted JSON shapes, the [`output::BroadcastSink`] seam and
//!   the subscriber hub
//!
//! - [`transport`]: inbound queue and the UDP / stream / replay readers
//!
//! - [`cli`]: command-line arguments
//!
//! - [`domain`]: newtypes (`CoreId`, `FuncCallId`, `HostMicros`) and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Listen for trace datagrams from the device
//! ./hermes --udp 0.0.0.0:9000
//!
//! # Read a serial link and keep a copy of the event stream
//! stty -F /dev/ttyUSB0 115200 raw
//! ./hermes --serial /dev/ttyUSB0 --output session.jsonl
//!
//! # Replay a capture without echoing events
//! ./hermes --replay capture.bin --quiet --output replay.jsonl
//! ```
//!
//! ## Key Concepts
//!
//! - **Frame**: 72 bytes, little-endian, leading `u32` trace type
//! - **Device ticks**: per-boot monotonic microseconds, reset on restart
//! - **Completed call**: an enter matched with its exit, with depth and links
//! - **Stack mismatch**: an exit that does not close the innermost open call

pub mod cli;
pub mod decoding;
pub mod domain;
pub mod output;
pub mod processing;
pub mod transport;
