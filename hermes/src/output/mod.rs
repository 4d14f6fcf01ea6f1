//! Published output
//!
//! This module defines what the pipeline emits and where it goes:
//! - `events`: JSON event shapes (the subscriber contract)
//! - `sink`: the [`BroadcastSink`] trait the core publishes through
//! - `hub`: fan-out to subscribers and the JSON-lines writer

pub mod events;
pub mod hub;
pub mod sink;

pub use events::{
    new_packet_id, CompletedCall, EventHeader, FormattedEnter, FormattedExit, FormattedPanic,
    FormattedRestart, FunctionStatsEntry, OutputEvent, StatPacket,
};
pub use hub::{spawn_json_lines_writer, EventLine, SubscriberHub};
pub use sink::BroadcastSink;
