//! # Event Processing
//!
//! Consumes raw frames from the inbound queue and drives them through the
//! decoder and the reconstructor, publishing every resulting event.
//!
//! ## Frame Routing
//!
//! - `TRACE_ENTER` / `TRACE_EXIT` → call tree, completed calls feed [`StatTracker`]
//! - `TRACE_PANIC` → published as-is
//! - `TRACE_RESTART` → time rebase, then published
//! - anything else → counted, logged, dropped
//!
//! Decoding and reconstruction state is owned by this loop alone; the only
//! shared pieces are the stats tracker and the sink.

use crossbeam_channel::{select, Receiver};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::call_tree::{Reconstructor, ReconstructorConfig};
use super::stats::{StatTracker, DEFAULT_STATS_INTERVAL};
use crate::decoding::{decode_frame, RawFrame};
use crate::domain::DecodeError;
use crate::output::{BroadcastSink, OutputEvent};

/// Runtime configuration for the processing core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub reconstructor: ReconstructorConfig,
    /// Interval between published stats snapshots
    pub stats_interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { reconstructor: ReconstructorConfig::default(), stats_interval: DEFAULT_STATS_INTERVAL }
    }
}

/// Counters reported when processing stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingCounters {
    pub frames: u64,
    pub decode_errors: u64,
    /// Subset of `decode_errors` with an unrecognized discriminant
    pub unknown_types: u64,
    pub stack_mismatches: u64,
    /// Open calls discarded by device restarts
    pub abandoned_calls: u64,
    pub events_emitted: u64,
    pub completed_calls: u64,
}

/// Encapsulates the processing loop state
pub struct EventProcessor {
    reconstructor: Reconstructor,
    stats: Arc<StatTracker>,
    sink: Arc<dyn BroadcastSink>,
    pub counters: ProcessingCounters,
}

impl EventProcessor {
    #[must_use]
    pub fn new(config: &ProcessorConfig, stats: Arc<StatTracker>, sink: Arc<dyn BroadcastSink>) -> Self {
        Self::with_reconstructor(Reconstructor::new(config.reconstructor), stats, sink)
    }

    /// Build around an existing reconstructor (custom clock in tests)
    #[must_use]
    pub fn with_reconstructor(
        reconstructor: Reconstructor,
        stats: Arc<StatTracker>,
        sink: Arc<dyn BroadcastSink>,
    ) -> Self {
        Self { reconstructor, stats, sink, counters: ProcessingCounters::default() }
    }

    #[must_use]
    pub fn reconstructor(&self) -> &Reconstructor {
        &self.reconstructor
    }

    /// Process a single raw frame
    pub fn process_frame(&mut self, frame: &[u8]) {
        self.counters.frames += 1;

        let entry = match decode_frame(frame) {
            Ok(entry) => entry,
            Err(e) => {
                self.counters.decode_errors += 1;
                if matches!(e, DecodeError::UnknownTraceType(_)) {
                    self.counters.unknown_types += 1;
                }
                warn!("Dropping frame: {e}");
                return;
            }
        };

        let result = self.reconstructor.apply(&entry);
        if let Some(e) = &result.error {
            self.counters.stack_mismatches += 1;
            warn!("{e}");
        }
        self.counters.abandoned_calls += result.abandoned as u64;

        for event in result.events {
            if let OutputEvent::Completed(call) = &event {
                self.stats.record(call);
                self.counters.completed_calls += 1;
            }
            self.sink.broadcast(event);
            self.counters.events_emitted += 1;
        }
    }

    /// Process frames until the queue disconnects or `stop` fires
    ///
    /// Frames already queued when the queue disconnects are drained first;
    /// a stop signal ends the loop right away.
    pub fn run(&mut self, frames: &Receiver<RawFrame>, stop: &Receiver<()>) -> ProcessingCounters {
        info!("Processing loop started");
        loop {
            select! {
                recv(frames) -> msg => match msg {
                    Ok(frame) => self.process_frame(&frame),
                    Err(_) => {
                        debug!("Inbound queue disconnected");
                        break;
                    }
                },
                recv(stop) -> _ => {
                    debug!("Stop signal received");
                    break;
                }
            }
        }
        info!(
            "Processing loop stopped: {} frames, {} events, {} decode errors, {} stack mismatches",
            self.counters.frames,
            self.counters.events_emitted,
            self.counters.decode_errors,
            self.counters.stack_mismatches
        );
        self.counters
    }
}
