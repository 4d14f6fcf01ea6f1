//! Broadcast sink abstraction
//!
//! The processing loop and the stats publisher both publish through a shared
//! [`BroadcastSink`]. Implementations must never block the caller: a slow
//! subscriber loses events, it does not stall decoding.

use crossbeam_channel::{Sender, TrySendError};
use log::debug;
use std::sync::Arc;

use super::events::OutputEvent;

/// Fan-out target for published events
pub trait BroadcastSink: Send + Sync {
    /// Publish one event, best effort
    fn broadcast(&self, event: OutputEvent);
}

impl<T: BroadcastSink + ?Sized> BroadcastSink for Arc<T> {
    fn broadcast(&self, event: OutputEvent) {
        (**self).broadcast(event);
    }
}

/// A typed channel is a single-subscriber sink (drops when full)
impl BroadcastSink for Sender<OutputEvent> {
    fn broadcast(&self, event: OutputEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Sink channel full, dropping traceType {}", event.trace_type());
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
