//! # Subscriber Hub
//!
//! Fans every published event out to all live subscribers. Each event is
//! serialized to JSON once and shared between subscribers as `Arc<str>`.
//!
//! ## Delivery
//!
//! - Each subscriber owns a bounded channel.
//! - A full channel drops the event for that subscriber only (counted).
//! - A disconnected subscriber is pruned on the next broadcast.
//!
//! The hub itself never blocks, so it is safe to call from the processing
//! loop and the stats publisher at the same time.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use super::events::OutputEvent;
use super::sink::BroadcastSink;

/// A serialized event as handed to subscribers
pub type EventLine = Arc<str>;

/// Broadcast hub with per-subscriber bounded queues
#[derive(Default)]
pub struct SubscriberHub {
    subscribers: Mutex<Vec<Sender<EventLine>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl SubscriberHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber that can lag by up to `capacity` events
    pub fn subscribe(&self, capacity: usize) -> Receiver<EventLine> {
        let (tx, rx) = bounded(capacity);
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Events handed to a subscriber queue
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Events lost to full subscriber queues
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drop every subscriber sender so their receivers drain and disconnect
    pub fn close(&self) {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn publish_line(&self, line: &EventLine) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(Arc::clone(line)) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Subscriber disconnected");
                false
            }
        });
    }
}

impl BroadcastSink for SubscriberHub {
    fn broadcast(&self, event: OutputEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => self.publish_line(&EventLine::from(json)),
            Err(e) => warn!("Failed to serialize traceType {}: {e}", event.trace_type()),
        }
    }
}

/// Write a subscriber's events as JSON lines until the hub disconnects it
///
/// Flushes whenever the queue runs dry so a live viewer (`tail -f`, a pipe)
/// sees events promptly. Returns the number of lines written.
pub fn spawn_json_lines_writer<W>(rx: Receiver<EventLine>, writer: W) -> JoinHandle<io::Result<u64>>
where
    W: Write + Send + 'static,
{
    std::thread::spawn(move || {
        let mut out = io::BufWriter::new(writer);
        let mut written = 0u64;
        for line in &rx {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            written += 1;
            if rx.is_empty() {
                out.flush()?;
            }
        }
        out.flush()?;
        Ok(written)
    })
}
