//! # Transports
//!
//! Adapters that turn a physical source into aligned 72-byte frames on the
//! inbound queue. The processing core only ever sees the queue receiver.
//!
//! - `udp`: one frame per datagram
//! - `stream`: `\r\n`-terminated frames over a byte stream, with resync
//! - `replay`: back-to-back raw frames from a capture file
//!
//! ## Backpressure
//!
//! The inbound queue is bounded. [`QueuePolicy::Block`] makes the reader wait
//! for the processing loop; [`QueuePolicy::DropOldest`] evicts the oldest
//! queued frame instead so the newest data always gets through.
//!
//! Every reader stops when its stop channel disconnects, when the processing
//! loop goes away, or when its source is exhausted.

pub mod replay;
pub mod stream;
pub mod udp;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::debug;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::decoding::RawFrame;
use crate::domain::TransportError;

/// Default inbound queue capacity, in frames
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What a reader does when the inbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait for the processing loop to catch up
    #[default]
    Block,
    /// Evict the oldest queued frame
    DropOldest,
}

/// Producer side of the inbound queue
pub struct FrameQueue {
    tx: Sender<RawFrame>,
    /// Held only under `DropOldest`, to evict from the front
    evict: Option<Receiver<RawFrame>>,
    /// Dead once the consumer's [`FrameReceiver`] is dropped
    consumer: Weak<()>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of the inbound queue
///
/// Derefs to the channel receiver. Dropping it closes the queue for the
/// producer under every policy, even though `DropOldest` keeps its own
/// receiver handle for eviction.
pub struct FrameReceiver {
    rx: Receiver<RawFrame>,
    _alive: Arc<()>,
}

impl Deref for FrameReceiver {
    type Target = Receiver<RawFrame>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

/// Create the inbound queue
///
/// The returned receiver disconnects once the [`FrameQueue`] is dropped and
/// the remaining frames are drained.
#[must_use]
pub fn frame_queue(capacity: usize, policy: QueuePolicy) -> (FrameQueue, FrameReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let evict = match policy {
        QueuePolicy::Block => None,
        QueuePolicy::DropOldest => Some(rx.clone()),
    };
    let alive = Arc::new(());
    let queue = FrameQueue {
        tx,
        evict,
        consumer: Arc::downgrade(&alive),
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (queue, FrameReceiver { rx, _alive: alive })
}

impl FrameQueue {
    /// Enqueue one frame according to the queue policy
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueClosed`] once the processing loop has
    /// dropped its receiver.
    pub fn push(&self, frame: RawFrame) -> Result<(), TransportError> {
        let Some(evict) = &self.evict else {
            return self.tx.send(frame).map_err(|_| TransportError::QueueClosed);
        };

        if self.consumer.strong_count() == 0 {
            return Err(TransportError::QueueClosed);
        }

        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(rejected)) => {
                    frame = rejected;
                    if evict.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!("Inbound queue full, dropped oldest frame");
                    }
                }
                Err(TrySendError::Disconnected(_)) => return Err(TransportError::QueueClosed),
            }
        }
    }

    /// Frames evicted under `DropOldest`
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// What a reader did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportSummary {
    /// Frames handed to the inbound queue
    pub frames: u64,
    /// Datagrams or frames rejected before queueing
    pub rejected: u64,
    /// Byte-stream resynchronizations
    pub resyncs: u64,
    /// Frames evicted from a full queue
    pub queue_dropped: u64,
}

/// Whether the stop channel has fired (sender dropped or a value sent)
pub(crate) fn stop_requested(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}
