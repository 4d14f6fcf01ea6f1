//! Terminator-framed byte stream reader
//!
//! A serial link carries each 72-byte frame followed by `\r\n`. Bytes can be
//! lost or corrupted on the wire, so alignment is re-established whenever a
//! frame does not end in the terminator or a read fails: the reader discards
//! bytes one at a time until it has just consumed `\r\n`, then resumes
//! reading whole frames.
//!
//! When attaching to a device that is already streaming, call
//! [`StreamFramer::attach`] first to skip the partial frame in flight.

use crossbeam_channel::Receiver;
use hermes_common::{FRAME_TERMINATOR, RAW_PACKET_SIZE, STREAM_FRAME_SIZE};
use log::{debug, info, warn};
use std::io::{ErrorKind, Read};

use super::{stop_requested, FrameQueue, TransportSummary};
use crate::decoding::RawFrame;
use crate::domain::TransportError;

/// Consecutive read failures tolerated before the stream is given up
const MAX_CONSECUTIVE_ERRORS: u32 = 64;

/// How a fill attempt ended
enum Fill {
    Full,
    /// End of stream after this many bytes of the frame
    Eof(usize),
}

/// Splits a byte stream into aligned frames
pub struct StreamFramer<R> {
    reader: R,
    frames: u64,
    resyncs: u64,
    errors: u32,
}

impl<R: Read> StreamFramer<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, frames: 0, resyncs: 0, errors: 0 }
    }

    /// Skip to the first frame boundary. Returns `false` if the stream ended first.
    ///
    /// # Errors
    ///
    /// Fails after too many consecutive read errors.
    pub fn attach(&mut self) -> Result<bool, TransportError> {
        self.scan_to_terminator([0, 0])
    }

    /// Frames returned so far
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Resynchronizations performed so far
    #[must_use]
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Read the next well-terminated frame, resyncing past bad ones
    ///
    /// Returns `Ok(None)` at end of stream. A partial frame at the end is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Fails after too many consecutive read errors.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, TransportError> {
        let mut buf = [0u8; STREAM_FRAME_SIZE];
        loop {
            match self.fill(&mut buf) {
                Ok(Fill::Full) => self.errors = 0,
                Ok(Fill::Eof(0)) => return Ok(None),
                Ok(Fill::Eof(n)) => {
                    warn!("Stream ended mid-frame, discarding {n} bytes");
                    return Ok(None);
                }
                Err(e) => {
                    self.note_error(e)?;
                    if !self.resync([0, 0])? {
                        return Ok(None);
                    }
                    continue;
                }
            }

            let terminator = [buf[RAW_PACKET_SIZE], buf[RAW_PACKET_SIZE + 1]];
            if terminator != FRAME_TERMINATOR {
                warn!("{}, resyncing", TransportError::BadTerminator(terminator));
                // the terminator may start in the last byte we already hold
                if !self.resync([0, terminator[1]])? {
                    return Ok(None);
                }
                continue;
            }

            let mut frame = [0u8; RAW_PACKET_SIZE];
            frame.copy_from_slice(&buf[..RAW_PACKET_SIZE]);
            self.frames += 1;
            return Ok(Some(frame));
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<Fill> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => return Ok(Fill::Eof(filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Fill::Full)
    }

    fn resync(&mut self, window: [u8; 2]) -> Result<bool, TransportError> {
        self.resyncs += 1;
        self.scan_to_terminator(window)
    }

    fn scan_to_terminator(&mut self, mut window: [u8; 2]) -> Result<bool, TransportError> {
        let mut byte = [0u8; 1];
        let mut skipped = 0usize;
        while window != FRAME_TERMINATOR {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    window = [window[1], byte[0]];
                    skipped += 1;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => self.note_error(e)?,
            }
        }
        debug!("Frame boundary found after {skipped} bytes");
        Ok(true)
    }

    fn note_error(&mut self, e: std::io::Error) -> Result<(), TransportError> {
        self.errors += 1;
        if self.errors >= MAX_CONSECUTIVE_ERRORS {
            return Err(e.into());
        }
        warn!("Stream read error: {e}");
        Ok(())
    }
}

/// Feed frames from `reader` into the inbound queue until EOF or stop
///
/// # Errors
///
/// Fails if the stream keeps erroring.
pub fn run<R: Read>(
    reader: R,
    attach: bool,
    queue: &FrameQueue,
    stop: &Receiver<()>,
) -> Result<TransportSummary, TransportError> {
    let mut framer = StreamFramer::new(reader);
    if attach && !framer.attach()? {
        return Ok(TransportSummary::default());
    }

    while !stop_requested(stop) {
        let Some(frame) = framer.next_frame()? else {
            info!("Stream ended");
            break;
        };
        if queue.push(frame).is_err() {
            debug!("Processing loop gone, stopping stream reader");
            break;
        }
    }

    Ok(TransportSummary {
        frames: framer.frames(),
        rejected: 0,
        resyncs: framer.resyncs(),
        queue_dropped: queue.dropped(),
    })
}
