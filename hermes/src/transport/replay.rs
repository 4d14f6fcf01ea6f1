//! Capture file replay
//!
//! A capture is raw frames written back to back, 72 bytes each, with no
//! terminators. Frames are queued as fast as the processing loop accepts them.

use crossbeam_channel::Receiver;
use hermes_common::RAW_PACKET_SIZE;
use log::{debug, info, warn};
use std::io::{ErrorKind, Read};

use super::{stop_requested, FrameQueue, TransportSummary};
use crate::decoding::RawFrame;
use crate::domain::TransportError;

/// Read the next frame, `None` at a clean end of file
///
/// # Errors
///
/// [`TransportError::PartialFrame`] if the file ends inside a frame, or the
/// underlying read error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<RawFrame>, TransportError> {
    let mut frame = [0u8; RAW_PACKET_SIZE];
    let mut filled = 0;
    while filled < RAW_PACKET_SIZE {
        match reader.read(&mut frame[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(TransportError::PartialFrame(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(frame))
}

/// Queue every frame of a capture
///
/// # Errors
///
/// Fails on a read error or a truncated last frame; frames before it have
/// already been queued, and their count is logged before returning.
pub fn run<R: Read>(
    mut reader: R,
    queue: &FrameQueue,
    stop: &Receiver<()>,
) -> Result<TransportSummary, TransportError> {
    let mut frames = 0u64;
    while !stop_requested(stop) {
        let next = read_frame(&mut reader).inspect_err(|e| {
            warn!("Replay stopped after {frames} frames ({} queue-dropped): {e}", queue.dropped());
        })?;
        let Some(frame) = next else {
            info!("Replay finished after {frames} frames");
            break;
        };
        if queue.push(frame).is_err() {
            debug!("Processing loop gone, stopping replay");
            break;
        }
        frames += 1;
    }
    Ok(TransportSummary { frames, queue_dropped: queue.dropped(), ..TransportSummary::default() })
}
