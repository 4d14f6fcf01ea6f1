//! UDP datagram reader
//!
//! The device sends each frame as its own datagram, so alignment is free:
//! a datagram is either exactly one frame or it is rejected.

use crossbeam_channel::Receiver;
use hermes_common::RAW_PACKET_SIZE;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use super::{stop_requested, FrameQueue, TransportSummary};
use crate::decoding::RawFrame;
use crate::domain::TransportError;

/// How often a blocked receive wakes up to check for a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Receive buffer, large enough to detect oversized datagrams
const RECV_BUFFER_SIZE: usize = 512;

/// Bind the listening socket
///
/// # Errors
///
/// Fails if the address cannot be bound.
pub fn bind(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(addr)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    info!("Listening for trace datagrams on {}", socket.local_addr()?);
    Ok(socket)
}

/// Check a datagram's size and copy it into a frame
///
/// # Errors
///
/// [`TransportError::BadDatagramSize`] unless the datagram is exactly one frame.
pub fn datagram_frame(datagram: &[u8]) -> Result<RawFrame, TransportError> {
    <RawFrame>::try_from(datagram).map_err(|_| TransportError::BadDatagramSize(datagram.len()))
}

/// Queue received frames until stopped
///
/// Receive errors are logged and skipped; the socket stays open.
///
/// # Errors
///
/// Currently always returns `Ok`; the signature matches the other readers.
pub fn run(
    socket: &UdpSocket,
    queue: &FrameQueue,
    stop: &Receiver<()>,
) -> Result<TransportSummary, TransportError> {
    let mut summary = TransportSummary::default();
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    while !stop_requested(stop) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("UDP receive failed: {e}");
                continue;
            }
        };

        let frame = match datagram_frame(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                summary.rejected += 1;
                warn!("{e} (from {peer})");
                continue;
            }
        };
        if queue.push(frame).is_err() {
            debug!("Processing loop gone, stopping UDP reader");
            break;
        }
        summary.frames += 1;
    }

    summary.queue_dropped = queue.dropped();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{frame_queue, QueuePolicy};
    use crossbeam_channel::bounded;

    #[test]
    fn test_datagram_must_be_exactly_one_frame() {
        assert!(datagram_frame(&[0u8; RAW_PACKET_SIZE]).is_ok());
        assert!(matches!(
            datagram_frame(&[0u8; RAW_PACKET_SIZE + 2]),
            Err(TransportError::BadDatagramSize(74))
        ));
        assert!(matches!(datagram_frame(&[]), Err(TransportError::BadDatagramSize(0))));
    }

    #[test]
    fn test_receives_frames_over_loopback() {
        let socket = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let target = socket.local_addr().unwrap();
        let (queue, rx) = frame_queue(8, QueuePolicy::Block);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&[7u8; 10], target).unwrap();
        sender.send_to(&[1u8; RAW_PACKET_SIZE], target).unwrap();

        let reader = std::thread::spawn(move || run(&socket, &queue, &stop_rx).unwrap());
        let frame = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(frame, [1u8; RAW_PACKET_SIZE]);

        drop(stop_tx);
        let summary = reader.join().unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.rejected, 1);
    }
}
