//! # hermes - Main Entry Point
//!
//! Wires a frame source to the processing core and the JSON-lines outputs:
//! - **UDP** (`--udp ADDR`): one frame per datagram
//! - **Serial** (`--serial PATH`): `\r\n`-terminated frames, resynced on errors
//! - **Replay** (`--replay PATH`): a capture of raw frames, exits when done
//!
//! Shutdown runs in pipeline order so nothing in flight is lost: the transport
//! stops, the processing loop drains the queue, the stats publisher emits its
//! final snapshot, then the writers drain and flush.

// Summary output converts durations for display
#![allow(clippy::cast_precision_loss, clippy::too_many_lines)]

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufReader};
use std::net::UdpSocket;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use hermes::cli::{Args, Source};
use hermes::domain::TransportError;
use hermes::output::{spawn_json_lines_writer, BroadcastSink, SubscriberHub};
use hermes::processing::{spawn_stats_publisher, EventProcessor, StatTracker};
use hermes::transport::{self, frame_queue, FrameQueue, TransportSummary};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

/// How far a JSON-lines writer may lag before it loses events
const SUBSCRIBER_CAPACITY: usize = 4096;

/// How long a stopped transport gets to notice before it is abandoned
const TRANSPORT_GRACE: Duration = Duration::from_secs(2);

fn main() {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

/// An opened frame source, ready to hand to its reader thread
enum OpenSource {
    Udp(UdpSocket),
    Serial(File),
    Replay(File),
}

fn open_source(source: &Source) -> Result<OpenSource> {
    Ok(match source {
        Source::Udp(addr) => OpenSource::Udp(
            transport::udp::bind(*addr).with_context(|| format!("Failed to bind UDP {addr}"))?,
        ),
        Source::Serial(path) => OpenSource::Serial(
            File::open(path)
                .with_context(|| format!("Failed to open serial device {}", path.display()))?,
        ),
        Source::Replay(path) => OpenSource::Replay(
            File::open(path)
                .with_context(|| format!("Failed to open capture {}", path.display()))?,
        ),
    })
}

fn read_source(
    source: OpenSource,
    queue: &FrameQueue,
    stop: &Receiver<()>,
) -> Result<TransportSummary, TransportError> {
    match source {
        OpenSource::Udp(socket) => transport::udp::run(&socket, queue, stop),
        // A live link is joined mid-frame
        OpenSource::Serial(file) => transport::stream::run(BufReader::new(file), true, queue, stop),
        OpenSource::Replay(file) => transport::replay::run(BufReader::new(file), queue, stop),
    }
}

fn describe(source: &Source) -> String {
    match source {
        Source::Udp(addr) => format!("udp {addr}"),
        Source::Serial(path) => format!("serial {}", path.display()),
        Source::Replay(path) => format!("replay {}", path.display()),
    }
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    let source = args.source().ok_or_else(|| anyhow!("No frame source given"))?;
    let config = args.processor_config();
    let quiet = args.quiet;

    // stdout carries the event stream, so banners go to stderr
    if !quiet {
        eprintln!("hermes v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("source: {}", describe(&source));
        if let Some(ref path) = args.output {
            eprintln!("output: {}", path.display());
        }
    }

    let opened = open_source(&source)?;

    // ── Outputs ─────────────────────────────────────────────────────────
    let hub = Arc::new(SubscriberHub::new());
    let mut writers: Vec<(String, JoinHandle<io::Result<u64>>)> = Vec::new();
    if !quiet {
        let rx = hub.subscribe(SUBSCRIBER_CAPACITY);
        writers.push(("stdout".to_string(), spawn_json_lines_writer(rx, io::stdout())));
    }
    if let Some(ref path) = args.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        let rx = hub.subscribe(SUBSCRIBER_CAPACITY);
        writers.push((path.display().to_string(), spawn_json_lines_writer(rx, file)));
    }
    if writers.is_empty() {
        warn!("--quiet without --output: events are processed but not written anywhere");
    }
    let sink: Arc<dyn BroadcastSink> = hub.clone();

    // ── Processing core ─────────────────────────────────────────────────
    let (queue, frames) = frame_queue(args.queue_capacity, args.queue_policy());
    let stats = Arc::new(StatTracker::new());

    let (processor_stop_tx, processor_stop) = bounded::<()>(0);
    let processor_handle = {
        let stats = Arc::clone(&stats);
        let sink = Arc::clone(&sink);
        std::thread::spawn(move || {
            let mut processor = EventProcessor::new(&config, stats, sink);
            processor.run(&frames, &processor_stop)
        })
    };

    let (publisher_stop_tx, publisher_stop) = bounded::<()>(0);
    let publisher_handle =
        spawn_stats_publisher(Arc::clone(&stats), Arc::clone(&sink), config.stats_interval, publisher_stop);

    // ── Transport ───────────────────────────────────────────────────────
    let (transport_stop_tx, transport_stop) = bounded::<()>(0);
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel::<()>();
    let transport_handle = std::thread::spawn(move || {
        let result = read_source(opened, &queue, &transport_stop);
        // disconnects the inbound queue so the processing loop drains and exits
        drop(queue);
        let _ = done_tx.send(());
        result
    });

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let duration_limit = args.duration_limit();
    let limit = async move {
        match duration_limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(limit);

    let exit_reason = tokio::select! {
        _ = &mut done_rx => "source finished",
        _ = &mut ctrl_c => "interrupted",
        () = &mut limit => "duration limit reached",
    };
    info!("Shutting down: {exit_reason}");

    // ── Ordered shutdown ────────────────────────────────────────────────
    drop(transport_stop_tx);
    let transport_finished = exit_reason == "source finished"
        || tokio::time::timeout(TRANSPORT_GRACE, &mut done_rx).await.is_ok();

    let transport_result = if transport_finished {
        Some(transport_handle.join().map_err(|_| anyhow!("Transport thread panicked"))?)
    } else {
        // Blocked in a read that never returns; the queue stays open, so stop
        // the processing loop directly. The thread dies with the process.
        warn!("Transport did not stop within {TRANSPORT_GRACE:?}, abandoning it");
        drop(processor_stop_tx);
        None
    };

    let counters =
        processor_handle.join().map_err(|_| anyhow!("Processing thread panicked"))?;

    drop(publisher_stop_tx);
    let snapshots =
        publisher_handle.join().map_err(|_| anyhow!("Stats publisher thread panicked"))?;

    hub.close();
    drop(sink);
    let mut written = Vec::new();
    for (name, handle) in writers {
        let lines = handle
            .join()
            .map_err(|_| anyhow!("Writer thread for {name} panicked"))?
            .with_context(|| format!("Failed to write events to {name}"))?;
        written.push(format!("{name}: {lines}"));
    }

    // ── Summary ─────────────────────────────────────────────────────────
    let elapsed = started.elapsed();
    let summary = transport_result.as_ref().and_then(|r| r.as_ref().ok()).copied().unwrap_or_default();
    eprintln!(
        "\n{exit_reason}: {:.1}s, {} frames ({} queue-dropped, {} rejected, {} resyncs), \
         {} events, {} completed calls, {} decode errors ({} unknown type), \
         {} stack mismatches, {} abandoned calls, {} stats snapshots, {} hub-dropped",
        elapsed.as_secs_f64(),
        counters.frames,
        summary.queue_dropped,
        summary.rejected,
        summary.resyncs,
        counters.events_emitted,
        counters.completed_calls,
        counters.decode_errors,
        counters.unknown_types,
        counters.stack_mismatches,
        counters.abandoned_calls,
        snapshots,
        hub.dropped(),
    );
    if !written.is_empty() {
        eprintln!("written: {}", written.join(", "));
    }

    if let Some(result) = transport_result {
        result.context("Frame source failed")?;
    }
    Ok(())
}
