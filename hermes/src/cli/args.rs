//! CLI argument definitions

use clap::{ArgGroup, Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::decoding::TagMask;
use crate::processing::{ProcessorConfig, ReconstructorConfig, RestartPolicy, StackPartition};
use crate::transport::{QueuePolicy, DEFAULT_QUEUE_CAPACITY};

#[derive(Parser, Debug)]
#[command(
    name = "hermes",
    about = "Decode and republish function-call traces from an embedded device",
    group(ArgGroup::new("source").required(true).args(["udp", "serial", "replay"])),
    after_help = "\
EXAMPLES:
    hermes --udp 0.0.0.0:9000                  Listen for trace datagrams
    hermes --serial /dev/ttyUSB0 -o run.jsonl  Read a serial link, also write to a file
    hermes --replay capture.bin --quiet        Replay a capture of raw frames"
)]
pub struct Args {
    /// Receive one frame per UDP datagram on this address
    #[arg(long, value_name = "ADDR")]
    pub udp: Option<SocketAddr>,

    /// Read \r\n-terminated frames from a serial device node (configure it first, e.g. with stty)
    #[arg(long, value_name = "PATH")]
    pub serial: Option<PathBuf>,

    /// Replay a capture file of back-to-back raw frames
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,

    /// Also write events as JSON lines to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Seconds between function statistics snapshots
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub stats_interval: u64,

    /// Inbound frame queue capacity
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// What to do when the inbound queue is full
    #[arg(long, value_enum, default_value_t = QueuePolicyArg::Block)]
    pub queue_policy: QueuePolicyArg,

    /// Use one call stack for both cores instead of one per core
    #[arg(long)]
    pub shared_call_stack: bool,

    /// Keep open calls across a device restart instead of abandoning them
    #[arg(long)]
    pub retain_on_restart: bool,

    /// Only honor the two defined value tag bits
    #[arg(long)]
    pub strict_value_tags: bool,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Don't print events to stdout
    #[arg(short, long)]
    pub quiet: bool,
}

/// `--queue-policy` values
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueuePolicyArg {
    Block,
    DropOldest,
}

impl From<QueuePolicyArg> for QueuePolicy {
    fn from(arg: QueuePolicyArg) -> Self {
        match arg {
            QueuePolicyArg::Block => QueuePolicy::Block,
            QueuePolicyArg::DropOldest => QueuePolicy::DropOldest,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Udp(SocketAddr),
    Serial(PathBuf),
    Replay(PathBuf),
}

impl Args {
    /// The selected frame source
    ///
    /// Returns `None` only if clap's required group was bypassed.
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        if let Some(addr) = self.udp {
            Some(Source::Udp(addr))
        } else if let Some(path) = &self.serial {
            Some(Source::Serial(path.clone()))
        } else {
            self.replay.clone().map(Source::Replay)
        }
    }

    /// Processing core configuration from the flags
    #[must_use]
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            reconstructor: ReconstructorConfig {
                partition: if self.shared_call_stack {
                    StackPartition::Shared
                } else {
                    StackPartition::PerCore
                },
                restart_policy: if self.retain_on_restart {
                    RestartPolicy::Retain
                } else {
                    RestartPolicy::Abandon
                },
                tag_mask: if self.strict_value_tags { TagMask::Strict } else { TagMask::Legacy },
            },
            stats_interval: Duration::from_secs(self.stats_interval),
        }
    }

    #[must_use]
    pub fn queue_policy(&self) -> QueuePolicy {
        self.queue_policy.into()
    }

    /// Run time limit, `None` when unlimited
    #[must_use]
    pub fn duration_limit(&self) -> Option<Duration> {
        (self.duration > 0).then(|| Duration::from_secs(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_defaults_match_processor_defaults() {
        let args = Args::try_parse_from(["hermes", "--replay", "capture.bin"]).unwrap();
        assert_eq!(args.source(), Some(Source::Replay(PathBuf::from("capture.bin"))));
        assert_eq!(args.processor_config(), ProcessorConfig::default());
        assert_eq!(args.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(args.queue_policy(), QueuePolicy::Block);
        assert_eq!(args.duration_limit(), None);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let args = Args::try_parse_from([
            "hermes",
            "--udp",
            "127.0.0.1:9000",
            "--shared-call-stack",
            "--retain-on-restart",
            "--strict-value-tags",
            "--stats-interval",
            "2",
            "--queue-policy",
            "drop-oldest",
            "--duration",
            "30",
        ])
        .unwrap();

        let config = args.processor_config();
        assert_eq!(config.reconstructor.partition, StackPartition::Shared);
        assert_eq!(config.reconstructor.restart_policy, RestartPolicy::Retain);
        assert_eq!(config.reconstructor.tag_mask, TagMask::Strict);
        assert_eq!(config.stats_interval, Duration::from_secs(2));
        assert_eq!(args.queue_policy(), QueuePolicy::DropOldest);
        assert_eq!(args.duration_limit(), Some(Duration::from_secs(30)));
        assert!(matches!(args.source(), Some(Source::Udp(_))));
    }

    #[test]
    fn test_exactly_one_source_required() {
        let missing = Args::try_parse_from(["hermes"]).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);

        let both = Args::try_parse_from(["hermes", "--replay", "a", "--serial", "b"]).unwrap_err();
        assert_eq!(both.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_zero_stats_interval_rejected() {
        assert!(Args::try_parse_from(["hermes", "--replay", "a", "--stats-interval", "0"]).is_err());
    }
}
