//! Processing core
//!
//! Everything between a decoded frame and a published event:
//! - `time_keeper`: device ticks to host time, across device reboots
//! - `call_tree`: call stack reconstruction
//! - `stats`: per-function running statistics and their publisher
//! - `event_processor`: the loop that drives the above from the inbound queue

pub mod call_tree;
pub mod event_processor;
pub mod stats;
pub mod time_keeper;

pub use call_tree::{Reconstruction, Reconstructor, ReconstructorConfig, RestartPolicy, StackPartition};
pub use event_processor::{EventProcessor, ProcessingCounters, ProcessorConfig};
pub use stats::{spawn_stats_publisher, FunctionStats, StatTracker, DEFAULT_STATS_INTERVAL};
pub use time_keeper::TimeKeeper;
