//! Device → host time synchronization
//!
//! The device timer counts microseconds since boot and restarts from zero on
//! every reset. The first timestamp seen in a boot is pinned to a host
//! wall-clock baseline; later timestamps are placed relative to it.
//!
//! ```text
//! host = host_baseline + (device_ts - device_baseline)
//! ```
//!
//! Only the processing loop touches this, so there is no locking.

use crate::domain::HostMicros;

/// Maps device timestamps onto the host timeline
#[derive(Debug)]
pub struct TimeKeeper {
    host_baseline: HostMicros,
    /// `None` until the first timestamp of the current device boot
    device_baseline: Option<u32>,
    clock: fn() -> HostMicros,
}

impl Default for TimeKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeKeeper {
    /// Baseline at the current wall-clock time
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(HostMicros::now)
    }

    /// Use `clock` for the initial baseline and for every reset
    #[must_use]
    pub fn with_clock(clock: fn() -> HostMicros) -> Self {
        Self { host_baseline: clock(), device_baseline: None, clock }
    }

    /// Whether a device baseline has been pinned for the current boot
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.device_baseline.is_some()
    }

    #[must_use]
    pub fn host_baseline(&self) -> HostMicros {
        self.host_baseline
    }

    /// Convert a device timestamp, pinning the device baseline if unsynced
    pub fn observe(&mut self, device_ts: u32) -> HostMicros {
        let baseline = *self.device_baseline.get_or_insert(device_ts);
        self.host_baseline.offset(i64::from(device_ts) - i64::from(baseline))
    }

    /// The device rebooted: its timer restarted, so start a new epoch now
    pub fn handle_reset(&mut self) {
        self.device_baseline = None;
        self.host_baseline = (self.clock)();
    }
}
