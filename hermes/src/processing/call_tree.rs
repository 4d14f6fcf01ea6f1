//! # Call Tree Reconstruction
//!
//! Rebuilds nested function calls from the flat enter/exit stream. The device
//! emits entries in execution order over a single channel, so a LIFO stack of
//! open call ids is enough to recover parent/child links and depth.
//!
//! ## Per Entry
//!
//! - **Enter**: publish immediately, then open a call one level below the
//!   current stack top and register it as a child of that top.
//! - **Exit**: publish immediately. If the call is open, close it and emit a
//!   [`CompletedCall`] for flame graphs and statistics.
//! - **Panic**: publish. Open calls are left as they are; the device halts or
//!   reboots next.
//! - **Restart**: start a new time epoch and publish the reset cause. What
//!   happens to open calls is decided by [`RestartPolicy`].
//!
//! ## Partitioning
//!
//! Both cores of the device trace into the same channel. With
//! [`StackPartition::PerCore`] each core gets its own stack so interleaved
//! entries from the other core cannot break nesting.
//!
//! ## Stack Mismatches
//!
//! An exit must close the call on top of its stack. When it does not, the
//! condition is reported as [`ReconstructError::StackMismatch`] and the stack
//! is repaired:
//!
//! - exit for an open call buried under others: the calls above it lost their
//!   exits, they are discarded as orphans and the exit completes normally
//! - exit for a call that is not open while others are: nothing to repair,
//!   the exit is published on its own
//!
//! An enter for an id that is still open means the earlier call lost its
//! exit. That call and everything above it are discarded
//! ([`ReconstructError::ReenteredOpenCall`]) before the new call opens.

use hermes_common::{reset_reason, TraceEnterEntry, TraceExitEntry, TracePanicEntry};
use hermes_common::{TraceRestartEntry, MAX_FUNC_ARGS, TRACE_FLAME_GRAPH_ENTRY, TRACE_RESTART};
use log::{debug, info, warn};
use std::collections::HashMap;

use super::time_keeper::TimeKeeper;
use crate::decoding::{decode_args, decode_return, fixed_str, ArgValue, TagMask, TraceEntry};
use crate::domain::{CoreId, FuncCallId, HostMicros, ReconstructError};
use crate::output::{
    new_packet_id, CompletedCall, EventHeader, FormattedEnter, FormattedExit, FormattedPanic,
    FormattedRestart, OutputEvent,
};

/// Partition key used when all cores share one stack
const SHARED_PARTITION: CoreId = CoreId(u32::MAX);

/// How call stacks map onto device cores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackPartition {
    /// One stack per `core_id`
    #[default]
    PerCore,
    /// One stack for the whole device, regardless of `core_id`
    Shared,
}

/// What a device restart does to calls still open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// Discard them: their exits died with the previous boot
    #[default]
    Abandon,
    /// Keep them open across the reboot
    Retain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconstructorConfig {
    pub partition: StackPartition,
    pub restart_policy: RestartPolicy,
    pub tag_mask: TagMask,
}

/// A call that has entered but not exited yet
#[derive(Debug)]
struct ActiveCall {
    header: EventHeader,
    arg_count: u8,
    func_args: [ArgValue; MAX_FUNC_ARGS],
    func_name: String,
    start_time: HostMicros,
    depth: u32,
    parent: FuncCallId,
    children: Vec<FuncCallId>,
}

impl ActiveCall {
    fn complete(self, return_val: ArgValue, end_time: HostMicros) -> CompletedCall {
        CompletedCall {
            header: self.header,
            arg_count: self.arg_count,
            func_args: self.func_args,
            return_val,
            func_name: self.func_name,
            packet_id: new_packet_id(),
            start_time: self.start_time,
            end_time,
            depth: self.depth,
            parent_function_id: self.parent,
            child_function_ids: self.children,
        }
    }
}

/// Open calls of one partition
#[derive(Debug, Default)]
struct CallStack {
    /// Open call ids, innermost last
    calls: Vec<FuncCallId>,
    active: HashMap<FuncCallId, ActiveCall>,
}

/// Everything one entry produced, in publish order
#[derive(Debug, Default)]
pub struct Reconstruction {
    pub events: Vec<OutputEvent>,
    /// Protocol violation detected (and repaired) while applying the entry
    pub error: Option<ReconstructError>,
    /// Open calls discarded by a restart
    pub abandoned: usize,
}

impl Reconstruction {
    /// Completed calls among the produced events
    pub fn completed(&self) -> impl Iterator<Item = &CompletedCall> {
        self.events.iter().filter_map(|event| match event {
            OutputEvent::Completed(call) => Some(call),
            _ => None,
        })
    }
}

/// Call tree state, owned by the processing loop
#[derive(Debug)]
pub struct Reconstructor {
    config: ReconstructorConfig,
    time: TimeKeeper,
    stacks: HashMap<CoreId, CallStack>,
}

impl Reconstructor {
    #[must_use]
    pub fn new(config: ReconstructorConfig) -> Self {
        Self::with_time_keeper(config, TimeKeeper::new())
    }

    #[must_use]
    pub fn with_time_keeper(config: ReconstructorConfig, time: TimeKeeper) -> Self {
        Self { config, time, stacks: HashMap::new() }
    }

    #[must_use]
    pub fn time_keeper(&self) -> &TimeKeeper {
        &self.time
    }

    /// Number of open calls on `core`'s stack
    #[must_use]
    pub fn depth(&self, core: CoreId) -> usize {
        self.stacks.get(&self.partition_key(core)).map_or(0, |s| s.calls.len())
    }

    /// Open calls across all partitions
    #[must_use]
    pub fn active_calls(&self) -> usize {
        self.stacks.values().map(|s| s.active.len()).sum()
    }

    /// Apply one decoded entry
    pub fn apply(&mut self, entry: &TraceEntry) -> Reconstruction {
        match entry {
            TraceEntry::Enter(e) => self.on_enter(e),
            TraceEntry::Exit(e) => self.on_exit(e),
            TraceEntry::Panic(e) => self.on_panic(e),
            TraceEntry::Restart(e) => self.on_restart(e),
        }
    }

    fn partition_key(&self, core: CoreId) -> CoreId {
        match self.config.partition {
            StackPartition::PerCore => core,
            StackPartition::Shared => SHARED_PARTITION,
        }
    }

    fn on_enter(&mut self, entry: &TraceEnterEntry) -> Reconstruction {
        let start_time = self.time.observe(entry.header.timestamp);
        let header = EventHeader::from_wire(&entry.header, start_time);
        let func_args = decode_args(entry.func_args, entry.value_types, self.config.tag_mask);
        let func_name = fixed_str(&entry.func_name);
        let id = header.func_call_id;

        let core = header.core_id;
        let key = self.partition_key(core);
        let stack = self.stacks.entry(key).or_default();

        // The earlier call with this id lost its exit: unwind to below it
        let mut error = None;
        if stack.active.contains_key(&id) {
            let pos = stack.calls.iter().rposition(|&c| c == id).unwrap_or(stack.calls.len());
            let mut orphans = stack.calls.split_off(pos);
            if orphans.is_empty() {
                orphans.push(id);
            }
            for orphan in &orphans {
                stack.active.remove(orphan);
            }
            error = Some(ReconstructError::ReenteredOpenCall { core, call: id, orphans });
        }

        let depth = u32::try_from(stack.calls.len() + 1).unwrap_or(u32::MAX);
        let parent = stack.calls.last().copied().unwrap_or(FuncCallId::NONE);
        if let Some(parent_call) = stack.active.get_mut(&parent) {
            parent_call.children.push(id);
        }
        stack.calls.push(id);
        stack.active.insert(
            id,
            ActiveCall {
                header: EventHeader { trace_type: TRACE_FLAME_GRAPH_ENTRY, ..header.clone() },
                arg_count: entry.arg_count,
                func_args,
                func_name: func_name.clone(),
                start_time,
                depth,
                parent,
                children: Vec::new(),
            },
        );
        debug!("enter {func_name} {id} depth={depth} parent={parent}");

        Reconstruction {
            events: vec![OutputEvent::Enter(FormattedEnter {
                header,
                arg_count: entry.arg_count,
                func_args,
                func_name,
                packet_id: new_packet_id(),
            })],
            error,
            ..Reconstruction::default()
        }
    }

    fn on_exit(&mut self, entry: &TraceExitEntry) -> Reconstruction {
        let end_time = self.time.observe(entry.header.timestamp);
        let header = EventHeader::from_wire(&entry.header, end_time);
        let return_val = decode_return(entry.return_val, entry.value_types, self.config.tag_mask);
        let core = header.core_id;
        let id = header.func_call_id;

        let mut out = Reconstruction::default();
        out.events.push(OutputEvent::Exit(FormattedExit {
            header,
            return_val,
            func_name: fixed_str(&entry.func_name),
            packet_id: new_packet_id(),
        }));

        let key = self.partition_key(core);
        let stack = self.stacks.entry(key).or_default();

        let Some(call) = stack.active.remove(&id) else {
            // The enter never made it here (dropped frame, or abandoned by a restart)
            if let Some(&top) = stack.calls.last() {
                out.error = Some(ReconstructError::StackMismatch {
                    core,
                    exiting: id,
                    top: Some(top),
                    orphans: Vec::new(),
                });
            }
            return out;
        };

        match stack.calls.iter().rposition(|&c| c == id) {
            Some(pos) => {
                let orphans = stack.calls.split_off(pos + 1);
                stack.calls.pop();
                if let Some(&top) = orphans.last() {
                    for orphan in &orphans {
                        stack.active.remove(orphan);
                    }
                    out.error = Some(ReconstructError::StackMismatch {
                        core,
                        exiting: id,
                        top: Some(top),
                        orphans,
                    });
                }
            }
            None => {
                out.error = Some(ReconstructError::StackMismatch {
                    core,
                    exiting: id,
                    top: stack.calls.last().copied(),
                    orphans: Vec::new(),
                });
            }
        }

        let completed = call.complete(return_val, end_time);
        debug!("exit {} {id} took {}us", completed.func_name, completed.elapsed());
        out.events.push(OutputEvent::Completed(completed));
        out
    }

    fn on_panic(&mut self, entry: &TracePanicEntry) -> Reconstruction {
        let timestamp = self.time.observe(entry.header.timestamp);
        let exception_reason = fixed_str(&entry.exception_reason);
        warn!(
            "Device panic on core {} at pc=0x{:08x}: {exception_reason}",
            entry.header.core_id, entry.faulting_pc
        );
        Reconstruction {
            events: vec![OutputEvent::Panic(FormattedPanic {
                header: EventHeader::from_wire(&entry.header, timestamp),
                faulting_pc: entry.faulting_pc,
                exception_reason,
                packet_id: new_packet_id(),
            })],
            ..Reconstruction::default()
        }
    }

    fn on_restart(&mut self, entry: &TraceRestartEntry) -> Reconstruction {
        self.time.handle_reset();
        let timestamp = self.time.observe(entry.header.timestamp);
        let restart_reason = reset_reason(entry.restart_reason);
        info!("Device restarted: {restart_reason}");

        let abandoned = match self.config.restart_policy {
            RestartPolicy::Abandon => {
                let open = self.active_calls();
                self.stacks.clear();
                if open > 0 {
                    warn!("Restart abandoned {open} open calls");
                }
                open
            }
            RestartPolicy::Retain => 0,
        };

        Reconstruction {
            events: vec![OutputEvent::Restart(FormattedRestart {
                core_id: CoreId(entry.header.core_id),
                trace_type: TRACE_RESTART,
                restart_reason: restart_reason.to_string(),
                packet_id: new_packet_id(),
                timestamp,
            })],
            error: None,
            abandoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::fixed_bytes;
    use hermes_common::{TraceHeader, TRACE_ENTER, TRACE_EXIT, TRACE_PANIC};

    const T0: HostMicros = HostMicros(1_000_000);

    fn clock() -> HostMicros {
        T0
    }

    fn reconstructor(config: ReconstructorConfig) -> Reconstructor {
        Reconstructor::with_time_keeper(config, TimeKeeper::with_clock(clock))
    }

    fn header(trace_type: u32, core: u32, ts: u32, id: u32) -> TraceHeader {
        TraceHeader { trace_type, core_id: core, timestamp: ts, trace_id: ts, func_num_id: id }
    }

    fn enter(core: u32, ts: u32, id: u32, name: &str) -> TraceEntry {
        TraceEntry::Enter(TraceEnterEntry {
            header: header(TRACE_ENTER, core, ts, id),
            func_name: fixed_bytes(name),
            ..TraceEnterEntry::default()
        })
    }

    fn exit(core: u32, ts: u32, id: u32, name: &str) -> TraceEntry {
        TraceEntry::Exit(TraceExitEntry {
            header: header(TRACE_EXIT, core, ts, id),
            func_name: fixed_bytes(name),
            ..TraceExitEntry::default()
        })
    }

    fn restart(reason: u32) -> TraceEntry {
        TraceEntry::Restart(TraceRestartEntry {
            header: header(TRACE_RESTART, 0, 0, 0),
            restart_reason: reason,
        })
    }

    fn only_completed(r: &Reconstruction) -> &CompletedCall {
        let mut completed = r.completed();
        let call = completed.next().expect("one completed call");
        assert!(completed.next().is_none());
        call
    }

    #[test]
    fn test_nested_calls_link_parent_and_child() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        assert!(rc.apply(&enter(0, 100, 1, "outer")).error.is_none());
        assert!(rc.apply(&enter(0, 110, 2, "inner")).error.is_none());
        assert_eq!(rc.depth(CoreId(0)), 2);

        let inner_exit = rc.apply(&exit(0, 130, 2, "inner"));
        assert!(inner_exit.error.is_none());
        let inner = only_completed(&inner_exit).clone();

        let outer_exit = rc.apply(&exit(0, 150, 1, "outer"));
        assert!(outer_exit.error.is_none());
        let outer = only_completed(&outer_exit);

        assert_eq!(inner.depth, 2);
        assert_eq!(inner.parent_function_id, FuncCallId(1));
        assert!(inner.child_function_ids.is_empty());
        assert_eq!(inner.elapsed(), 20);

        assert_eq!(outer.depth, 1);
        assert_eq!(outer.parent_function_id, FuncCallId::NONE);
        assert_eq!(outer.child_function_ids, vec![FuncCallId(2)]);
        assert_eq!(outer.start_time, T0);
        assert_eq!(outer.end_time, T0.offset(50));
        assert_eq!(outer.header.trace_type, TRACE_FLAME_GRAPH_ENTRY);

        assert_eq!(rc.depth(CoreId(0)), 0);
        assert_eq!(rc.active_calls(), 0);
    }

    #[test]
    fn test_enter_and_exit_stream_before_completion() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        let r = rc.apply(&enter(0, 0, 5, "tick"));
        assert!(matches!(r.events.as_slice(), [OutputEvent::Enter(e)] if e.func_name == "tick"));

        let r = rc.apply(&exit(0, 4, 5, "tick"));
        assert!(matches!(
            r.events.as_slice(),
            [OutputEvent::Exit(_), OutputEvent::Completed(_)]
        ));
    }

    #[test]
    fn test_siblings_are_appended_in_order() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 1, "main"));
        for (id, ts) in [(2, 10), (3, 20), (4, 30)] {
            rc.apply(&enter(0, ts, id, "child"));
            rc.apply(&exit(0, ts + 5, id, "child"));
        }
        let r = rc.apply(&exit(0, 40, 1, "main"));
        let main = only_completed(&r);
        assert_eq!(main.child_function_ids, vec![FuncCallId(2), FuncCallId(3), FuncCallId(4)]);
    }

    #[test]
    fn test_exit_without_open_call_is_mismatch() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 1, "a"));
        let r = rc.apply(&exit(0, 5, 2, "b"));

        assert_eq!(
            r.error,
            Some(ReconstructError::StackMismatch {
                core: CoreId(0),
                exiting: FuncCallId(2),
                top: Some(FuncCallId(1)),
                orphans: Vec::new(),
            })
        );
        // only the streaming exit goes out, the open call is untouched
        assert!(matches!(r.events.as_slice(), [OutputEvent::Exit(_)]));
        assert_eq!(rc.depth(CoreId(0)), 1);
    }

    #[test]
    fn test_stray_exit_on_empty_stack_is_silent() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        let r = rc.apply(&exit(0, 5, 9, "late"));
        assert!(r.error.is_none());
        assert_eq!(r.events.len(), 1);
    }

    #[test]
    fn test_buried_exit_discards_orphans_and_completes() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 1, "a"));
        rc.apply(&enter(0, 1, 2, "b"));
        rc.apply(&enter(0, 2, 3, "c"));

        // exits for 3 and 2 were lost
        let r = rc.apply(&exit(0, 10, 1, "a"));
        assert_eq!(
            r.error,
            Some(ReconstructError::StackMismatch {
                core: CoreId(0),
                exiting: FuncCallId(1),
                top: Some(FuncCallId(3)),
                orphans: vec![FuncCallId(2), FuncCallId(3)],
            })
        );
        let a = only_completed(&r);
        assert_eq!(a.child_function_ids, vec![FuncCallId(2)]);
        assert_eq!(rc.depth(CoreId(0)), 0);
        assert_eq!(rc.active_calls(), 0);

        // stack is usable again
        rc.apply(&enter(0, 20, 4, "d"));
        let r = rc.apply(&exit(0, 25, 4, "d"));
        assert!(r.error.is_none());
        assert_eq!(only_completed(&r).depth, 1);
    }

    #[test]
    fn test_reentered_open_call_discards_stale_entry() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 6, "outer"));
        rc.apply(&enter(0, 1, 7, "poll"));
        rc.apply(&enter(0, 2, 9, "read"));

        // the first poll (and read above it) never exited
        let r = rc.apply(&enter(0, 5, 7, "poll"));
        assert_eq!(
            r.error,
            Some(ReconstructError::ReenteredOpenCall {
                core: CoreId(0),
                call: FuncCallId(7),
                orphans: vec![FuncCallId(7), FuncCallId(9)],
            })
        );
        assert_eq!(rc.depth(CoreId(0)), 2);
        assert_eq!(rc.active_calls(), 2);

        let r = rc.apply(&exit(0, 8, 7, "poll"));
        assert!(r.error.is_none());
        let poll = only_completed(&r);
        assert_eq!(poll.depth, 2);
        assert_eq!(poll.parent_function_id, FuncCallId(6));
        assert!(poll.child_function_ids.is_empty());
        assert_eq!(poll.elapsed(), 3);

        let r = rc.apply(&exit(0, 9, 6, "outer"));
        assert!(r.error.is_none());
        assert_eq!(rc.depth(CoreId(0)), 0);
        assert_eq!(rc.active_calls(), 0);

        // later calls are top level again, with no phantom parent
        rc.apply(&enter(0, 20, 8, "fresh"));
        let r = rc.apply(&exit(0, 21, 8, "fresh"));
        let fresh = only_completed(&r);
        assert_eq!(fresh.depth, 1);
        assert_eq!(fresh.parent_function_id, FuncCallId::NONE);
    }

    #[test]
    fn test_reentered_top_call_self_heals() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 7, "tick"));
        let r = rc.apply(&enter(0, 1, 7, "tick"));
        assert!(matches!(r.error, Some(ReconstructError::ReenteredOpenCall { .. })));

        let r = rc.apply(&exit(0, 2, 7, "tick"));
        assert!(r.error.is_none());
        assert_eq!(only_completed(&r).depth, 1);
        assert_eq!(rc.depth(CoreId(0)), 0);
        assert_eq!(rc.active_calls(), 0);
    }

    #[test]
    fn test_cores_have_independent_stacks() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 1, "core0_task"));
        rc.apply(&enter(1, 1, 100, "core1_task"));
        rc.apply(&enter(0, 2, 2, "core0_leaf"));

        // core 1 finishes while core 0 is two deep
        let r = rc.apply(&exit(1, 3, 100, "core1_task"));
        assert!(r.error.is_none());
        assert_eq!(only_completed(&r).depth, 1);
        assert_eq!(only_completed(&r).parent_function_id, FuncCallId::NONE);

        let r = rc.apply(&exit(0, 4, 2, "core0_leaf"));
        assert!(r.error.is_none());
        assert_eq!(only_completed(&r).parent_function_id, FuncCallId(1));
    }

    #[test]
    fn test_shared_partition_interleaves_cores() {
        let config =
            ReconstructorConfig { partition: StackPartition::Shared, ..ReconstructorConfig::default() };
        let mut rc = reconstructor(config);
        rc.apply(&enter(0, 0, 1, "core0_task"));
        rc.apply(&enter(1, 1, 100, "core1_task"));
        assert_eq!(rc.depth(CoreId(0)), 2);

        let r = rc.apply(&exit(1, 3, 100, "core1_task"));
        let call = only_completed(&r);
        assert_eq!(call.depth, 2);
        assert_eq!(call.parent_function_id, FuncCallId(1));
    }

    #[test]
    fn test_restart_abandons_open_calls_by_default() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 500, 1, "a"));
        rc.apply(&enter(1, 510, 2, "b"));

        let r = rc.apply(&restart(3));
        assert_eq!(r.abandoned, 2);
        assert_eq!(rc.active_calls(), 0);
        let [OutputEvent::Restart(event)] = r.events.as_slice() else {
            panic!("expected a single restart event");
        };
        assert_eq!(event.restart_reason, "Software reset via esp_restart");
        assert_eq!(event.timestamp, T0);
        assert!(!event.packet_id.is_empty());

        // the exit from the previous boot no longer completes anything
        let r = rc.apply(&exit(0, 20, 1, "a"));
        assert_eq!(r.completed().count(), 0);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_restart_can_retain_open_calls() {
        let config = ReconstructorConfig {
            restart_policy: RestartPolicy::Retain,
            ..ReconstructorConfig::default()
        };
        let mut rc = reconstructor(config);
        rc.apply(&enter(0, 500, 1, "a"));
        let r = rc.apply(&restart(1));
        assert_eq!(r.abandoned, 0);
        assert_eq!(rc.active_calls(), 1);
        assert_eq!(rc.apply(&exit(0, 20, 1, "a")).completed().count(), 1);
    }

    #[test]
    fn test_restart_rebases_time() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 1_000, 1, "a"));
        rc.apply(&restart(99));
        assert!(rc.time_keeper().is_synced());

        let r = rc.apply(&enter(0, 42, 2, "b"));
        let [OutputEvent::Enter(e)] = r.events.as_slice() else {
            panic!("expected enter");
        };
        // the restart entry (device ts 0) pinned the new epoch
        assert_eq!(e.header.timestamp, T0.offset(42));
    }

    #[test]
    fn test_unknown_reset_reason_is_not_an_error() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        let r = rc.apply(&restart(1234));
        assert!(r.error.is_none());
        let [OutputEvent::Restart(event)] = r.events.as_slice() else {
            panic!("expected restart");
        };
        assert_eq!(event.restart_reason, "Invalid reset reason");
    }

    #[test]
    fn test_panic_leaves_stack_alone() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        rc.apply(&enter(0, 0, 1, "a"));
        let r = rc.apply(&TraceEntry::Panic(TracePanicEntry {
            header: header(TRACE_PANIC, 0, 3, 1),
            faulting_pc: 0x400d_0000,
            exception_reason: fixed_bytes("StoreProhibited"),
        }));
        let [OutputEvent::Panic(p)] = r.events.as_slice() else {
            panic!("expected panic");
        };
        assert_eq!(p.exception_reason, "StoreProhibited");
        assert_eq!(p.faulting_pc, 0x400d_0000);
        assert_eq!(rc.depth(CoreId(0)), 1);
    }

    #[test]
    fn test_enter_decodes_arguments() {
        let mut rc = reconstructor(ReconstructorConfig::default());
        let entry = TraceEntry::Enter(TraceEnterEntry {
            header: header(TRACE_ENTER, 0, 0, 1),
            // slot 0 signed, slot 1 float
            value_types: 0b01_10,
            arg_count: 2,
            func_args: [0xFFFF_FFFF, 0x3F80_0000, 0, 0],
            func_name: fixed_bytes("mix"),
            ..TraceEnterEntry::default()
        });
        let r = rc.apply(&entry);
        let [OutputEvent::Enter(e)] = r.events.as_slice() else {
            panic!("expected enter");
        };
        assert_eq!(e.func_args[0], ArgValue::Signed(-1));
        assert_eq!(e.func_args[1], ArgValue::Float(1.0));
        assert_eq!(e.arg_count, 2);
    }
}
