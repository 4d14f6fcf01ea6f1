//! Event shapes published to subscribers
//!
//! Field names are the JSON contract with the dashboard. Every record gets a
//! fresh packet id so subscribers can key list rendering and deduplicate.
//! Timestamps are microsecond strings (see [`HostMicros`]).

use hermes_common::{TraceHeader, MAX_FUNC_ARGS, TRACE_FLAME_GRAPH_ENTRY, TRACE_STAT_UPDATES};
use serde::Serialize;

use crate::decoding::ArgValue;
use crate::domain::{CoreId, FuncCallId, HostMicros};

/// Generate a unique id for an emitted record
#[must_use]
pub fn new_packet_id() -> String {
    xid::new().to_string()
}

/// Fields shared by enter, exit, panic and completed-call records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    pub trace_type: u32,
    pub core_id: CoreId,
    pub timestamp: HostMicros,
    pub trace_id: u32,
    #[serde(rename = "funcCallId")]
    pub func_call_id: FuncCallId,
}

impl EventHeader {
    /// Copy a wire header, replacing the device timestamp with host time
    #[must_use]
    pub fn from_wire(header: &TraceHeader, timestamp: HostMicros) -> Self {
        Self {
            trace_type: header.trace_type,
            core_id: CoreId(header.core_id),
            timestamp,
            trace_id: header.trace_id,
            func_call_id: FuncCallId(header.func_num_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedEnter {
    #[serde(flatten)]
    pub header: EventHeader,
    pub arg_count: u8,
    pub func_args: [ArgValue; MAX_FUNC_ARGS],
    pub func_name: String,
    pub packet_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedExit {
    #[serde(flatten)]
    pub header: EventHeader,
    pub return_val: ArgValue,
    pub func_name: String,
    pub packet_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPanic {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(rename = "faultingPC")]
    pub faulting_pc: u32,
    pub exception_reason: String,
    pub packet_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedRestart {
    pub core_id: CoreId,
    pub trace_type: u32,
    pub restart_reason: String,
    pub packet_id: String,
    pub timestamp: HostMicros,
}

/// A finished call with its place in the call tree (flame graph input)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCall {
    #[serde(flatten)]
    pub header: EventHeader,
    pub arg_count: u8,
    pub func_args: [ArgValue; MAX_FUNC_ARGS],
    pub return_val: ArgValue,
    pub func_name: String,
    pub packet_id: String,
    pub start_time: HostMicros,
    pub end_time: HostMicros,
    /// 1 for a top-level call
    pub depth: u32,
    /// [`FuncCallId::NONE`] for a top-level call
    pub parent_function_id: FuncCallId,
    pub child_function_ids: Vec<FuncCallId>,
}

impl CompletedCall {
    /// Run time in microseconds
    #[must_use]
    pub fn elapsed(&self) -> i64 {
        self.end_time.since(self.start_time)
    }

    #[must_use]
    pub fn call_id(&self) -> FuncCallId {
        self.header.func_call_id
    }
}

/// One row of a stats snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatsEntry {
    pub func_name: String,
    pub calls_made: i64,
    /// Microseconds
    pub average_run_time: f64,
    /// Microseconds
    pub max_run_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatPacket {
    pub trace_type: u32,
    pub stat_map: Vec<FunctionStatsEntry>,
}

impl StatPacket {
    #[must_use]
    pub fn new(stat_map: Vec<FunctionStatsEntry>) -> Self {
        Self { trace_type: TRACE_STAT_UPDATES, stat_map }
    }
}

/// Anything the pipeline publishes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputEvent {
    Enter(FormattedEnter),
    Exit(FormattedExit),
    Panic(FormattedPanic),
    Restart(FormattedRestart),
    Completed(CompletedCall),
    Stats(StatPacket),
}

impl OutputEvent {
    /// The `traceType` subscribers dispatch on
    #[must_use]
    pub fn trace_type(&self) -> u32 {
        match self {
            OutputEvent::Enter(e) => e.header.trace_type,
            OutputEvent::Exit(e) => e.header.trace_type,
            OutputEvent::Panic(e) => e.header.trace_type,
            OutputEvent::Restart(e) => e.trace_type,
            OutputEvent::Completed(_) => TRACE_FLAME_GRAPH_ENTRY,
            OutputEvent::Stats(s) => s.trace_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_common::{TRACE_ENTER, TRACE_PANIC, TRACE_RESTART};
    use serde_json::json;

    fn header(trace_type: u32) -> EventHeader {
        EventHeader {
            trace_type,
            core_id: CoreId(1),
            timestamp: HostMicros(1_000),
            trace_id: 3,
            func_call_id: FuncCallId(8),
        }
    }

    #[test]
    fn test_enter_json_shape() {
        let event = OutputEvent::Enter(FormattedEnter {
            header: header(TRACE_ENTER),
            arg_count: 1,
            func_args: [ArgValue::Signed(-1), ArgValue::default(), ArgValue::default(), ArgValue::default()],
            func_name: "blink".to_string(),
            packet_id: "id".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "traceType": 0,
                "coreId": 1,
                "timestamp": "1000",
                "traceId": 3,
                "funcCallId": 8,
                "argCount": 1,
                "funcArgs": [-1, 0, 0, 0],
                "funcName": "blink",
                "packetId": "id",
            })
        );
    }

    #[test]
    fn test_panic_uses_faulting_pc_key() {
        let event = OutputEvent::Panic(FormattedPanic {
            header: header(TRACE_PANIC),
            faulting_pc: 0x400d_1234,
            exception_reason: "LoadProhibited".to_string(),
            packet_id: "id".to_string(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["faultingPC"], 0x400d_1234);
        assert_eq!(value["exceptionReason"], "LoadProhibited");
    }

    #[test]
    fn test_restart_json_shape() {
        let event = OutputEvent::Restart(FormattedRestart {
            core_id: CoreId(0),
            trace_type: TRACE_RESTART,
            restart_reason: "Power-on reset".to_string(),
            packet_id: "id".to_string(),
            timestamp: HostMicros(5),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "coreId": 0,
                "traceType": 3,
                "restartReason": "Power-on reset",
                "packetId": "id",
                "timestamp": "5",
            })
        );
    }

    #[test]
    fn test_completed_call_shape_and_elapsed() {
        let call = CompletedCall {
            header: header(TRACE_FLAME_GRAPH_ENTRY),
            arg_count: 0,
            func_args: [ArgValue::default(); MAX_FUNC_ARGS],
            return_val: ArgValue::Float(0.5),
            func_name: "work".to_string(),
            packet_id: "id".to_string(),
            start_time: HostMicros(100),
            end_time: HostMicros(130),
            depth: 1,
            parent_function_id: FuncCallId::NONE,
            child_function_ids: Vec::new(),
        };
        assert_eq!(call.elapsed(), 30);
        let value = serde_json::to_value(OutputEvent::Completed(call)).unwrap();
        assert_eq!(value["traceType"], 4);
        assert_eq!(value["startTime"], "100");
        assert_eq!(value["endTime"], "130");
        assert_eq!(value["parentFunctionId"], 0);
        assert_eq!(value["childFunctionIds"], json!([]));
        assert_eq!(value["returnVal"], 0.5);
    }

    #[test]
    fn test_stat_packet_shape() {
        let packet = OutputEvent::Stats(StatPacket::new(vec![FunctionStatsEntry {
            func_name: "foo".to_string(),
            calls_made: 3,
            average_run_time: 20.0,
            max_run_time: 30,
        }]));
        assert_eq!(packet.trace_type(), TRACE_STAT_UPDATES);
        assert_eq!(
            serde_json::to_value(&packet).unwrap(),
            json!({
                "traceType": 5,
                "statMap": [{
                    "funcName": "foo",
                    "callsMade": 3,
                    "averageRunTime": 20.0,
                    "maxRunTime": 30,
                }],
            })
        );
    }

    #[test]
    fn test_packet_ids_are_unique() {
        assert_ne!(new_packet_id(), new_packet_id());
        assert_eq!(new_packet_id().len(), 20);
    }
}
