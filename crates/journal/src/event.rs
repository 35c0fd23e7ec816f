//! The session event model.
//!
//! The writer always emits `v=2`. A `v=1` line carries the same fields
//! except `session_path`, which is filled in on read from the legacy
//! convention `sessions/legacy/{session_id}.md` (see `codec::upgrade_v1`).
//! This is the single canonical schema going forward; no further version
//! bumps are expected without a matching upgrade path here.

use serde::{Deserialize, Serialize};

use ayati_domain::ids::{OperationId, RunId, SessionId, StepId, ToolCallId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    ProcessingStarted,
    ResponseStarted,
    ResponseCompleted,
    ResponseFailed,
    SessionSwitched,
    ActivitySwitched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStepPhase {
    Reason,
    Act,
    Verify,
    Reflect,
    Feedback,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndStatus {
    Solved,
    Stuck,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLedgerState {
    Started,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseSource {
    Agent,
    System,
    User,
}

/// One line of a session journal file. `v` is the schema discriminator
/// (always 2 on write); `event` is the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub v: u8,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub session_id: SessionId,
    pub session_path: String,
    #[serde(flatten)]
    pub event: EventBody,
}

impl SessionEvent {
    pub fn new(session_id: SessionId, session_path: impl Into<String>, event: EventBody) -> Self {
        Self {
            v: 2,
            timestamp: chrono::Utc::now(),
            session_id,
            session_path: session_path.into(),
            event,
        }
    }

    /// Whether this event counts toward the prompt memory window.
    pub fn is_countable(&self) -> bool {
        matches!(self.event, EventBody::UserMessage { .. } | EventBody::AssistantMessage { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventBody {
    SessionOpen {
        client_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_session_id: Option<SessionId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        handoff_summary: Option<String>,
    },
    SessionClose {
        reason: String,
        token_at_close: u64,
        event_count: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        handoff_summary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_session_id: Option<SessionId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_session_path: Option<String>,
    },
    UserMessage {
        content: String,
    },
    AssistantMessage {
        content: String,
    },
    AssistantFeedback {
        message: String,
    },
    TurnStatus {
        status: TurnStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    ToolCall {
        step_id: StepId,
        tool_call_id: ToolCallId,
        tool_name: String,
        args: serde_json::Value,
    },
    ToolResult {
        step_id: StepId,
        tool_call_id: ToolCallId,
        tool_name: String,
        status: ToolResultStatus,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    RunFailure {
        message: String,
    },
    AgentStep {
        step: StepId,
        phase: AgentStepPhase,
        summary: String,
        approaches_tried: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action_tool_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_status: Option<EndStatus>,
    },
    RunLedger {
        run_id: RunId,
        run_path: String,
        state: RunLedgerState,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    TaskSummary {
        run_id: RunId,
        run_path: String,
        status: String,
        summary: String,
    },
}

// Referenced by guardrail confirmation slots — kept here since events are
// the natural place an operation id shows up in the audit trail.
pub type ConfirmationOperationId = OperationId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_is_countable() {
        let e = SessionEvent::new(
            SessionId::new(),
            "sessions/2026/03/01/x.md",
            EventBody::UserMessage { content: "hi".into() },
        );
        assert!(e.is_countable());
    }

    #[test]
    fn tool_call_is_not_countable() {
        let e = SessionEvent::new(
            SessionId::new(),
            "sessions/2026/03/01/x.md",
            EventBody::ToolCall {
                step_id: StepId(1),
                tool_call_id: "c1".into(),
                tool_name: "shell.exec".into(),
                args: serde_json::json!({}),
            },
        );
        assert!(!e.is_countable());
    }

    #[test]
    fn round_trips_through_json() {
        let e = SessionEvent::new(
            SessionId::new(),
            "sessions/2026/03/01/x.md",
            EventBody::AssistantMessage { content: "hello".into() },
        );
        let json = serde_json::to_string(&e).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, e.session_id);
        assert!(back.is_countable());
    }
}
