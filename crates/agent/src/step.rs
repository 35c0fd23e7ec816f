//! The `agent_step` tool payload, scratchpad entries, and per-run state.
//!
//! `AgentStepPhase`/`EndStatus` are the journal's own enums
//! (`ayati_journal::event`) — the scratchpad protocol and the audit trail
//! share one vocabulary rather than two enums that drift apart.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use ayati_domain::ids::StepId;
pub use ayati_journal::event::{AgentStepPhase, EndStatus};

/// The action an `act`-phase step wants performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStepAction {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
}

/// `{phase, thinking, summary, action?, approaches_tried?, feedback_message?,
/// end_message?, end_status}` — constructed by the LLM via the synthetic
/// `agent_step` tool, validated, appended to the scratchpad, then
/// discarded after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStepInput {
    pub phase: AgentStepPhase,
    #[serde(default)]
    pub thinking: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub action: Option<AgentStepAction>,
    #[serde(default)]
    pub approaches_tried: Vec<String>,
    #[serde(default)]
    pub feedback_message: Option<String>,
    #[serde(default)]
    pub end_message: Option<String>,
    #[serde(default)]
    pub end_status: Option<EndStatus>,
}

impl AgentStepInput {
    /// Required-field validation per phase; the shape is otherwise
    /// optional-heavy so a malformed `act` with no `action` or a malformed
    /// `end` with no `end_message` is rejected before it reaches the loop.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.summary.trim().is_empty() {
            return Err("summary is required");
        }
        match self.phase {
            AgentStepPhase::Act if self.action.is_none() => Err("act phase requires an action"),
            AgentStepPhase::Feedback if self.feedback_message.is_none() => Err("feedback phase requires feedback_message"),
            AgentStepPhase::End if self.end_message.is_none() || self.end_status.is_none() => {
                Err("end phase requires end_message and end_status")
            }
            _ => Ok(()),
        }
    }
}

/// `{step, phase, thinking?, summary, tool_result?}` — the in-loop,
/// in-prompt record of one step's reasoning and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    pub step: StepId,
    pub phase: AgentStepPhase,
    #[serde(default)]
    pub thinking: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub tool_result: Option<String>,
}

/// Local-to-one-run state; never persisted.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub step: u32,
    pub scratchpad: Vec<ScratchpadEntry>,
    pub approaches_tried: BTreeSet<String>,
    pub tool_calls_made: u32,
    pub consecutive_non_act_steps: u32,
}

impl RunState {
    pub fn push_scratchpad(&mut self, entry: ScratchpadEntry) {
        self.scratchpad.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn act_without_action_is_invalid() {
        let input = AgentStepInput {
            phase: AgentStepPhase::Act,
            thinking: None,
            summary: "try something".into(),
            action: None,
            approaches_tried: vec![],
            feedback_message: None,
            end_message: None,
            end_status: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn end_requires_message_and_status() {
        let input = AgentStepInput {
            phase: AgentStepPhase::End,
            thinking: None,
            summary: "done".into(),
            action: None,
            approaches_tried: vec![],
            feedback_message: None,
            end_message: Some("Done.".into()),
            end_status: Some(EndStatus::Solved),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_summary_is_invalid() {
        let input = AgentStepInput {
            phase: AgentStepPhase::Reason,
            thinking: None,
            summary: "   ".into(),
            action: None,
            approaches_tried: vec![],
            feedback_message: None,
            end_message: None,
            end_status: None,
        };
        assert!(input.validate().is_err());
    }
}
