//! The consumed LLM provider contract.
//!
//! Provider adapters themselves are out of scope for this core (§1) — the
//! crate ships the trait and exactly one concrete implementation,
//! [`ScriptedProvider`], a deterministic playback double used by tests and
//! the `ayati-cli` harness.

use async_trait::async_trait;

use ayati_domain::tool::{Message, ToolCall, ToolDefinition};

/// One LLM turn's outcome: either the model answered directly, or it
/// wants one or more tool calls dispatched before it continues.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Assistant { content: String },
    ToolCalls { calls: Vec<ToolCall>, assistant_content: Option<String> },
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_turn(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<TurnOutcome, String>;

    /// Best-effort exact input token count; `None` means the caller should
    /// fall back to the local estimator.
    async fn count_input_tokens(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> Option<u64> {
        None
    }
}

/// A fixed sequence of [`TurnOutcome`]s played back in order, one per
/// `generate_turn` call. Exhausting the script is a test/harness bug, not
/// a runtime condition — `generate_turn` returns an `Err` describing it
/// rather than fabricating a plausible-looking turn.
pub struct ScriptedProvider {
    turns: parking_lot::Mutex<std::collections::VecDeque<TurnOutcome>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<TurnOutcome>) -> Self {
        Self { turns: parking_lot::Mutex::new(turns.into()) }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate_turn(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> Result<TurnOutcome, String> {
        self.turns.lock().pop_front().ok_or_else(|| "ScriptedProvider: script exhausted".to_string())
    }
}
