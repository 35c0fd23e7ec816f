//! The recursive document context sub-agent is an external collaborator
//! (out of scope per the core's §1). `act`-phase steps may still name the
//! reserved tool `context_recall_agent`; this trait is the narrow
//! interface the real sub-agent would implement, with a deterministic
//! stub as the always-available fallback.

use async_trait::async_trait;

use ayati_tools::{ToolContext, ToolResult};

pub const CONTEXT_RECALL_TOOL_NAME: &str = "context_recall_agent";

#[async_trait]
pub trait ContextRecallAgent: Send + Sync {
    async fn recall(&self, input: serde_json::Value, ctx: ToolContext) -> ToolResult;
}

/// Always-available fallback: reports recall as unavailable rather than
/// panicking or silently fabricating a result.
pub struct NullContextRecallAgent;

#[async_trait]
impl ContextRecallAgent for NullContextRecallAgent {
    async fn recall(&self, _input: serde_json::Value, _ctx: ToolContext) -> ToolResult {
        ToolResult::err("context recall is not available in this build")
    }
}
