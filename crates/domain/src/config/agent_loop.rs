use serde::{Deserialize, Serialize};

/// §4.F agent step loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopConfig {
    /// Base step budget before any tool calls.
    #[serde(default = "d_base_step_limit")]
    pub base_step_limit: u32,
    /// Additional steps granted per tool call made so far.
    #[serde(default = "d_step_limit_per_tool")]
    pub step_limit_per_tool: u32,
    /// Hard ceiling on the effective step limit regardless of tool calls.
    #[serde(default = "d_max_step_limit")]
    pub max_step_limit: u32,
    /// Consecutive non-`act` steps (reason/verify/reflect) before the loop
    /// aborts as stuck.
    #[serde(default = "d_no_progress_limit")]
    pub no_progress_limit: u32,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            base_step_limit: d_base_step_limit(),
            step_limit_per_tool: d_step_limit_per_tool(),
            max_step_limit: d_max_step_limit(),
            no_progress_limit: d_no_progress_limit(),
        }
    }
}

impl AgentLoopConfig {
    /// `min(base + tool_calls_made * per_tool, max)`.
    pub fn effective_limit(&self, tool_calls_made: u32) -> u32 {
        (self.base_step_limit + tool_calls_made * self.step_limit_per_tool)
            .min(self.max_step_limit)
    }
}

fn d_base_step_limit() -> u32 {
    14
}
fn d_step_limit_per_tool() -> u32 {
    1
}
fn d_max_step_limit() -> u32 {
    30
}
fn d_no_progress_limit() -> u32 {
    5
}
