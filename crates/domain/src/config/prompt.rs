use serde::{Deserialize, Serialize};

/// §4.H prompt assembly / token estimator tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// UTF-8 bytes treated as roughly one token.
    #[serde(default = "d_bytes_per_token")]
    pub bytes_per_token: u64,
    #[serde(default = "d_per_message_overhead")]
    pub per_message_overhead_tokens: u64,
    #[serde(default = "d_per_tool_overhead")]
    pub per_tool_overhead_tokens: u64,
    #[serde(default = "d_per_request_overhead")]
    pub per_request_overhead_tokens: u64,
    /// Latest user/assistant turn pairs kept in the prompt memory window.
    #[serde(default = "d_prompt_event_window")]
    pub prompt_event_window: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            bytes_per_token: d_bytes_per_token(),
            per_message_overhead_tokens: d_per_message_overhead(),
            per_tool_overhead_tokens: d_per_tool_overhead(),
            per_request_overhead_tokens: d_per_request_overhead(),
            prompt_event_window: d_prompt_event_window(),
        }
    }
}

fn d_bytes_per_token() -> u64 {
    4
}
fn d_per_message_overhead() -> u64 {
    4
}
fn d_per_tool_overhead() -> u64 {
    8
}
fn d_per_request_overhead() -> u64 {
    3
}
fn d_prompt_event_window() -> usize {
    20
}
