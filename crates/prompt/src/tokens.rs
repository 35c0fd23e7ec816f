//! Deterministic local token estimator: 4 UTF-8 bytes ≈ 1 token,
//! plus fixed per-message, per-tool, and per-request overheads.

use ayati_domain::config::PromptConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBreakdown {
    pub message_tokens: u64,
    pub tool_schema_tokens: u64,
    pub total: u64,
}

/// Estimate tokens for a single piece of text.
pub fn estimate_tokens(cfg: &PromptConfig, text: &str) -> u64 {
    (text.len() as u64).div_ceil(cfg.bytes_per_token.max(1))
}

/// Estimate tokens for a full turn input: message bodies plus per-message
/// overhead, tool schema bodies plus per-tool overhead, and a flat
/// per-request constant.
pub fn estimate_message_tokens(cfg: &PromptConfig, messages: &[&str], tool_schemas: &[&str]) -> TokenBreakdown {
    let message_tokens: u64 = messages
        .iter()
        .map(|m| estimate_tokens(cfg, m) + cfg.per_message_overhead_tokens)
        .sum();
    let tool_schema_tokens: u64 = tool_schemas
        .iter()
        .map(|t| estimate_tokens(cfg, t) + cfg.per_tool_overhead_tokens)
        .sum();
    let total = message_tokens + tool_schema_tokens + cfg.per_request_overhead_tokens;
    TokenBreakdown { message_tokens, tool_schema_tokens, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_bytes_per_token() {
        let cfg = PromptConfig::default();
        assert_eq!(estimate_tokens(&cfg, "12345678"), 2);
        assert_eq!(estimate_tokens(&cfg, "123"), 1);
    }

    #[test]
    fn breakdown_includes_overheads() {
        let cfg = PromptConfig::default();
        let b = estimate_message_tokens(&cfg, &["hi"], &["{}"]);
        assert_eq!(b.message_tokens, estimate_tokens(&cfg, "hi") + cfg.per_message_overhead_tokens);
        assert_eq!(b.tool_schema_tokens, estimate_tokens(&cfg, "{}") + cfg.per_tool_overhead_tokens);
        assert_eq!(b.total, b.message_tokens + b.tool_schema_tokens + cfg.per_request_overhead_tokens);
    }
}
