//! Prompt assembly & token estimator.

pub mod builder;
pub mod tokens;

pub use builder::{PromptBuilder, PromptSection};
pub use tokens::{estimate_message_tokens, estimate_tokens, TokenBreakdown};
