mod agent_loop;
mod guardrail;
mod prompt;
mod pulse;

pub use agent_loop::*;
pub use guardrail::*;
pub use prompt::*;
pub use pulse::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Layered configuration: built-in defaults (via `#[serde(default)]`) are
/// overridden by a `toml` config file, then by guardrail-specific env var
/// fallbacks read directly by `ayati-guardrail` per §6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub agent_loop: AgentLoopConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Config {
    /// Parse from TOML text, falling back to defaults for missing fields.
    pub fn from_toml(text: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(text).map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Load from a path if it exists, otherwise return built-in defaults.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self, crate::error::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.agent_loop.base_step_limit, 14);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = Config::from_toml(
            r#"
            [agent_loop]
            base_step_limit = 20
            "#,
        )
        .unwrap();
        assert_eq!(cfg.agent_loop.base_step_limit, 20);
        assert_eq!(cfg.agent_loop.max_step_limit, 30);
    }
}
