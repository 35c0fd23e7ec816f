//! Hot-reloaded policy storage.
//!
//! The policy file's mtime is checked before each guard evaluation; on
//! change the file is re-parsed and swapped in behind a
//! `parking_lot::RwLock<Arc<GuardrailConfig>>`. When the file is absent,
//! falls back to env vars once at construction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use ayati_domain::config::{FilesystemPolicy, GuardrailConfig, ShellPolicy, ShellProfile, ToolMode};
use ayati_domain::trace::TraceEvent;

struct Loaded {
    config: Arc<GuardrailConfig>,
    mtime: Option<SystemTime>,
}

pub struct PolicyStore {
    path: Option<PathBuf>,
    inner: RwLock<Loaded>,
}

impl PolicyStore {
    /// Load from `path` if it exists; otherwise build a policy from env
    /// var fallback (`TOOLS_ENABLED`, `TOOLS_MODE`, `TOOLS_ALLOWED`,
    /// `SHELL_TOOL_*`).
    pub fn load(path: Option<PathBuf>) -> Self {
        let (config, mtime) = match &path {
            Some(p) if p.exists() => {
                let mtime = std::fs::metadata(p).ok().and_then(|m| m.modified().ok());
                let config = read_policy_file(p).unwrap_or_else(|e| {
                    tracing::warn!(path = %p.display(), error = %e, "invalid guardrail policy, using defaults");
                    GuardrailConfig::default()
                });
                (config, mtime)
            }
            _ => (config_from_env(), None),
        };
        Self { path, inner: RwLock::new(Loaded { config: Arc::new(config), mtime }) }
    }

    /// Build a store around an in-memory config, bypassing both disk and
    /// env var resolution. Used by callers (tests, the CLI harness) that
    /// already have a concrete policy in hand.
    pub fn from_config(config: GuardrailConfig) -> Self {
        Self { path: None, inner: RwLock::new(Loaded { config: Arc::new(config), mtime: None }) }
    }

    /// Current policy, reloading from disk first if the file's mtime
    /// changed since the last check.
    pub fn current(&self) -> Arc<GuardrailConfig> {
        if let Some(path) = &self.path {
            let disk_mtime = std::fs::metadata(path).ok().and_then(|m| m.modified().ok());
            let needs_reload = {
                let guard = self.inner.read();
                disk_mtime != guard.mtime
            };
            if needs_reload {
                if let Ok(config) = read_policy_file(path) {
                    let mut guard = self.inner.write();
                    guard.config = Arc::new(config);
                    guard.mtime = disk_mtime;
                    TraceEvent::PolicyReloaded { path: path.display().to_string() }.emit();
                } else {
                    // Keep serving the last good policy; update mtime so we
                    // don't retry every call against an unparseable file.
                    let mut guard = self.inner.write();
                    guard.mtime = disk_mtime;
                }
            }
        }
        self.inner.read().config.clone()
    }
}

fn read_policy_file(path: &std::path::Path) -> Result<GuardrailConfig, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn config_from_env() -> GuardrailConfig {
    let mut cfg = GuardrailConfig::default();

    if let Ok(v) = std::env::var("TOOLS_ENABLED") {
        if v == "0" || v.eq_ignore_ascii_case("false") {
            cfg.tool_mode = ToolMode::Off;
        }
    }
    if let Ok(v) = std::env::var("TOOLS_MODE") {
        cfg.tool_mode = match v.as_str() {
            "off" => ToolMode::Off,
            "allowlist" => ToolMode::Allowlist,
            _ => ToolMode::Full,
        };
    }
    if let Ok(v) = std::env::var("TOOLS_ALLOWED") {
        cfg.allowed_tools = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Ok(v) = std::env::var("SHELL_TOOL_PROFILE") {
        cfg.shell.profile = match v.as_str() {
            "read_only" => ShellProfile::ReadOnly,
            "power_user" => ShellProfile::PowerUser,
            _ => ShellProfile::Developer,
        };
    }
    if let Ok(v) = std::env::var("SHELL_TOOL_ALLOWED_PREFIXES") {
        cfg.shell.allowed_prefixes = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Ok(v) = std::env::var("SHELL_TOOL_ALLOW_ANY_CWD") {
        cfg.shell.allow_any_cwd = v == "1" || v.eq_ignore_ascii_case("true");
    }

    cfg
}

// Re-exported so callers matching on the loaded shape don't need a second
// `use` of the domain crate for these.
pub use ayati_domain::config::GuardrailConfig as Policy;
pub type Filesystem = FilesystemPolicy;
pub type Shell = ShellPolicy;
