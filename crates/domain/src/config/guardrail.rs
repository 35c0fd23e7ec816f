use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Guardrail policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Guardrail policy document. Loaded from `context/tool-access.json` (or an
/// equivalent path), with env var fallback when the file is absent, and
/// hot-reloaded on mtime change by `ayati-guardrail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Global tool mode gating the executor.
    #[serde(default)]
    pub tool_mode: ToolMode,
    /// Tool names permitted when `tool_mode == Allowlist`. Ignored in
    /// `Off`/`Full` modes.
    #[serde(default)]
    pub allowed_tools: HashSet<String>,
    #[serde(default)]
    pub filesystem: FilesystemPolicy,
    #[serde(default)]
    pub shell: ShellPolicy,
    /// Confirmation token prefix, default `CONFIRM:`.
    #[serde(default = "d_confirm_prefix")]
    pub confirmation_token_prefix: String,
    /// Confirmation slot TTL in seconds, default 60.
    #[serde(default = "d_confirm_ttl")]
    pub confirmation_ttl_secs: u64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            tool_mode: ToolMode::default(),
            allowed_tools: HashSet::new(),
            filesystem: FilesystemPolicy::default(),
            shell: ShellPolicy::default(),
            confirmation_token_prefix: d_confirm_prefix(),
            confirmation_ttl_secs: d_confirm_ttl(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    Off,
    Allowlist,
    #[default]
    Full,
}

/// Filesystem tool policy: roots, protected targets, and which actions
/// require confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemPolicy {
    #[serde(default)]
    pub allowed_read_roots: Vec<PathBuf>,
    #[serde(default)]
    pub allowed_write_roots: Vec<PathBuf>,
    #[serde(default)]
    pub protected_paths: Vec<PathBuf>,
    #[serde(default)]
    pub protected_globs: Vec<String>,
    /// Action names that always require a confirmation token.
    #[serde(default = "d_confirm_actions")]
    pub actions_requiring_confirmation: HashSet<String>,
    #[serde(default = "d_search_cap")]
    pub search_list_cap: usize,
}

impl Default for FilesystemPolicy {
    fn default() -> Self {
        Self {
            allowed_read_roots: Vec::new(),
            allowed_write_roots: Vec::new(),
            protected_paths: Vec::new(),
            protected_globs: Vec::new(),
            actions_requiring_confirmation: d_confirm_actions(),
            search_list_cap: d_search_cap(),
        }
    }
}

/// Shell tool policy: profile, prefixes, operators, and destructive patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellPolicy {
    #[serde(default)]
    pub profile: ShellProfile,
    /// User-declared extra allowed command prefixes (unioned with the
    /// profile's own prefixes).
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
    #[serde(default)]
    pub deny_prefixes: Vec<String>,
    #[serde(default = "d_deny_operators")]
    pub deny_operators: Vec<String>,
    #[serde(default)]
    pub deny_patterns: Vec<String>,
    #[serde(default = "d_destructive_prefixes")]
    pub destructive_prefixes: Vec<String>,
    #[serde(default = "d_destructive_patterns")]
    pub destructive_patterns: Vec<String>,
    #[serde(default = "d_script_extensions")]
    pub allowed_script_extensions: Vec<String>,
    #[serde(default)]
    pub allow_any_cwd: bool,
    #[serde(default = "d_true")]
    pub audit_log: bool,
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self {
            profile: ShellProfile::default(),
            allowed_prefixes: Vec::new(),
            deny_prefixes: Vec::new(),
            deny_operators: d_deny_operators(),
            deny_patterns: Vec::new(),
            destructive_prefixes: d_destructive_prefixes(),
            destructive_patterns: d_destructive_patterns(),
            allowed_script_extensions: d_script_extensions(),
            allow_any_cwd: false,
            audit_log: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellProfile {
    ReadOnly,
    #[default]
    Developer,
    PowerUser,
}

impl ShellProfile {
    /// Command prefixes baked into each profile, unioned with
    /// `ShellPolicy::allowed_prefixes` at evaluation time.
    pub fn builtin_prefixes(&self) -> &'static [&'static str] {
        match self {
            ShellProfile::ReadOnly => &["echo", "pwd", "ls", "cat", "grep", "find", "head", "tail", "wc"],
            ShellProfile::Developer => &[
                "echo", "pwd", "ls", "cat", "grep", "find", "head", "tail", "wc", "git", "cargo",
                "npm", "node", "python", "python3", "make",
            ],
            ShellProfile::PowerUser => &[
                "echo", "pwd", "ls", "cat", "grep", "find", "head", "tail", "wc", "git", "cargo",
                "npm", "node", "python", "python3", "make", "curl", "docker", "kubectl", "rm", "mv",
            ],
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_confirm_prefix() -> String {
    "CONFIRM:".into()
}
fn d_confirm_ttl() -> u64 {
    60
}
fn d_confirm_actions() -> HashSet<String> {
    ["delete", "move_overwrite"].iter().map(|s| s.to_string()).collect()
}
fn d_search_cap() -> usize {
    500
}
fn d_deny_operators() -> Vec<String> {
    vec![" | ".into(), " ; ".into(), "$(".into(), "&&".into(), "`".into()]
}
fn d_destructive_prefixes() -> Vec<String> {
    vec!["rm".into(), "mkfs".into(), "dd".into(), "shutdown".into(), "reboot".into()]
}
fn d_destructive_patterns() -> Vec<String> {
    vec![r"rm\s+-rf\s+/".into(), r"mkfs\.".into(), r"dd\s+if=.+of=/dev/".into()]
}
fn d_script_extensions() -> Vec<String> {
    vec!["sh".into(), "py".into(), "js".into()]
}
fn d_true() -> bool {
    true
}
