//! `shell.exec` — a single bounded-timeout foreground command.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tokio::process::Command;

use ayati_guardrail::confirmation::Fingerprint;
use ayati_guardrail::shell_guard;
use ayati_guardrail::{ConfirmationStore, GuardDenied, PolicyStore};

use crate::registry::{ToolRegistry, ToolResult};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_OUTPUT_CHARS: usize = 20_000;

#[derive(Debug, Deserialize)]
struct ExecRequest {
    cmd: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default, alias = "confirmationToken")]
    confirmation_token: Option<String>,
}

pub fn register(registry: &mut ToolRegistry, policy: Arc<PolicyStore>, confirmations: Arc<ConfirmationStore>) {
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "shell.exec".into(),
            description: "Run a shell command and return its combined stdout/stderr. Destructive commands require confirmation.".into(),
            parameters: serde_json::json!({"type":"object","required":["cmd"],"properties":{"cmd":{"type":"string"},"cwd":{"type":"string"},"timeout_secs":{"type":"integer"},"confirmationToken":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = policy.clone();
            let confirmations = confirmations.clone();
            async move { exec(&policy, &confirmations, input).await }
        },
    );
}

async fn exec(policy: &PolicyStore, confirmations: &ConfirmationStore, input: serde_json::Value) -> ToolResult {
    let req: ExecRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid shell.exec input: {e}")),
    };
    let cfg = policy.current();
    let cwd = req.cwd.as_ref().map(PathBuf::from);
    let check = match shell_guard::validate(&cfg.shell, &req.cmd, cwd.as_deref(), &cfg.filesystem.allowed_write_roots) {
        Ok(c) => c,
        Err(e) => return ToolResult::err(e),
    };

    if check.destructive {
        let resolved_cwd = cwd
            .as_deref()
            .map(|d| d.canonicalize().unwrap_or_else(|_| d.to_path_buf()))
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        let fingerprint = Fingerprint::new(&[("cmd", req.cmd.as_str()), ("cwd", resolved_cwd.to_string_lossy().as_ref())]);
        match &req.confirmation_token {
            None => return challenge(confirmations, fingerprint, &cfg.confirmation_token_prefix),
            Some(token) => {
                if let Err(e) = confirmations.verify(token, &fingerprint) {
                    return ToolResult::err(e.to_string());
                }
            }
        }
    }

    let timeout = std::time::Duration::from_secs(req.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&req.cmd);
    if let Some(ref dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.stdin(std::process::Stdio::null());

    let child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => return ToolResult::err(format!("failed to spawn: {e}")),
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            if combined.len() > MAX_OUTPUT_CHARS {
                combined.truncate(MAX_OUTPUT_CHARS);
                combined.push_str("\n...[truncated]");
            }
            ToolResult::ok(serde_json::json!({
                "exit_code": output.status.code(),
                "output": combined,
                "destructive": check.destructive,
            }))
        }
        Ok(Err(e)) => ToolResult::err(format!("command failed: {e}")),
        Err(_) => ToolResult::err(format!("command timed out after {}s", timeout.as_secs())),
    }
}

fn challenge(confirmations: &ConfirmationStore, fingerprint: Fingerprint, prefix: &str) -> ToolResult {
    let (operation_id, expires_at) = confirmations.challenge(fingerprint);
    let denied = GuardDenied::confirmation_required(operation_id.to_string(), format!("{prefix}{{operationId}}"), expires_at);
    let meta = serde_json::to_value(&denied).unwrap_or_default();
    ToolResult::err_with_meta(denied.error, meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayati_domain::config::{ShellPolicy, ShellProfile};

    fn policy_store() -> PolicyStore {
        let cfg = ayati_domain::config::Config {
            guardrail: ayati_domain::config::GuardrailConfig {
                shell: ShellPolicy { profile: ShellProfile::ReadOnly, allowed_prefixes: vec!["echo".into(), "pwd".into()], ..ShellPolicy::default() },
                ..Default::default()
            },
            ..Default::default()
        };
        let path = tempfile::tempdir().unwrap().path().join("policy.json");
        std::fs::write(&path, serde_json::to_string(&cfg.guardrail).unwrap()).unwrap();
        PolicyStore::load(Some(path))
    }

    fn confirmations() -> ConfirmationStore {
        ConfirmationStore::new("CONFIRM:", 60)
    }

    #[tokio::test]
    async fn allowed_command_runs() {
        let policy = policy_store();
        let result = exec(&policy, &confirmations(), serde_json::json!({"cmd": "echo hello"})).await;
        assert!(result.ok);
        assert!(result.output.unwrap()["output"].as_str().unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn disallowed_command_is_denied() {
        let policy = policy_store();
        let result = exec(&policy, &confirmations(), serde_json::json!({"cmd": "uname -a"})).await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("not allowed"));
    }

    #[tokio::test]
    async fn destructive_command_requires_then_accepts_confirmation() {
        let cfg = ayati_domain::config::Config {
            guardrail: ayati_domain::config::GuardrailConfig {
                shell: ShellPolicy { profile: ShellProfile::PowerUser, allow_any_cwd: true, ..ShellPolicy::default() },
                ..Default::default()
            },
            ..Default::default()
        };
        let path = tempfile::tempdir().unwrap().path().join("policy.json");
        std::fs::write(&path, serde_json::to_string(&cfg.guardrail).unwrap()).unwrap();
        let policy = PolicyStore::load(Some(path));
        let confirmations = confirmations();

        let first = exec(&policy, &confirmations, serde_json::json!({"cmd": "rm somefile.txt"})).await;
        assert!(!first.ok);
        let op_id = first.meta.unwrap()["operationId"].as_str().unwrap().to_string();
        let token = format!("CONFIRM:{op_id}");

        let second = exec(&policy, &confirmations, serde_json::json!({"cmd": "rm somefile.txt", "confirmation_token": token})).await;
        assert!(second.ok);
    }
}
