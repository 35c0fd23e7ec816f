//! Filesystem tools: `fs.read`, `fs.write`, `fs.delete`, `fs.move`, `fs.list`.
//!
//! Each validates its own input to a typed request struct, resolves the
//! path through `ayati_guardrail::path_guard`, and — for `delete` and
//! overwrite-`move` — requires a confirmation token.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use ayati_guardrail::confirmation::Fingerprint;
use ayati_guardrail::path_guard::{self, FsAction};
use ayati_guardrail::{ConfirmationStore, GuardDenied, PolicyStore};

use crate::registry::{ToolContext, ToolRegistry, ToolResult};

#[derive(Debug, Deserialize)]
struct ReadRequest {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteRequest {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    path: String,
    #[serde(default, alias = "confirmationToken")]
    confirmation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    source: String,
    destination: String,
    #[serde(default)]
    overwrite: bool,
    #[serde(default, alias = "confirmationToken")]
    confirmation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListRequest {
    #[serde(default = "default_dot")]
    path: String,
}

fn default_dot() -> String {
    ".".into()
}

pub fn register(registry: &mut ToolRegistry, policy: Arc<PolicyStore>, confirmations: Arc<ConfirmationStore>) {
    let p = policy.clone();
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "fs.read".into(),
            description: "Read the contents of a file.".into(),
            parameters: serde_json::json!({"type":"object","required":["path"],"properties":{"path":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = p.clone();
            async move { fs_read(&policy, input).await }
        },
    );

    let p = policy.clone();
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "fs.write".into(),
            description: "Write (create or overwrite) a file's contents.".into(),
            parameters: serde_json::json!({"type":"object","required":["path","content"],"properties":{"path":{"type":"string"},"content":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = p.clone();
            async move { fs_write(&policy, input).await }
        },
    );

    let p = policy.clone();
    let c = confirmations.clone();
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "fs.delete".into(),
            description: "Delete a file. Requires confirmation.".into(),
            parameters: serde_json::json!({"type":"object","required":["path"],"properties":{"path":{"type":"string"},"confirmationToken":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = p.clone();
            let confirmations = c.clone();
            async move { fs_delete(&policy, &confirmations, input).await }
        },
    );

    let p = policy.clone();
    let c = confirmations.clone();
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "fs.move".into(),
            description: "Move or rename a file. Overwriting an existing destination requires confirmation.".into(),
            parameters: serde_json::json!({"type":"object","required":["source","destination"],"properties":{"source":{"type":"string"},"destination":{"type":"string"},"overwrite":{"type":"boolean"},"confirmationToken":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = p.clone();
            let confirmations = c.clone();
            async move { fs_move(&policy, &confirmations, input).await }
        },
    );

    let p = policy.clone();
    registry.register(
        ayati_domain::tool::ToolDefinition {
            name: "fs.list".into(),
            description: "List a directory's entries.".into(),
            parameters: serde_json::json!({"type":"object","properties":{"path":{"type":"string"}}}),
        },
        move |input, _ctx| {
            let policy = p.clone();
            async move { fs_list(&policy, input).await }
        },
    );
}

async fn fs_read(policy: &PolicyStore, input: serde_json::Value) -> ToolResult {
    let req: ReadRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid fs.read input: {e}")),
    };
    let cfg = policy.current();
    let resolved = match path_guard::validate(&cfg.filesystem, FsAction::Read, &PathBuf::from(&req.path)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    match tokio::fs::read_to_string(&resolved).await {
        Ok(content) => ToolResult::ok(serde_json::json!({"path": req.path, "content": content})),
        Err(e) => ToolResult::err(format!("failed to read '{}': {e}", req.path)),
    }
}

async fn fs_write(policy: &PolicyStore, input: serde_json::Value) -> ToolResult {
    let req: WriteRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid fs.write input: {e}")),
    };
    let cfg = policy.current();
    let resolved = match path_guard::validate(&cfg.filesystem, FsAction::Write, &PathBuf::from(&req.path)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    if let Some(parent) = resolved.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return ToolResult::err(format!("failed to create parent directory: {e}"));
        }
    }
    let tmp_name = format!(
        "{}.tmp-{}",
        resolved.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        uuid::Uuid::new_v4()
    );
    let tmp = resolved.with_file_name(tmp_name);
    if let Err(e) = tokio::fs::write(&tmp, &req.content).await {
        return ToolResult::err(format!("failed to write: {e}"));
    }
    if let Err(e) = tokio::fs::rename(&tmp, &resolved).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return ToolResult::err(format!("failed to finalize write: {e}"));
    }
    ToolResult::ok(serde_json::json!({"path": req.path, "bytes_written": req.content.len()}))
}

async fn fs_delete(policy: &PolicyStore, confirmations: &ConfirmationStore, input: serde_json::Value) -> ToolResult {
    let req: DeleteRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid fs.delete input: {e}")),
    };
    let cfg = policy.current();
    let resolved = match path_guard::validate(&cfg.filesystem, FsAction::Delete, &PathBuf::from(&req.path)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    if !cfg.filesystem.actions_requiring_confirmation.contains(FsAction::Delete.confirmation_key()) {
        return match tokio::fs::remove_file(&resolved).await {
            Ok(()) => ToolResult::ok(serde_json::json!({"path": req.path, "deleted": true})),
            Err(e) => ToolResult::err(format!("failed to delete '{}': {e}", req.path)),
        };
    }

    let fingerprint = Fingerprint::new(&[("action", "delete"), ("path", resolved.to_string_lossy().as_ref())]);

    match req.confirmation_token {
        None => challenge(confirmations, fingerprint, &cfg.confirmation_token_prefix),
        Some(token) => {
            if let Err(e) = confirmations.verify(&token, &fingerprint) {
                return ToolResult::err(e.to_string());
            }
            match tokio::fs::remove_file(&resolved).await {
                Ok(()) => ToolResult::ok(serde_json::json!({"path": req.path, "deleted": true})),
                Err(e) => ToolResult::err(format!("failed to delete '{}': {e}", req.path)),
            }
        }
    }
}

async fn fs_move(policy: &PolicyStore, confirmations: &ConfirmationStore, input: serde_json::Value) -> ToolResult {
    let req: MoveRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid fs.move input: {e}")),
    };
    let cfg = policy.current();
    let source = match path_guard::validate(&cfg.filesystem, FsAction::MoveSource, &PathBuf::from(&req.source)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let dest = match path_guard::validate(&cfg.filesystem, FsAction::MoveDest, &PathBuf::from(&req.destination)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    let dest_exists = dest.exists();
    if dest_exists && !req.overwrite {
        return ToolResult::err(format!("destination '{}' already exists", req.destination));
    }

    if dest_exists && cfg.filesystem.actions_requiring_confirmation.contains(FsAction::MoveDest.confirmation_key()) {
        let fingerprint = Fingerprint::new(&[
            ("action", "move_overwrite"),
            ("source", source.to_string_lossy().as_ref()),
            ("destination", dest.to_string_lossy().as_ref()),
        ]);
        match req.confirmation_token {
            None => {
                return challenge(confirmations, fingerprint, &cfg.confirmation_token_prefix);
            }
            Some(token) => {
                if let Err(e) = confirmations.verify(&token, &fingerprint) {
                    return ToolResult::err(e.to_string());
                }
            }
        }
    }

    match tokio::fs::rename(&source, &dest).await {
        Ok(()) => ToolResult::ok(serde_json::json!({"source": req.source, "destination": req.destination})),
        Err(e) => ToolResult::err(format!("failed to move: {e}")),
    }
}

async fn fs_list(policy: &PolicyStore, input: serde_json::Value) -> ToolResult {
    let req: ListRequest = match serde_json::from_value(input) {
        Ok(r) => r,
        Err(e) => return ToolResult::err(format!("invalid fs.list input: {e}")),
    };
    let cfg = policy.current();
    let resolved = match path_guard::validate(&cfg.filesystem, FsAction::List, &PathBuf::from(&req.path)) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let mut entries = Vec::new();
    let mut dir = match tokio::fs::read_dir(&resolved).await {
        Ok(d) => d,
        Err(e) => return ToolResult::err(format!("failed to list '{}': {e}", req.path)),
    };
    let cap = cfg.filesystem.search_list_cap;
    while let Ok(Some(entry)) = dir.next_entry().await {
        if entries.len() >= cap {
            break;
        }
        let file_type = entry.file_type().await.ok();
        entries.push(serde_json::json!({
            "name": entry.file_name().to_string_lossy(),
            "is_dir": file_type.map(|t| t.is_dir()).unwrap_or(false),
        }));
    }
    ToolResult::ok(serde_json::json!({"path": req.path, "entries": entries}))
}

fn challenge(confirmations: &ConfirmationStore, fingerprint: Fingerprint, prefix: &str) -> ToolResult {
    let (operation_id, expires_at) = confirmations.challenge(fingerprint);
    let denied = GuardDenied::confirmation_required(operation_id.to_string(), format!("{prefix}{{operationId}}"), expires_at);
    let meta = serde_json::to_value(&denied).unwrap_or_default();
    ToolResult::err_with_meta(denied.error, meta)
}
