//! Filesystem path guard.
//!
//! Canonicalizes the requested path (resolving the longest existing
//! ancestor when the target doesn't exist yet), verifies containment in
//! the action's configured root, and rejects protected targets. `move`
//! re-checks the source root as well as the destination.

use std::path::{Path, PathBuf};

use ayati_domain::config::FilesystemPolicy;
use ayati_domain::trace::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAction {
    Read,
    Write,
    Delete,
    MoveSource,
    MoveDest,
    List,
}

impl FsAction {
    fn roots<'a>(&self, policy: &'a FilesystemPolicy) -> &'a [PathBuf] {
        match self {
            FsAction::Read | FsAction::List | FsAction::MoveSource => &policy.allowed_read_roots,
            FsAction::Write | FsAction::Delete | FsAction::MoveDest => &policy.allowed_write_roots,
        }
    }

    /// The policy action name used to look up whether this action requires
    /// a confirmation token.
    pub fn confirmation_key(&self) -> &'static str {
        match self {
            FsAction::Delete => "delete",
            FsAction::MoveDest => "move_overwrite",
            _ => "",
        }
    }
}

/// Resolve and validate `requested` for `action` against `policy`. Returns
/// the canonicalized path on success.
pub fn validate(policy: &FilesystemPolicy, action: FsAction, requested: &Path) -> Result<PathBuf, String> {
    let resolved = resolve(requested)?;

    let roots = action.roots(policy);
    if !roots.is_empty() {
        let allowed = roots.iter().any(|root| {
            resolve(root).map(|r| resolved.starts_with(&r)).unwrap_or(false)
        });
        if !allowed {
            return Err(deny(action, format!("path '{}' is outside the allowed roots for this action", resolved.display())));
        }
    }

    if is_protected(policy, &resolved) {
        return Err(deny(action, format!("path '{}' is protected and cannot be targeted", resolved.display())));
    }

    Ok(resolved)
}

fn deny(action: FsAction, reason: String) -> String {
    TraceEvent::GuardrailDenied { action: format!("fs.{action:?}"), reason: reason.clone() }.emit();
    reason
}

fn is_protected(policy: &FilesystemPolicy, resolved: &Path) -> bool {
    if policy.protected_paths.iter().any(|p| resolve(p).map(|p| &p == resolved).unwrap_or(false)) {
        return true;
    }
    let s = resolved.to_string_lossy();
    policy.protected_globs.iter().any(|glob| glob_match(glob, &s))
}

/// Minimal glob matcher: supports a single trailing `*` or `**` segment,
/// which is all the protected-glob grammar in practice needs.
fn glob_match(glob: &str, candidate: &str) -> bool {
    if let Some(prefix) = glob.strip_suffix("**") {
        return candidate.starts_with(prefix);
    }
    if let Some(prefix) = glob.strip_suffix('*') {
        return candidate.starts_with(prefix);
    }
    candidate == glob
}

/// Canonicalize `path`, resolving symlinks when the target exists and
/// walking up to the nearest existing ancestor otherwise.
fn resolve(path: &Path) -> Result<PathBuf, String> {
    if path.exists() {
        return path.canonicalize().map_err(|e| format!("cannot resolve '{}': {e}", path.display()));
    }
    let mut existing = path;
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match existing.parent() {
            Some(parent) => {
                if let Some(name) = existing.file_name() {
                    tail.push(name);
                }
                existing = parent;
            }
            None => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .map_err(|e| format!("cannot resolve ancestor of '{}': {e}", path.display()))?;
    for part in tail.into_iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_path_outside_write_root() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let policy = FilesystemPolicy { allowed_write_roots: vec![dir.path().to_path_buf()], ..FilesystemPolicy::default() };
        let target = outside.path().join("f.txt");
        let result = validate(&policy, FsAction::Write, &target);
        assert!(result.is_err());
    }

    #[test]
    fn allows_new_file_under_write_root() {
        let dir = tempdir().unwrap();
        let policy = FilesystemPolicy { allowed_write_roots: vec![dir.path().to_path_buf()], ..FilesystemPolicy::default() };
        let target = dir.path().join("new.txt");
        assert!(validate(&policy, FsAction::Write, &target).is_ok());
    }

    #[test]
    fn rejects_protected_path() {
        let dir = tempdir().unwrap();
        let protected = dir.path().join("secret.txt");
        std::fs::write(&protected, "x").unwrap();
        let policy = FilesystemPolicy {
            allowed_write_roots: vec![dir.path().to_path_buf()],
            protected_paths: vec![protected.clone()],
            ..FilesystemPolicy::default()
        };
        assert!(validate(&policy, FsAction::Delete, &protected).is_err());
    }
}
