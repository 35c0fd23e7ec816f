//! Shell command guard.
//!
//! Tokenizes the command, rejects empty/deny-prefix/deny-operator/
//! deny-pattern commands, enforces the effective allowlist (profile
//! prefixes ∪ user-declared prefixes), and flags destructive commands
//! separately so callers can route them through confirmation.

use ayati_domain::config::ShellPolicy;
use ayati_domain::trace::TraceEvent;

pub struct ShellCheck {
    /// True if the command matches a destructive prefix/pattern and should
    /// require confirmation rather than being denied outright.
    pub destructive: bool,
}

pub fn validate(policy: &ShellPolicy, cmd: &str, cwd: Option<&std::path::Path>, write_roots: &[std::path::PathBuf]) -> Result<ShellCheck, String> {
    let trimmed = cmd.trim();
    if trimmed.is_empty() {
        return Err(deny("empty command".into()));
    }

    for op in &policy.deny_operators {
        if trimmed.contains(op.as_str()) {
            return Err(deny(format!("command contains disallowed operator '{op}'")));
        }
    }

    let tokens = tokenize(trimmed);
    let head = tokens.first().map(|s| s.as_str()).unwrap_or("");

    for prefix in &policy.deny_prefixes {
        if head == prefix {
            return Err(deny(format!("command prefix '{head}' is not allowed")));
        }
    }

    for pattern in &policy.deny_patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            if re.is_match(trimmed) {
                return Err(deny("command matches a denied pattern".into()));
            }
        }
    }

    let effective_allowed: Vec<&str> = policy
        .profile
        .builtin_prefixes()
        .iter()
        .copied()
        .chain(policy.allowed_prefixes.iter().map(|s| s.as_str()))
        .collect();
    if !effective_allowed.contains(&head) {
        return Err(deny(format!("command prefix '{head}' is not allowed by the current shell profile")));
    }

    if let Some(cwd) = cwd {
        if !policy.allow_any_cwd {
            let canon = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
            let inside = write_roots.iter().any(|root| {
                root.canonicalize().map(|r| canon.starts_with(&r)).unwrap_or(false)
            });
            if !inside {
                return Err(deny(format!("cwd '{}' is outside the allowed write roots", cwd.display())));
            }
        }
    }

    let destructive = policy.destructive_prefixes.iter().any(|p| p == head)
        || policy.destructive_patterns.iter().any(|pat| {
            regex::Regex::new(pat).map(|re| re.is_match(trimmed)).unwrap_or(false)
        });

    Ok(ShellCheck { destructive })
}

fn deny(reason: String) -> String {
    TraceEvent::GuardrailDenied { action: "shell.exec".into(), reason: reason.clone() }.emit();
    reason
}

/// Simple shell-like tokenizer: splits on whitespace, honoring single and
/// double quoted segments. Not a full shell grammar — sufficient to pull
/// out the leading command token for allowlist checks.
fn tokenize(cmd: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in cmd.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayati_domain::config::ShellProfile;

    #[test]
    fn empty_command_rejected() {
        let policy = ShellPolicy::default();
        assert!(validate(&policy, "   ", None, &[]).is_err());
    }

    #[test]
    fn allowlisted_prefix_passes() {
        let policy = ShellPolicy { profile: ShellProfile::ReadOnly, ..ShellPolicy::default() };
        assert!(validate(&policy, "echo hello", None, &[]).is_ok());
    }

    #[test]
    fn non_allowlisted_prefix_rejected() {
        let policy = ShellPolicy {
            profile: ShellProfile::ReadOnly,
            allowed_prefixes: vec!["echo".into(), "pwd".into()],
            ..ShellPolicy::default()
        };
        let err = validate(&policy, "uname -a", None, &[]).unwrap_err();
        assert!(err.contains("not allowed"));
    }

    #[test]
    fn deny_operator_rejected() {
        let policy = ShellPolicy::default();
        let err = validate(&policy, "echo hi && rm -rf /", None, &[]).unwrap_err();
        assert!(err.contains("operator"));
    }

    #[test]
    fn destructive_prefix_is_flagged_not_denied() {
        let policy = ShellPolicy { profile: ShellProfile::PowerUser, ..ShellPolicy::default() };
        let check = validate(&policy, "rm somefile.txt", None, &[]).unwrap();
        assert!(check.destructive);
    }
}
