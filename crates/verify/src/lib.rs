//! Verification gates: the deterministic pre-LLM act-output
//! classifier shared by executors and the turn-level scratchpad protocol.
//!
//! `check_gates` applies nine rules in strict order; the first that
//! matches decides the outcome. Rule 9 returns `None`, signaling the
//! caller should fall back to an LLM-based verifier.

use serde::{Deserialize, Serialize};

/// One tool call's outcome within an `act` phase, as seen by the gates.
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub tool_name: String,
    pub ok: bool,
    pub output: String,
    pub error: Option<String>,
}

/// The accumulated result of an `act` step (or steps) being verified.
#[derive(Debug, Clone, Default)]
pub struct ActOutput {
    pub tool_calls: Vec<ToolCallOutcome>,
    pub final_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyMethod {
    Gate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub passed: bool,
    pub method: VerifyMethod,
    pub evidence: String,
}

const NO_PROGRESS_PHRASES: &[&str] = &[
    "",
    "(no matches)",
    "not found",
    "no such file",
    "does not exist",
    "no results",
    "0 matches",
    "no files found",
];

const DISCOVERY_VERBS: &[&str] = &["find", "locate", "search", "discover", "path", "file", "directory", "folder", "where"];

const ABSENCE_TERMS: &[&str] = &["absence", "missing", "not found", "nonexistent", "does not exist"];

const CONFIRM_VERBS: &[&str] = &["confirm", "verify", "ensure"];

const CRITICAL_PATTERNS: &[&str] = &["permission denied", "eacces", "unauthorized", "forbidden", "validation error"];

/// Rule 1: no tool calls and non-empty final text.
fn rule_direct_pass(act: &ActOutput) -> Option<VerifyResult> {
    if act.tool_calls.is_empty() && !act.final_text.trim().is_empty() {
        return Some(VerifyResult { passed: true, method: VerifyMethod::Gate, evidence: "no tool calls, direct answer given".into() });
    }
    None
}

/// Rule 2: all tool calls failed.
fn rule_all_failed(act: &ActOutput) -> Option<VerifyResult> {
    if !act.tool_calls.is_empty() && act.tool_calls.iter().all(|t| !t.ok) {
        let errors: Vec<String> = act
            .tool_calls
            .iter()
            .map(|t| format!("{}: {}", t.tool_name, t.error.clone().unwrap_or_default()))
            .collect();
        return Some(VerifyResult {
            passed: false,
            method: VerifyMethod::Gate,
            evidence: format!("All tool calls failed: {}", errors.join("; ")),
        });
    }
    None
}

fn is_no_progress(output: &str) -> bool {
    let lower = output.trim().to_ascii_lowercase();
    NO_PROGRESS_PHRASES.iter().any(|p| lower == *p || (!p.is_empty() && lower.contains(p)))
}

/// Rule 3: every successful output is a no-progress phrase, criteria asks
/// for discovery and does not explicitly allow absence as an answer.
fn rule_no_progress_discovery(act: &ActOutput, criteria: &str) -> Option<VerifyResult> {
    let successes: Vec<&ToolCallOutcome> = act.tool_calls.iter().filter(|t| t.ok).collect();
    if successes.is_empty() {
        return None;
    }
    if !successes.iter().all(|t| is_no_progress(&t.output)) {
        return None;
    }
    let lower_criteria = criteria.to_ascii_lowercase();
    let wants_discovery = DISCOVERY_VERBS.iter().any(|v| lower_criteria.contains(v));
    if !wants_discovery {
        return None;
    }
    let allows_absence = CONFIRM_VERBS.iter().any(|v| lower_criteria.contains(v))
        && ABSENCE_TERMS.iter().any(|a| lower_criteria.contains(a));
    if allows_absence {
        return None;
    }
    Some(VerifyResult {
        passed: false,
        method: VerifyMethod::Gate,
        evidence: "tool output reports nothing found, but the task asked to locate something".into(),
    })
}

fn is_critical(error: &str) -> bool {
    let lower = error.to_ascii_lowercase();
    CRITICAL_PATTERNS.iter().any(|p| lower.contains(p))
}

fn has_useful_output(act: &ActOutput) -> bool {
    act.tool_calls.iter().any(|t| t.ok && !t.output.trim().is_empty())
}

fn critical_blocker(act: &ActOutput) -> Option<&ToolCallOutcome> {
    act.tool_calls.iter().find(|t| !t.ok && t.error.as_deref().map(is_critical).unwrap_or(false))
}

/// Rule 4: useful output exists, but some failed call is critical.
fn rule_useful_with_critical(act: &ActOutput) -> Option<VerifyResult> {
    if has_useful_output(act) {
        if let Some(blocker) = critical_blocker(act) {
            return Some(VerifyResult {
                passed: false,
                method: VerifyMethod::Gate,
                evidence: format!("critical blocker: {}: {}", blocker.tool_name, blocker.error.clone().unwrap_or_default()),
            });
        }
    }
    None
}

/// Rule 5: useful output, no critical blocker.
fn rule_useful_pass(act: &ActOutput) -> Option<VerifyResult> {
    if has_useful_output(act) && critical_blocker(act).is_none() {
        let failed: Vec<&ToolCallOutcome> = act.tool_calls.iter().filter(|t| !t.ok).collect();
        let evidence = if failed.is_empty() {
            "useful output produced".to_string()
        } else {
            format!(
                "useful output produced; non-critical failures: {}",
                failed.iter().map(|t| t.tool_name.clone()).collect::<Vec<_>>().join(", ")
            )
        };
        return Some(VerifyResult { passed: true, method: VerifyMethod::Gate, evidence });
    }
    None
}

/// Rule 6: no useful output, critical blocker present.
fn rule_no_output_critical(act: &ActOutput) -> Option<VerifyResult> {
    if !has_useful_output(act) {
        if let Some(blocker) = critical_blocker(act) {
            return Some(VerifyResult {
                passed: false,
                method: VerifyMethod::Gate,
                evidence: format!("critical blocker: {}: {}", blocker.tool_name, blocker.error.clone().unwrap_or_default()),
            });
        }
    }
    None
}

/// Rule 7: no useful output, any failed call.
fn rule_no_output_any_failed(act: &ActOutput) -> Option<VerifyResult> {
    if !has_useful_output(act) && act.tool_calls.iter().any(|t| !t.ok) {
        return Some(VerifyResult { passed: false, method: VerifyMethod::Gate, evidence: "no useful output and at least one call failed".into() });
    }
    None
}

/// Rule 8: otherwise all-success with some output.
fn rule_all_success_with_output(act: &ActOutput) -> Option<VerifyResult> {
    if !act.tool_calls.is_empty() && act.tool_calls.iter().all(|t| t.ok) {
        return Some(VerifyResult { passed: true, method: VerifyMethod::Gate, evidence: "all tool calls succeeded".into() });
    }
    None
}

/// Apply the nine gates in order. Returns `None` (rule 9) when no gate
/// decides, signaling the caller to fall back to an LLM-based verifier.
pub fn check_gates(act: &ActOutput, success_criteria: &str) -> Option<VerifyResult> {
    rule_direct_pass(act)
        .or_else(|| rule_all_failed(act))
        .or_else(|| rule_no_progress_discovery(act, success_criteria))
        .or_else(|| rule_useful_with_critical(act))
        .or_else(|| rule_useful_pass(act))
        .or_else(|| rule_no_output_critical(act))
        .or_else(|| rule_no_output_any_failed(act))
        .or_else(|| rule_all_success_with_output(act))
}
