//! Pure, I/O-free formatting helpers: system-message rebuilding and
//! deterministic tool-result rendering, kept separate from the loop's
//! I/O-performing body so the rendering invariants are directly testable.

use crate::step::{AgentStepPhase, ScratchpadEntry};

const MARKER: &str = "\n--- Scratchpad ---";

/// Maximum characters kept of a single tool result rendered into a
/// message; longer output is truncated with a marker.
const TOOL_RESULT_TRUNCATE_CHARS: usize = 4000;

/// Strip anything after the scratchpad marker from `base` and re-append
/// the current scratchpad block. Idempotent: calling this twice on its
/// own output with the same scratchpad yields the same string.
pub fn render_system_message(
    base: &str,
    scratchpad: &[ScratchpadEntry],
    approaches_tried: &std::collections::BTreeSet<String>,
) -> String {
    let head = match base.find(MARKER) {
        Some(idx) => &base[..idx],
        None => base,
    };
    let mut out = String::from(head.trim_end());
    out.push_str(MARKER);
    out.push('\n');
    for entry in scratchpad {
        out.push_str(&format!("\nStep {} [{}]: {}", entry.step, phase_label(entry.phase), entry.summary));
        if let Some(thinking) = &entry.thinking {
            if !thinking.trim().is_empty() {
                out.push_str(&format!("\n  thinking: {thinking}"));
            }
        }
        if let Some(result) = &entry.tool_result {
            out.push_str(&format!("\n  result: {result}"));
        }
    }
    if !approaches_tried.is_empty() {
        out.push_str("\n\nApproaches tried: ");
        out.push_str(&approaches_tried.iter().cloned().collect::<Vec<_>>().join(", "));
    }
    out
}

fn phase_label(phase: AgentStepPhase) -> &'static str {
    match phase {
        AgentStepPhase::Reason => "reason",
        AgentStepPhase::Act => "act",
        AgentStepPhase::Verify => "verify",
        AgentStepPhase::Reflect => "reflect",
        AgentStepPhase::Feedback => "feedback",
        AgentStepPhase::End => "end",
    }
}

/// Deterministically format a tool result for LLM-visible history,
/// truncating to a fixed size.
pub fn format_tool_result(tool_name: &str, ok: bool, output: Option<&serde_json::Value>, error: Option<&str>) -> String {
    let body = if ok {
        output.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
    } else {
        format!("error: {}", error.unwrap_or("unknown error"))
    };
    let truncated = if body.chars().count() > TOOL_RESULT_TRUNCATE_CHARS {
        let mut s: String = body.chars().take(TOOL_RESULT_TRUNCATE_CHARS).collect();
        s.push_str("... [truncated]");
        s
    } else {
        body
    };
    format!("[{tool_name}] {truncated}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ayati_domain::ids::StepId;

    fn entry(step: u32, phase: AgentStepPhase, summary: &str) -> ScratchpadEntry {
        ScratchpadEntry { step: StepId(step), phase, thinking: None, summary: summary.into(), tool_result: None }
    }

    #[test]
    fn render_is_idempotent_on_repeated_calls() {
        let base = "You are Ayati.";
        let scratchpad = vec![entry(1, AgentStepPhase::Reason, "thinking about the task")];
        let approaches = Default::default();
        let once = render_system_message(base, &scratchpad, &approaches);
        let twice = render_system_message(&once, &scratchpad, &approaches);
        assert_eq!(once, twice);
    }

    #[test]
    fn render_strips_prior_scratchpad_before_reappending() {
        let base = "You are Ayati.";
        let first = render_system_message(base, &[entry(1, AgentStepPhase::Reason, "a")], &Default::default());
        let second = render_system_message(&first, &[entry(1, AgentStepPhase::Reason, "a"), entry(2, AgentStepPhase::Act, "b")], &Default::default());
        assert_eq!(second.matches("--- Scratchpad ---").count(), 1);
        assert!(second.contains("Step 2"));
    }

    #[test]
    fn format_tool_result_truncates_long_output() {
        let long = serde_json::Value::String("x".repeat(10_000));
        let rendered = format_tool_result("shell.exec", true, Some(&long), None);
        assert!(rendered.contains("[truncated]"));
    }

    #[test]
    fn format_tool_result_renders_error() {
        let rendered = format_tool_result("fs.read", false, None, Some("not found"));
        assert_eq!(rendered, "[fs.read] error: not found");
    }
}
