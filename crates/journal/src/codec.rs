//! The journal codec: append one event to an open session file,
//! replay a file into an in-memory timeline, and classify events as
//! countable. One JSON object per line.

use std::io::Write;
use std::path::Path;

use ayati_domain::error::{Error, Result};
use ayati_domain::ids::SessionId;

use crate::event::SessionEvent;

/// Append a single event as one line to the session file at `path`,
/// creating it if necessary. Journal write failures are fatal to the
/// caller — they propagate rather than being swallowed.
pub fn append(path: &Path, event: &SessionEvent) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(event)?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_data()?;
    Ok(())
}

/// Outcome of replaying a session file.
pub struct ReplayResult {
    pub events: Vec<SessionEvent>,
    /// True when no `SessionOpen` event was found — the file is treated as
    /// crashed and the caller should mark it for recovery.
    pub crashed: bool,
}

/// Replay a session file into an ordered list of events, upgrading any
/// `v=1` lines encountered and skipping corrupt lines with a warning
/// rather than aborting.
pub fn replay(path: &Path, session_id: SessionId) -> Result<ReplayResult> {
    if !path.exists() {
        return Ok(ReplayResult { events: Vec::new(), crashed: true });
    }
    let raw = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, session_id) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping corrupt journal line"
                );
            }
        }
    }
    let crashed = !events.iter().any(|e| matches!(e.event, crate::event::EventBody::SessionOpen { .. }));
    Ok(ReplayResult { events, crashed })
}

/// Parse one line, upgrading a bare `v=1` object (missing `session_path`)
/// by filling the legacy convention path.
fn parse_line(line: &str, session_id: SessionId) -> Result<SessionEvent> {
    let mut value: serde_json::Value = serde_json::from_str(line)?;
    let v = value.get("v").and_then(|v| v.as_u64()).unwrap_or(1);
    if v == 1 && value.get("session_path").is_none() {
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "session_path".into(),
                serde_json::Value::String(legacy_session_path(session_id)),
            );
            obj.insert("v".into(), serde_json::Value::from(2u64));
        }
    }
    serde_json::from_value(value).map_err(Error::Json)
}

fn legacy_session_path(session_id: SessionId) -> String {
    format!("sessions/legacy/{session_id}.md")
}

/// True for event types that count toward the prompt memory window.
pub fn is_countable(event: &SessionEvent) -> bool {
    event.is_countable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBody;
    use tempfile::tempdir;

    #[test]
    fn append_then_replay_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.md");
        let sid = SessionId::new();

        let e1 = SessionEvent::new(
            sid,
            path.display().to_string(),
            EventBody::SessionOpen { client_id: "c1".into(), parent_session_id: None, handoff_summary: None },
        );
        let e2 = SessionEvent::new(
            sid,
            path.display().to_string(),
            EventBody::UserMessage { content: "hi".into() },
        );
        append(&path, &e1).unwrap();
        append(&path, &e2).unwrap();

        let result = replay(&path, sid).unwrap();
        assert!(!result.crashed);
        assert_eq!(result.events.len(), 2);
    }

    #[test]
    fn missing_session_open_marks_crashed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.md");
        let sid = SessionId::new();
        let e = SessionEvent::new(sid, path.display().to_string(), EventBody::UserMessage { content: "x".into() });
        append(&path, &e).unwrap();

        let result = replay(&path, sid).unwrap();
        assert!(result.crashed);
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn corrupt_line_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.md");
        let sid = SessionId::new();
        let e = SessionEvent::new(
            sid,
            path.display().to_string(),
            EventBody::SessionOpen { client_id: "c1".into(), parent_session_id: None, handoff_summary: None },
        );
        append(&path, &e).unwrap();
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            use std::io::Write;
            writeln!(f, "{{not valid json").unwrap();
        }
        let e2 = SessionEvent::new(sid, path.display().to_string(), EventBody::UserMessage { content: "after".into() });
        append(&path, &e2).unwrap();

        let result = replay(&path, sid).unwrap();
        assert!(!result.crashed);
        assert_eq!(result.events.len(), 2);
    }

    #[test]
    fn v1_line_without_session_path_is_upgraded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.md");
        let sid = SessionId::new();
        let line = serde_json::json!({
            "v": 1,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "session_id": sid.0,
            "type": "user_message",
            "content": "legacy"
        });
        std::fs::write(&path, format!("{}\n", line)).unwrap();

        let result = replay(&path, sid).unwrap();
        assert_eq!(result.events.len(), 1);
        assert!(result.events[0].session_path.contains("legacy"));
    }
}
