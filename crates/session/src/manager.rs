//! Session memory — the journal writer, in-memory prompt window,
//! crash-safe resume, and `create_session` rotation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use ayati_domain::error::{Error, Result};
use ayati_domain::ids::{RunId, SessionId, StepId, ToolCallId};
use ayati_domain::trace::TraceEvent;
use ayati_journal::codec;
use ayati_journal::event::{
    AgentStepPhase, CloseSource, EndStatus, EventBody, SessionEvent, ToolResultStatus, TurnStatus,
};

use crate::background::BackgroundQueue;
use crate::index::SessionIndex;
use crate::inmemory::{latest_turns, ConversationTurn, InMemorySession};

/// Where journal files live, rooted at `data/sessions/YYYY/MM/DD/{id}.md`
/// rooted under a configurable data directory.
pub struct SessionPaths {
    pub root: PathBuf,
}

impl SessionPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, session_id: SessionId, opened_at: chrono::DateTime<chrono::Utc>) -> PathBuf {
        self.root
            .join(opened_at.format("%Y").to_string())
            .join(opened_at.format("%m").to_string())
            .join(opened_at.format("%d").to_string())
            .join(format!("{session_id}.md"))
    }

    pub fn legacy_jsonl_for(&self, session_id: SessionId) -> PathBuf {
        self.root.join("legacy").join(format!("{session_id}.jsonl"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateSessionSource {
    Agent,
    System,
    User,
}

impl From<CreateSessionSource> for CloseSource {
    fn from(s: CreateSessionSource) -> Self {
        match s {
            CreateSessionSource::Agent => CloseSource::Agent,
            CreateSessionSource::System => CloseSource::System,
            CreateSessionSource::User => CloseSource::User,
        }
    }
}

pub struct CreateSessionRequest {
    pub run_id: RunId,
    pub reason: String,
    pub source: CreateSessionSource,
    pub confidence: Option<f64>,
    pub handoff_summary: Option<String>,
}

pub struct CreateSessionOutcome {
    pub previous_session_id: SessionId,
    pub session_id: SessionId,
    pub session_path: String,
}

#[derive(Debug, Clone)]
pub struct PromptMemoryContext {
    pub conversation_turns: Vec<ConversationTurn>,
    pub previous_session_summary: Option<String>,
}

const PROMPT_EVENT_WINDOW: usize = 20;
const RECOVERY_SCAN_WINDOW_HOURS: i64 = 24;
const ROTATION_TURN_THRESHOLD: usize = 2;

/// Type alias for the close-side callback `create_session` enqueues.
pub type CloseCallback = Box<
    dyn FnOnce(Vec<ConversationTurn>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>
        + Send,
>;

pub struct SessionMemoryManager {
    paths: SessionPaths,
    index: Arc<SessionIndex>,
    background: BackgroundQueue,
    active: RwLock<Option<InMemorySession>>,
    static_token_budget: RwLock<Option<u64>>,
}

impl SessionMemoryManager {
    pub fn new(root: impl Into<PathBuf>, index: Arc<SessionIndex>) -> Self {
        Self {
            paths: SessionPaths::new(root),
            index,
            background: BackgroundQueue::spawn(64),
            active: RwLock::new(None),
            static_token_budget: RwLock::new(None),
        }
    }

    /// Attach to persistence and try to restore the active session.
    pub fn initialize(&self, client_id: &str) -> Result<()> {
        self.migrate_legacy_jsonl(client_id)?;

        if let Some((session_id, session_path)) = self.index.active_session(client_id)? {
            if self.try_restore(client_id, session_id, &session_path)? {
                return Ok(());
            }
        }

        for (session_id, meta_client_id) in self.index.recent_sessions(chrono::Duration::hours(RECOVERY_SCAN_WINDOW_HOURS))? {
            if meta_client_id != client_id {
                continue;
            }
            // The index doesn't store journal paths per historical
            // session, only the active one; reconstruct today's/yesterday
            // convention path as the recovery candidate.
            let candidate = self.paths.path_for(session_id, chrono::Utc::now());
            if candidate.exists() && self.try_restore(client_id, session_id, &candidate.display().to_string())? {
                return Ok(());
            }
        }

        // Nothing restored — leave `active` empty; the prompt window is
        // seeded lazily from the index on first `get_prompt_memory_context`.
        Ok(())
    }

    fn try_restore(&self, client_id: &str, session_id: SessionId, session_path: &str) -> Result<bool> {
        let replay = codec::replay(Path::new(session_path), session_id)?;
        if replay.crashed {
            self.index.mark_crashed(session_id)?;
            return Ok(false);
        }
        let opened_for = replay.events.iter().find_map(|e| match &e.event {
            EventBody::SessionOpen { client_id: opened_client, .. } => Some(opened_client.clone()),
            _ => None,
        });
        match opened_for {
            Some(owner) if owner == client_id => {
                let mut session = InMemorySession::new(session_id, client_id, session_path, None);
                session.timeline = replay.events;
                *self.active.write() = Some(session);
                Ok(true)
            }
            _ => {
                self.index.mark_crashed(session_id)?;
                Ok(false)
            }
        }
    }

    fn migrate_legacy_jsonl(&self, client_id: &str) -> Result<()> {
        // Best-effort: if a legacy `.jsonl` exists for the currently
        // pointed-at active session, re-emit its lines as `.md` and
        // remove the old file, atomically from the caller's perspective
        // (write-then-remove).
        let Some((session_id, session_path)) = self.index.active_session(client_id)? else {
            return Ok(());
        };
        let legacy = self.paths.legacy_jsonl_for(session_id);
        if !legacy.exists() {
            return Ok(());
        }
        let replay = codec::replay(&legacy, session_id)?;
        let new_path = Path::new(&session_path);
        for event in &replay.events {
            codec::append(new_path, event)?;
        }
        std::fs::remove_file(&legacy)?;
        Ok(())
    }

    fn ensure_open_session(&self, client_id: &str) -> Result<()> {
        if self.active.read().is_some() {
            return Ok(());
        }
        let session_id = SessionId::new();
        let now = chrono::Utc::now();
        let path = self.paths.path_for(session_id, now);
        let path_str = path.display().to_string();

        let open_event = SessionEvent::new(
            session_id,
            &path_str,
            EventBody::SessionOpen { client_id: client_id.to_string(), parent_session_id: None, handoff_summary: None },
        );
        codec::append(&path, &open_event)?;

        let mut session = InMemorySession::new(session_id, client_id, &path_str, None);
        session.push(open_event);
        *self.active.write() = Some(session);

        self.index.set_active_session(client_id, session_id, &path_str)?;
        self.index.record_session_meta(session_id, client_id)?;
        TraceEvent::JournalAppend { session_id: session_id.to_string(), event_type: "session_open".into() }.emit();
        Ok(())
    }

    /// Two consecutive calls without an intervening
    /// `create_session` return the same `session_id`.
    pub fn begin_run(&self, client_id: &str, user_message: &str) -> Result<(SessionId, RunId)> {
        self.ensure_open_session(client_id)?;
        let event = EventBody::UserMessage { content: user_message.to_string() };
        let session_id = self.append_and_record(event)?;
        Ok((session_id, RunId::new()))
    }

    fn append_and_record(&self, event: EventBody) -> Result<SessionId> {
        let mut guard = self.active.write();
        let session = guard.as_mut().ok_or_else(|| Error::Other("no active session".into()))?;
        let session_event = SessionEvent::new(session.id, &session.session_path, event);
        let event_type = event_type_name(&session_event.event);
        codec::append(Path::new(&session.session_path), &session_event)?;
        session.push(session_event);
        TraceEvent::JournalAppend { session_id: session.id.to_string(), event_type }.emit();
        Ok(session.id)
    }

    pub fn record_assistant_final(&self, content: &str) -> Result<()> {
        self.append_and_record(EventBody::AssistantMessage { content: content.to_string() }).map(|_| ())
    }

    pub fn record_assistant_feedback(&self, message: &str) -> Result<()> {
        self.append_and_record(EventBody::AssistantFeedback { message: message.to_string() }).map(|_| ())
    }

    pub fn record_run_failure(&self, message: &str) -> Result<()> {
        self.append_and_record(EventBody::RunFailure { message: message.to_string() }).map(|_| ())
    }

    pub fn record_turn_status(&self, status: TurnStatus, note: Option<String>) -> Result<()> {
        self.append_and_record(EventBody::TurnStatus { status, note }).map(|_| ())
    }

    pub fn record_tool_call(&self, step_id: StepId, tool_call_id: ToolCallId, tool_name: &str, args: serde_json::Value) -> Result<()> {
        self.append_and_record(EventBody::ToolCall { step_id, tool_call_id, tool_name: tool_name.to_string(), args }).map(|_| ())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_tool_result(
        &self,
        step_id: StepId,
        tool_call_id: ToolCallId,
        tool_name: &str,
        status: ToolResultStatus,
        output: &str,
        error_message: Option<String>,
        error_code: Option<String>,
        duration_ms: Option<u64>,
    ) -> Result<()> {
        self.append_and_record(EventBody::ToolResult {
            step_id,
            tool_call_id,
            tool_name: tool_name.to_string(),
            status,
            output: output.to_string(),
            error_message,
            error_code,
            duration_ms,
        })
        .map(|_| ())
    }

    pub fn record_agent_step(
        &self,
        step: StepId,
        phase: AgentStepPhase,
        summary: &str,
        approaches_tried: Vec<String>,
        action_tool_name: Option<String>,
        end_status: Option<EndStatus>,
    ) -> Result<()> {
        self.append_and_record(EventBody::AgentStep { step, phase, summary: summary.to_string(), approaches_tried, action_tool_name, end_status })
            .map(|_| ())
    }

    /// The only place a session ever switches to a new id.
    pub fn create_session(&self, client_id: &str, req: CreateSessionRequest, close_callback: Option<CloseCallback>) -> Result<CreateSessionOutcome> {
        self.ensure_open_session(client_id)?;

        let (previous_id, countable, turns) = {
            let guard = self.active.read();
            let session = guard.as_ref().expect("ensure_open_session just populated this");
            (session.id, session.countable_count(), latest_turns(&session.timeline, usize::MAX))
        };

        let new_id = SessionId::new();
        let now = chrono::Utc::now();
        let new_path = self.paths.path_for(new_id, now);
        let new_path_str = new_path.display().to_string();

        let token_at_close = (*self.static_token_budget.read()).unwrap_or(0);
        let close_event = EventBody::SessionClose {
            reason: format!("session_switch:{}", req.reason),
            token_at_close,
            event_count: countable as u64,
            handoff_summary: req.handoff_summary.clone(),
            next_session_id: Some(new_id),
            next_session_path: Some(new_path_str.clone()),
        };
        self.append_and_record(close_event)?;

        if countable >= ROTATION_TURN_THRESHOLD {
            if let Some(callback) = close_callback {
                let session_id_str = previous_id.to_string();
                let turns_for_callback = turns;
                self.background.enqueue(session_id_str, countable, async move {
                    (callback)(turns_for_callback).await.map_err(|e| Box::<dyn std::error::Error + Send + Sync>::from(e.to_string()))
                });
            }
        }

        let open_event = SessionEvent::new(
            new_id,
            &new_path_str,
            EventBody::SessionOpen { client_id: client_id.to_string(), parent_session_id: Some(previous_id), handoff_summary: req.handoff_summary.clone() },
        );
        codec::append(&new_path, &open_event)?;
        let mut new_session = InMemorySession::new(new_id, client_id, &new_path_str, Some(previous_id));
        new_session.push(open_event);
        *self.active.write() = Some(new_session);

        self.index.set_active_session(client_id, new_id, &new_path_str)?;
        self.index.record_session_meta(new_id, client_id)?;
        if let Some(summary) = &req.handoff_summary {
            self.index.set_handoff_summary(previous_id, summary)?;
        }

        self.append_and_record(EventBody::TurnStatus {
            status: TurnStatus::SessionSwitched,
            note: Some(format!("rotated from {previous_id}: {}", req.reason)),
        })?;
        if let Some(summary) = &req.handoff_summary {
            self.append_and_record(EventBody::TurnStatus { status: TurnStatus::SessionSwitched, note: Some(summary.clone()) })?;
        }

        TraceEvent::SessionRotated { previous_session_id: previous_id.to_string(), new_session_id: new_id.to_string(), reason: req.reason.clone() }.emit();

        let _ = req.confidence;
        let _ = req.run_id;

        Ok(CreateSessionOutcome { previous_session_id: previous_id, session_id: new_id, session_path: new_path_str })
    }

    /// Agent-step events are not
    /// exposed here — they go to the audit log only.
    pub fn get_prompt_memory_context(&self, client_id: &str) -> Result<PromptMemoryContext> {
        let guard = self.active.read();
        if let Some(session) = guard.as_ref() {
            let turns = latest_turns(&session.timeline, PROMPT_EVENT_WINDOW);
            let summary = match session.parent_session_id {
                Some(parent) => self.index.handoff_summary(parent)?,
                None => None,
            };
            return Ok(PromptMemoryContext { conversation_turns: turns, previous_session_summary: summary });
        }
        drop(guard);

        // No active session yet and nothing restored by `initialize` — the
        // index deliberately doesn't retain enough to reconstruct turns
        // without a journal replay, so the window starts empty.
        let _ = client_id;
        Ok(PromptMemoryContext { conversation_turns: Vec::new(), previous_session_summary: None })
    }

    pub fn set_static_token_budget(&self, tokens: u64) {
        *self.static_token_budget.write() = Some(tokens);
    }

    pub async fn flush_background_tasks(&self) {
        self.background.flush().await;
    }

    /// Writes the active-session marker and drains background tasks.
    /// Does NOT close the active session — it persists across restart.
    pub async fn shutdown(&self, client_id: &str) -> Result<()> {
        if let Some(session) = self.active.read().as_ref() {
            self.index.set_active_session(client_id, session.id, &session.session_path)?;
        }
        self.background.flush().await;
        Ok(())
    }
}

fn event_type_name(body: &EventBody) -> String {
    match body {
        EventBody::SessionOpen { .. } => "session_open",
        EventBody::SessionClose { .. } => "session_close",
        EventBody::UserMessage { .. } => "user_message",
        EventBody::AssistantMessage { .. } => "assistant_message",
        EventBody::AssistantFeedback { .. } => "assistant_feedback",
        EventBody::TurnStatus { .. } => "turn_status",
        EventBody::ToolCall { .. } => "tool_call",
        EventBody::ToolResult { .. } => "tool_result",
        EventBody::RunFailure { .. } => "run_failure",
        EventBody::AgentStep { .. } => "agent_step",
        EventBody::RunLedger { .. } => "run_ledger",
        EventBody::TaskSummary { .. } => "task_summary",
    }
    .to_string()
}
