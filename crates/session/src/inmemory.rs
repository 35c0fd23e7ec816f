//! `InMemorySession` and the derived `ConversationTurn` view.

use ayati_domain::ids::SessionId;
use ayati_journal::event::{EventBody, SessionEvent};

/// A session while it is active in the memory manager. Its `timeline` is
/// the prefix of the on-disk journal file (plus any post-restart events).
#[derive(Debug, Clone)]
pub struct InMemorySession {
    pub id: SessionId,
    pub client_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub session_path: String,
    pub timeline: Vec<SessionEvent>,
    pub parent_session_id: Option<SessionId>,
}

impl InMemorySession {
    pub fn new(id: SessionId, client_id: impl Into<String>, session_path: impl Into<String>, parent_session_id: Option<SessionId>) -> Self {
        Self {
            id,
            client_id: client_id.into(),
            started_at: chrono::Utc::now(),
            session_path: session_path.into(),
            timeline: Vec::new(),
            parent_session_id,
        }
    }

    pub fn push(&mut self, event: SessionEvent) {
        self.timeline.push(event);
    }

    /// Countable events (`user_message`/`assistant_message`) toward the
    /// prompt memory window.
    pub fn countable_count(&self) -> usize {
        self.timeline.iter().filter(|e| e.is_countable()).count()
    }
}

/// A derived view produced from `user_message` + `assistant_message`
/// events.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub session_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Project the latest `limit` countable events into conversation turns,
/// in chronological order.
pub fn latest_turns(events: &[SessionEvent], limit: usize) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = events
        .iter()
        .filter_map(|e| match &e.event {
            EventBody::UserMessage { content } => {
                Some(ConversationTurn { role: Role::User, content: content.clone(), timestamp: e.timestamp, session_path: e.session_path.clone() })
            }
            EventBody::AssistantMessage { content } => {
                Some(ConversationTurn { role: Role::Assistant, content: content.clone(), timestamp: e.timestamp, session_path: e.session_path.clone() })
            }
            _ => None,
        })
        .collect();
    if turns.len() > limit {
        let drop = turns.len() - limit;
        turns.drain(0..drop);
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_turns_caps_and_preserves_order() {
        let sid = SessionId::new();
        let mut events = Vec::new();
        for i in 0..5 {
            events.push(SessionEvent::new(sid, "p", EventBody::UserMessage { content: format!("u{i}") }));
            events.push(SessionEvent::new(sid, "p", EventBody::AssistantMessage { content: format!("a{i}") }));
        }
        let turns = latest_turns(&events, 4);
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "u3");
        assert_eq!(turns.last().unwrap().content, "a4");
    }
}
