//! The reminder store: a single JSON document under
//! `data/pulse/reminders.json`. All mutations are serialized by a
//! process-wide async mutex and persisted via a `.tmp-<uuid>` file
//! followed by an atomic rename.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use ayati_domain::ids::{OccurrenceId, ReminderId};

use crate::model::{Reminder, ReminderStatus, Schedule};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreDocument {
    version: u32,
    reminders: Vec<Reminder>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self { version: 1, reminders: Vec::new() }
    }
}

pub struct PulseStore {
    path: PathBuf,
    inner: Mutex<StoreDocument>,
}

#[derive(thiserror::Error, Debug)]
pub enum PulseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reminder not found: {0}")]
    NotFound(String),
}

pub struct CreateReminderRequest {
    pub client_id: String,
    pub title: String,
    pub instruction: String,
    pub timezone: String,
    pub schedule: Schedule,
    pub next_trigger_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub origin_run_id: Option<String>,
    pub origin_session_id: Option<String>,
}

impl PulseStore {
    /// Load from `path` (creating an empty document if absent).
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, PulseError> {
        let path = path.into();
        let doc = if path.exists() {
            let text = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&text)?
        } else {
            StoreDocument::default()
        };
        Ok(Self { path, inner: Mutex::new(doc) })
    }

    async fn persist(&self, doc: &StoreDocument) -> Result<(), PulseError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.path.with_file_name(format!(".tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn create(&self, req: CreateReminderRequest) -> Result<Reminder, PulseError> {
        let now = Utc::now();
        let reminder = Reminder {
            id: ReminderId::new(),
            client_id: req.client_id,
            title: req.title,
            instruction: req.instruction,
            timezone: req.timezone,
            status: ReminderStatus::Active,
            schedule: req.schedule,
            next_trigger_at: Some(req.next_trigger_at),
            created_at: now,
            updated_at: now,
            last_delivered_occurrence_id: None,
            last_triggered_at: None,
            metadata: req.metadata,
            origin_run_id: req.origin_run_id,
            origin_session_id: req.origin_session_id,
        };
        let mut guard = self.inner.lock().await;
        guard.reminders.push(reminder.clone());
        self.persist(&guard).await?;
        Ok(reminder)
    }

    pub async fn list(&self, status: Option<ReminderStatus>, limit: Option<usize>) -> Vec<Reminder> {
        let guard = self.inner.lock().await;
        let mut out: Vec<Reminder> = guard
            .reminders
            .iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }

    pub async fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.inner.lock().await.reminders.iter().find(|r| r.id == id).cloned()
    }

    pub async fn cancel(&self, id: ReminderId) -> Result<Reminder, PulseError> {
        let mut guard = self.inner.lock().await;
        let reminder = guard.reminders.iter_mut().find(|r| r.id == id).ok_or_else(|| PulseError::NotFound(id.to_string()))?;
        reminder.status = ReminderStatus::Cancelled;
        reminder.next_trigger_at = None;
        reminder.updated_at = Utc::now();
        let out = reminder.clone();
        self.persist(&guard).await?;
        Ok(out)
    }

    pub async fn snooze(&self, id: ReminderId, delay_ms: i64) -> Result<Reminder, PulseError> {
        let mut guard = self.inner.lock().await;
        let reminder = guard.reminders.iter_mut().find(|r| r.id == id).ok_or_else(|| PulseError::NotFound(id.to_string()))?;
        let base = reminder.next_trigger_at.unwrap_or_else(Utc::now);
        reminder.next_trigger_at = Some(base + chrono::Duration::milliseconds(delay_ms));
        reminder.status = ReminderStatus::Active;
        reminder.updated_at = Utc::now();
        let out = reminder.clone();
        self.persist(&guard).await?;
        Ok(out)
    }

    /// All active reminders whose `next_trigger_at` is at or before `now`.
    pub async fn get_due(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        let guard = self.inner.lock().await;
        guard
            .reminders
            .iter()
            .filter(|r| r.status == ReminderStatus::Active && r.next_trigger_at.map(|t| t <= now).unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Idempotent: a repeat call with the same `occurrence_id` is a no-op.
    /// `once` schedules complete; all other kinds recompute
    /// `next_trigger_at` from the just-delivered `scheduled_for`.
    pub async fn mark_delivered(
        &self,
        reminder_id: ReminderId,
        occurrence_id: OccurrenceId,
        scheduled_for: DateTime<Utc>,
        triggered_at: DateTime<Utc>,
    ) -> Result<Reminder, PulseError> {
        let mut guard = self.inner.lock().await;
        let reminder =
            guard.reminders.iter_mut().find(|r| r.id == reminder_id).ok_or_else(|| PulseError::NotFound(reminder_id.to_string()))?;

        if reminder.last_delivered_occurrence_id.as_ref() == Some(&occurrence_id) {
            return Ok(reminder.clone());
        }

        reminder.last_delivered_occurrence_id = Some(occurrence_id);
        reminder.last_triggered_at = Some(triggered_at);
        reminder.updated_at = triggered_at;

        match &reminder.schedule {
            Schedule::Once { .. } => {
                reminder.status = ReminderStatus::Completed;
                reminder.next_trigger_at = None;
            }
            other => {
                let tz = crate::model::resolve_tz(&reminder.timezone);
                reminder.next_trigger_at = crate::model::next_trigger_for_schedule(other, tz, scheduled_for, Some(scheduled_for));
                if reminder.next_trigger_at.is_none() {
                    reminder.status = ReminderStatus::Completed;
                }
            }
        }

        let out = reminder.clone();
        self.persist(&guard).await?;
        Ok(out)
    }

    /// A timezone-aware snapshot of "now", used by callers (e.g. the CLI)
    /// to display the current local time for a reminder's timezone.
    pub fn now_snapshot(&self, tz: chrono_tz::Tz) -> DateTime<chrono_tz::Tz> {
        Utc::now().with_timezone(&tz)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, PulseStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PulseStore::load(dir.path().join("reminders.json")).await.unwrap();
        (dir, store)
    }

    fn req(at: DateTime<Utc>) -> CreateReminderRequest {
        CreateReminderRequest {
            client_id: "client-1".into(),
            title: "birthday".into(),
            instruction: "wish happy birthday".into(),
            timezone: "UTC".into(),
            schedule: Schedule::Once { at },
            next_trigger_at: at,
            metadata: serde_json::json!({}),
            origin_run_id: None,
            origin_session_id: None,
        }
    }

    #[tokio::test]
    async fn create_persists_to_disk_as_json() {
        let (_dir, store) = store().await;
        let at = Utc::now() + chrono::Duration::days(1);
        let reminder = store.create(req(at)).await.unwrap();
        assert!(store.path().exists());
        let reloaded = PulseStore::load(store.path()).await.unwrap();
        let found = reloaded.get(reminder.id).await.unwrap();
        assert_eq!(found.title, "birthday");
    }

    #[tokio::test]
    async fn mark_delivered_twice_is_idempotent() {
        let (_dir, store) = store().await;
        let at = Utc::now() - chrono::Duration::minutes(1);
        let reminder = store.create(req(at)).await.unwrap();
        let occurrence = OccurrenceId::new(reminder.id, at);

        let first = store.mark_delivered(reminder.id, occurrence.clone(), at, Utc::now()).await.unwrap();
        assert_eq!(first.status, ReminderStatus::Completed);

        let second = store.mark_delivered(reminder.id, occurrence, at, Utc::now()).await.unwrap();
        assert_eq!(second.updated_at, first.updated_at);
    }

    #[tokio::test]
    async fn once_schedule_completes_on_delivery() {
        let (_dir, store) = store().await;
        let at = Utc::now() - chrono::Duration::minutes(1);
        let reminder = store.create(req(at)).await.unwrap();
        let occurrence = OccurrenceId::new(reminder.id, at);
        let delivered = store.mark_delivered(reminder.id, occurrence, at, Utc::now()).await.unwrap();
        assert_eq!(delivered.status, ReminderStatus::Completed);
        assert!(delivered.next_trigger_at.is_none());
    }

    #[tokio::test]
    async fn cancel_clears_next_trigger() {
        let (_dir, store) = store().await;
        let at = Utc::now() + chrono::Duration::hours(1);
        let reminder = store.create(req(at)).await.unwrap();
        let cancelled = store.cancel(reminder.id).await.unwrap();
        assert_eq!(cancelled.status, ReminderStatus::Cancelled);
        assert!(cancelled.next_trigger_at.is_none());
    }

    #[tokio::test]
    async fn get_due_only_returns_active_past_due_reminders() {
        let (_dir, store) = store().await;
        let past = Utc::now() - chrono::Duration::minutes(5);
        let future = Utc::now() + chrono::Duration::hours(1);
        let due = store.create(req(past)).await.unwrap();
        store.create(req(future)).await.unwrap();
        let result = store.get_due(Utc::now()).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, due.id);
    }
}
