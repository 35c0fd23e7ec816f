//! The pulse poll loop: wakes on a fixed interval, pulls due reminders from
//! the store, and dispatches each to a delivery handler exactly once per
//! occurrence at a time. Grounded in the teacher's `ScheduleRunner` /
//! `ConcurrencyGuard` (crates/gateway/src/runtime/schedule_runner.rs),
//! simplified: the spec's retry policy is unconditional retry-until-delivered
//! rather than the teacher's missed-window catch-up/backoff, so there is no
//! cooldown or max-concurrency accounting here — only single-flight dedup
//! per occurrence.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Notify, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};

use ayati_domain::ids::OccurrenceId;
use ayati_domain::trace::TraceEvent;

use crate::model::Reminder;
use crate::store::PulseStore;

const MIN_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

#[async_trait]
pub trait ReminderDeliveryHandler: Send + Sync {
    /// Deliver a single due occurrence. Returning `false` leaves the
    /// reminder due so the next poll retries it.
    async fn on_reminder_due(&self, reminder: Reminder, occurrence_id: OccurrenceId, scheduled_for: chrono::DateTime<Utc>) -> bool;
}

pub struct PulseScheduler {
    store: Arc<PulseStore>,
    handler: Arc<dyn ReminderDeliveryHandler>,
    poll_interval_ms: u64,
    in_flight: RwLock<HashSet<OccurrenceId>>,
    stop: Notify,
    done: Notify,
}

impl PulseScheduler {
    pub fn new(store: Arc<PulseStore>, handler: Arc<dyn ReminderDeliveryHandler>, poll_interval_ms: u64) -> Self {
        Self {
            store,
            handler,
            poll_interval_ms: poll_interval_ms.max(MIN_POLL_INTERVAL_MS),
            in_flight: RwLock::new(HashSet::new()),
            stop: Notify::new(),
            done: Notify::new(),
        }
    }

    pub fn with_default_interval(store: Arc<PulseStore>, handler: Arc<dyn ReminderDeliveryHandler>) -> Self {
        Self::new(store, handler, DEFAULT_POLL_INTERVAL_MS)
    }

    /// Runs until `stop()` is called. Never re-entrant: a tick that is still
    /// delivering occurrences when the next interval fires simply lets those
    /// occurrences stay in `in_flight` and skips them on this tick.
    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_millis(self.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = self.stop.notified() => {
                    break;
                }
            }
        }
        self.done.notify_waiters();
    }

    /// Requests the loop stop taking new ticks and waits for the
    /// in-flight tick (if any) to settle before returning.
    pub async fn stop(&self) {
        self.stop.notify_one();
        self.done.notified().await;
    }

    async fn tick(&self) {
        let now = Utc::now();
        let due = self.store.get_due(now).await;
        let mut delivered = 0usize;
        let mut skipped_in_flight = 0usize;

        for reminder in due {
            let scheduled_for = match reminder.next_trigger_at {
                Some(t) => t,
                None => continue,
            };
            let occurrence_id = OccurrenceId::new(reminder.id, scheduled_for);

            {
                let mut in_flight = self.in_flight.write().await;
                if in_flight.contains(&occurrence_id) {
                    skipped_in_flight += 1;
                    continue;
                }
                in_flight.insert(occurrence_id.clone());
            }

            let ok = self.handler.on_reminder_due(reminder.clone(), occurrence_id.clone(), scheduled_for).await;
            if ok {
                let _ = self.store.mark_delivered(reminder.id, occurrence_id.clone(), scheduled_for, Utc::now()).await;
                delivered += 1;
            }

            TraceEvent::PulseDelivery { reminder_id: reminder.id.to_string(), occurrence_id: occurrence_id.to_string(), ok }.emit();

            self.in_flight.write().await.remove(&occurrence_id);
        }

        TraceEvent::PulseTick { due_count: delivered + skipped_in_flight, delivered, skipped_in_flight }.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CreateReminderRequest;
    use parking_lot::Mutex;

    struct CountingHandler {
        calls: Mutex<Vec<String>>,
        succeed: bool,
    }

    #[async_trait]
    impl ReminderDeliveryHandler for CountingHandler {
        async fn on_reminder_due(&self, reminder: Reminder, _occurrence_id: OccurrenceId, _scheduled_for: chrono::DateTime<Utc>) -> bool {
            self.calls.lock().push(reminder.title.clone());
            self.succeed
        }
    }

    async fn store() -> (tempfile::TempDir, Arc<PulseStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PulseStore::load(dir.path().join("reminders.json")).await.unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn tick_delivers_due_reminder_exactly_once() {
        let (_dir, store) = store().await;
        let past = Utc::now() - chrono::Duration::minutes(1);
        store
            .create(CreateReminderRequest {
                client_id: "client-1".into(),
                title: "water plants".into(),
                instruction: "water plants".into(),
                timezone: "UTC".into(),
                schedule: crate::model::Schedule::Once { at: past },
                next_trigger_at: past,
                metadata: serde_json::json!({}),
                origin_run_id: None,
                origin_session_id: None,
            })
            .await
            .unwrap();

        let handler = Arc::new(CountingHandler { calls: Mutex::new(Vec::new()), succeed: true });
        let scheduler = PulseScheduler::new(store.clone(), handler.clone(), MIN_POLL_INTERVAL_MS);
        scheduler.tick().await;
        assert_eq!(handler.calls.lock().len(), 1);

        // Second tick: the reminder is now Completed, so it's no longer due.
        scheduler.tick().await;
        assert_eq!(handler.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_leaves_reminder_due_for_retry() {
        let (_dir, store) = store().await;
        let past = Utc::now() - chrono::Duration::minutes(1);
        let reminder = store
            .create(CreateReminderRequest {
                client_id: "client-1".into(),
                title: "call mom".into(),
                instruction: "call mom".into(),
                timezone: "UTC".into(),
                schedule: crate::model::Schedule::Once { at: past },
                next_trigger_at: past,
                metadata: serde_json::json!({}),
                origin_run_id: None,
                origin_session_id: None,
            })
            .await
            .unwrap();

        let handler = Arc::new(CountingHandler { calls: Mutex::new(Vec::new()), succeed: false });
        let scheduler = PulseScheduler::new(store.clone(), handler.clone(), MIN_POLL_INTERVAL_MS);
        scheduler.tick().await;
        assert_eq!(handler.calls.lock().len(), 1);

        let still_active = store.get(reminder.id).await.unwrap();
        assert_eq!(still_active.status, crate::model::ReminderStatus::Active);

        scheduler.tick().await;
        assert_eq!(handler.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn stop_waits_for_the_run_loop_to_exit() {
        let (_dir, store) = store().await;
        let handler = Arc::new(CountingHandler { calls: Mutex::new(Vec::new()), succeed: true });
        let scheduler = Arc::new(PulseScheduler::new(store.clone(), handler.clone(), MIN_POLL_INTERVAL_MS));

        let run_scheduler = scheduler.clone();
        let run_handle = tokio::spawn(async move { run_scheduler.run().await });

        scheduler.stop().await;
        tokio::time::timeout(Duration::from_secs(1), run_handle).await.expect("run loop exited after stop").unwrap();
    }
}
