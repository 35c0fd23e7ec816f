//! The pulse reminder data model: schedule variants, the reminder record
//! itself, and the advancement rule `next_trigger_for_schedule`.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use ayati_domain::ids::{OccurrenceId, ReminderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Active,
    Completed,
    Cancelled,
}

/// `once{at}`, `interval{every_ms, anchor_at}`, `daily{hour, minute}`,
/// `weekly{weekday 1..7, hour, minute}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    Once { at: DateTime<Utc> },
    Interval { every_ms: i64, anchor_at: DateTime<Utc> },
    Daily { hour: u32, minute: u32 },
    /// ISO weekday, 1 (Monday) through 7 (Sunday).
    Weekly { weekday: u32, hour: u32, minute: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub client_id: String,
    pub title: String,
    pub instruction: String,
    pub timezone: String,
    pub status: ReminderStatus,
    pub schedule: Schedule,
    pub next_trigger_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_delivered_occurrence_id: Option<OccurrenceId>,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub origin_run_id: Option<String>,
    #[serde(default)]
    pub origin_session_id: Option<String>,
}

impl Reminder {
    /// Invariant: `status = active ⇔ next_trigger_at ≠ null`.
    pub fn invariant_holds(&self) -> bool {
        (self.status == ReminderStatus::Active) == self.next_trigger_at.is_some()
    }
}

/// Resolve a named timezone, falling back to UTC on an unknown name
/// (logged by the caller) rather than panicking.
pub fn resolve_tz(name: &str) -> chrono_tz::Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Advance a schedule from `now` (and, for interval/daily/weekly, from the
/// previously scheduled instant when known). Returns `None` when the
/// schedule has no further occurrence (a `once` that already fired).
pub fn next_trigger_for_schedule(
    schedule: &Schedule,
    tz: chrono_tz::Tz,
    now: DateTime<Utc>,
    current_scheduled_for: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { at } => {
            if current_scheduled_for.is_some() {
                None
            } else {
                Some(*at)
            }
        }
        Schedule::Interval { every_ms, anchor_at } => {
            if *every_ms <= 0 {
                return None;
            }
            let step = chrono::Duration::milliseconds(*every_ms);
            let mut candidate = *anchor_at;
            // Advance from the anchor in fixed steps until strictly after `now`.
            if candidate > now {
                return Some(candidate);
            }
            let elapsed = now - candidate;
            let steps = elapsed.num_milliseconds() / every_ms + 1;
            candidate = candidate + step * (steps as i32);
            while candidate <= now {
                candidate = candidate + step;
            }
            Some(candidate)
        }
        Schedule::Daily { hour, minute } => next_daily_after(tz, now, *hour, *minute),
        Schedule::Weekly { weekday, hour, minute } => next_weekly_after(tz, now, *weekday, *hour, *minute),
    }
}

fn next_daily_after(tz: chrono_tz::Tz, now: DateTime<Utc>, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&tz);
    let today_candidate = tz.with_ymd_and_hms(local_now.year(), local_now.month(), local_now.day(), hour, minute, 0).single()?;
    let candidate = if today_candidate > local_now { today_candidate } else { today_candidate + chrono::Duration::days(1) };
    Some(candidate.with_timezone(&Utc))
}

fn next_weekly_after(tz: chrono_tz::Tz, now: DateTime<Utc>, weekday: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&tz);
    let target_iso = weekday.clamp(1, 7);
    let current_iso = local_now.weekday().number_from_monday();
    let mut days_ahead = (target_iso as i64 - current_iso as i64).rem_euclid(7);
    let mut candidate = tz
        .with_ymd_and_hms(local_now.year(), local_now.month(), local_now.day(), hour, minute, 0)
        .single()?
        + chrono::Duration::days(days_ahead);
    if candidate <= local_now {
        days_ahead += 7;
        candidate = tz
            .with_ymd_and_hms(local_now.year(), local_now.month(), local_now.day(), hour, minute, 0)
            .single()?
            + chrono::Duration::days(days_ahead);
    }
    Some(candidate.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn once_fires_only_before_first_delivery() {
        let at = utc("2026-03-02T09:00:00Z");
        let schedule = Schedule::Once { at };
        assert_eq!(next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T00:00:00Z"), None), Some(at));
        assert_eq!(next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-03T00:00:00Z"), Some(at)), None);
    }

    #[test]
    fn interval_advances_past_now() {
        let schedule = Schedule::Interval { every_ms: 60_000, anchor_at: utc("2026-03-01T00:00:00Z") };
        let next = next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T00:02:30Z"), Some(utc("2026-03-01T00:02:00Z"))).unwrap();
        assert!(next > utc("2026-03-01T00:02:30Z"));
        assert_eq!(next, utc("2026-03-01T00:03:00Z"));
    }

    #[test]
    fn daily_picks_today_if_time_not_yet_passed() {
        let schedule = Schedule::Daily { hour: 9, minute: 0 };
        let next = next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T08:00:00Z"), None).unwrap();
        assert_eq!(next, utc("2026-03-01T09:00:00Z"));
    }

    #[test]
    fn daily_rolls_to_tomorrow_once_time_has_passed() {
        let schedule = Schedule::Daily { hour: 9, minute: 0 };
        let next = next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T10:00:00Z"), None).unwrap();
        assert_eq!(next, utc("2026-03-02T09:00:00Z"));
    }

    #[test]
    fn later_now_yields_strictly_greater_next_trigger() {
        let schedule = Schedule::Daily { hour: 9, minute: 0 };
        let a = next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T08:00:00Z"), None).unwrap();
        let b = next_trigger_for_schedule(&schedule, chrono_tz::UTC, utc("2026-03-01T09:30:00Z"), None).unwrap();
        assert!(b > a);
    }
}
