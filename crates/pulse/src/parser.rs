//! A small hand-written recursive-descent matcher over a tokenized,
//! lowercased natural-language schedule expression. The grammar is
//! closed and finite, so no external NLP crate is pulled in — this
//! mirrors the teacher's cron string owning its own parsing rather than
//! delegating to a library.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::model::{next_trigger_for_schedule, Schedule};

const DEFAULT_HOUR: u32 = 9;
const DEFAULT_MINUTE: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ParseError {}

/// Parse a natural-language pulse expression into `(schedule,
/// next_trigger_at)`, anchored at `now`/`tz`.
pub fn parse_pulse_expression(expr: &str, tz: chrono_tz::Tz, now: DateTime<Utc>) -> Result<(Schedule, DateTime<Utc>), ParseError> {
    let lower = expr.trim().to_ascii_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();

    if let Some(schedule) = try_every_weekday(&tokens)? {
        let next = next_trigger_for_schedule(&schedule, tz, now, None).ok_or_else(|| ParseError("no next trigger".into()))?;
        return Ok((schedule, next));
    }
    if let Some(schedule) = try_every_day(&tokens)? {
        let next = next_trigger_for_schedule(&schedule, tz, now, None).ok_or_else(|| ParseError("no next trigger".into()))?;
        return Ok((schedule, next));
    }
    if let Some(schedule) = try_every_n_unit(&tokens, now)? {
        let next = next_trigger_for_schedule(&schedule, tz, now, None).ok_or_else(|| ParseError("no next trigger".into()))?;
        return Ok((schedule, next));
    }
    if let Some(at) = try_in_after_n_unit(&tokens, now)? {
        return Ok((Schedule::Once { at }, at));
    }
    if let Some(at) = try_tomorrow_today(&tokens, tz, now)? {
        return Ok((Schedule::Once { at }, at));
    }
    if let Some(schedule) = try_next_weekday(&tokens)? {
        let next = next_trigger_for_schedule(&schedule, tz, now, None).ok_or_else(|| ParseError("no next trigger".into()))?;
        // `next <weekday>` is a one-off reminder in spec's grammar, not a
        // recurring weekly one — collapse to a `Once` at the computed instant.
        return Ok((Schedule::Once { at: next }, next));
    }
    if let Some(at) = try_next_month_day(&tokens, tz, now)? {
        return Ok((Schedule::Once { at }, at));
    }
    if let Some(at) = try_iso_like(&lower, tz)? {
        return Ok((Schedule::Once { at }, at));
    }

    Err(ParseError(format!("could not parse pulse expression: {expr}")))
}

fn weekday_from_name(name: &str) -> Option<u32> {
    Some(match name {
        "monday" | "mon" => 1,
        "tuesday" | "tue" => 2,
        "wednesday" | "wed" => 3,
        "thursday" | "thu" => 4,
        "friday" | "fri" => 5,
        "saturday" | "sat" => 6,
        "sunday" | "sun" => 7,
        _ => return None,
    })
}

/// Parse a trailing `at <time>` clause; returns `(hour, minute)`,
/// defaulting to 09:00 if absent.
fn parse_time_clause(tokens: &[&str]) -> (u32, u32) {
    if let Some(pos) = tokens.iter().position(|t| *t == "at") {
        if let Some(time_tok) = tokens.get(pos + 1) {
            if let Some((h, m)) = parse_time_token(time_tok) {
                return (h, m);
            }
        }
    }
    (DEFAULT_HOUR, DEFAULT_MINUTE)
}

fn parse_time_token(tok: &str) -> Option<(u32, u32)> {
    let (digits, suffix) = if let Some(stripped) = tok.strip_suffix("am") {
        (stripped, Some(false))
    } else if let Some(stripped) = tok.strip_suffix("pm") {
        (stripped, Some(true))
    } else {
        (tok, None)
    };
    let (h_str, m_str) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None => (digits, "0"),
    };
    let mut hour: u32 = h_str.parse().ok()?;
    let minute: u32 = m_str.parse().ok()?;
    if let Some(is_pm) = suffix {
        if is_pm && hour < 12 {
            hour += 12;
        } else if !is_pm && hour == 12 {
            hour = 0;
        }
    }
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// `every <weekday> [at <time>]`.
fn try_every_weekday(tokens: &[&str]) -> Result<Option<Schedule>, ParseError> {
    if tokens.first() != Some(&"every") {
        return Ok(None);
    }
    let Some(weekday_tok) = tokens.get(1) else { return Ok(None) };
    let Some(weekday) = weekday_from_name(weekday_tok) else { return Ok(None) };
    let (hour, minute) = parse_time_clause(tokens);
    Ok(Some(Schedule::Weekly { weekday, hour, minute }))
}

/// `every day [at <time>]`.
fn try_every_day(tokens: &[&str]) -> Result<Option<Schedule>, ParseError> {
    if tokens.first() != Some(&"every") || tokens.get(1) != Some(&"day") {
        return Ok(None);
    }
    let (hour, minute) = parse_time_clause(tokens);
    Ok(Some(Schedule::Daily { hour, minute }))
}

fn unit_to_ms(unit: &str) -> Option<i64> {
    let unit = unit.trim_end_matches('s');
    Some(match unit {
        "minute" | "min" => 60_000,
        "hour" | "hr" => 3_600_000,
        "day" => 86_400_000,
        "week" => 7 * 86_400_000,
        _ => return None,
    })
}

/// `every <N> <unit>`.
fn try_every_n_unit(tokens: &[&str], now: DateTime<Utc>) -> Result<Option<Schedule>, ParseError> {
    if tokens.first() != Some(&"every") {
        return Ok(None);
    }
    let Some(n_tok) = tokens.get(1) else { return Ok(None) };
    let Ok(n) = n_tok.parse::<i64>() else { return Ok(None) };
    let Some(unit_tok) = tokens.get(2) else { return Ok(None) };
    let Some(unit_ms) = unit_to_ms(unit_tok) else { return Ok(None) };
    Ok(Some(Schedule::Interval { every_ms: n * unit_ms, anchor_at: now }))
}

/// `in/after <N> <unit>`.
fn try_in_after_n_unit(tokens: &[&str], now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ParseError> {
    if tokens.first() != Some(&"in") && tokens.first() != Some(&"after") {
        return Ok(None);
    }
    let Some(n_tok) = tokens.get(1) else { return Ok(None) };
    let Ok(n) = n_tok.parse::<i64>() else { return Ok(None) };
    let Some(unit_tok) = tokens.get(2) else { return Ok(None) };
    let Some(unit_ms) = unit_to_ms(unit_tok) else { return Ok(None) };
    Ok(Some(now + chrono::Duration::milliseconds(n * unit_ms)))
}

/// `tomorrow/today [at <time>]`.
fn try_tomorrow_today(tokens: &[&str], tz: chrono_tz::Tz, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ParseError> {
    let offset_days = match tokens.first() {
        Some(&"tomorrow") => 1,
        Some(&"today") => 0,
        _ => return Ok(None),
    };
    let (hour, minute) = parse_time_clause(tokens);
    let local_now = now.with_timezone(&tz);
    let day = local_now + chrono::Duration::days(offset_days);
    let at = tz
        .with_ymd_and_hms(day.year(), day.month(), day.day(), hour, minute, 0)
        .single()
        .ok_or_else(|| ParseError("ambiguous local time".into()))?;
    Ok(Some(at.with_timezone(&Utc)))
}

/// `next <weekday> [at <time>]`.
fn try_next_weekday(tokens: &[&str]) -> Result<Option<Schedule>, ParseError> {
    if tokens.first() != Some(&"next") {
        return Ok(None);
    }
    let Some(weekday_tok) = tokens.get(1) else { return Ok(None) };
    let Some(weekday) = weekday_from_name(weekday_tok) else { return Ok(None) };
    let (hour, minute) = parse_time_clause(tokens);
    Ok(Some(Schedule::Weekly { weekday, hour, minute }))
}

/// `next month <day>`.
fn try_next_month_day(tokens: &[&str], tz: chrono_tz::Tz, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ParseError> {
    if tokens.first() != Some(&"next") || tokens.get(1) != Some(&"month") {
        return Ok(None);
    }
    let Some(day_tok) = tokens.get(2) else { return Ok(None) };
    let Ok(day) = day_tok.parse::<u32>() else { return Ok(None) };
    let local_now = now.with_timezone(&tz);
    let (hour, minute) = parse_time_clause(tokens);
    let (year, month) = if local_now.month() == 12 { (local_now.year() + 1, 1) } else { (local_now.year(), local_now.month() + 1) };
    let at = tz.with_ymd_and_hms(year, month, day, hour, minute, 0).single().ok_or_else(|| ParseError("invalid day for next month".into()))?;
    Ok(Some(at.with_timezone(&Utc)))
}

/// ISO-like `YYYY-MM-DD[ HH[:MM]]`.
fn try_iso_like(lower: &str, tz: chrono_tz::Tz) -> Result<Option<DateTime<Utc>>, ParseError> {
    let mut parts = lower.splitn(2, ' ');
    let date_part = parts.next().unwrap_or("");
    let time_part = parts.next();

    let date_fields: Vec<&str> = date_part.split('-').collect();
    if date_fields.len() != 3 {
        return Ok(None);
    }
    let (Ok(year), Ok(month), Ok(day)) = (date_fields[0].parse::<i32>(), date_fields[1].parse::<u32>(), date_fields[2].parse::<u32>()) else {
        return Ok(None);
    };
    let (hour, minute) = match time_part {
        Some(t) => parse_time_token(t).unwrap_or((0, 0)),
        None => (0, 0),
    };
    let at = tz.with_ymd_and_hms(year, month, day, hour, minute, 0).single().ok_or_else(|| ParseError("invalid date-time".into()))?;
    Ok(Some(at.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    /// S6 — `tomorrow at 9am`.
    #[test]
    fn tomorrow_at_9am() {
        let now = utc("2026-03-01T12:00:00Z");
        let (schedule, next) = parse_pulse_expression("tomorrow at 9am", chrono_tz::UTC, now).unwrap();
        assert!(matches!(schedule, Schedule::Once { .. }));
        assert_eq!(next, utc("2026-03-02T09:00:00Z"));
    }

    #[test]
    fn every_monday_at_time() {
        let now = utc("2026-03-01T12:00:00Z"); // a Sunday
        let (schedule, next) = parse_pulse_expression("every monday at 8:30", chrono_tz::UTC, now).unwrap();
        assert!(matches!(schedule, Schedule::Weekly { weekday: 1, hour: 8, minute: 30 }));
        assert_eq!(next, utc("2026-03-02T08:30:00Z"));
    }

    #[test]
    fn every_day_defaults_to_9am() {
        let now = utc("2026-03-01T12:00:00Z");
        let (schedule, _) = parse_pulse_expression("every day", chrono_tz::UTC, now).unwrap();
        assert!(matches!(schedule, Schedule::Daily { hour: 9, minute: 0 }));
    }

    #[test]
    fn every_n_unit_interval() {
        let now = utc("2026-03-01T12:00:00Z");
        let (schedule, next) = parse_pulse_expression("every 3 hours", chrono_tz::UTC, now).unwrap();
        assert!(matches!(schedule, Schedule::Interval { every_ms: 10_800_000, .. }));
        assert_eq!(next, utc("2026-03-01T15:00:00Z"));
    }

    #[test]
    fn in_n_minutes_is_a_one_off() {
        let now = utc("2026-03-01T12:00:00Z");
        let (schedule, next) = parse_pulse_expression("in 30 minutes", chrono_tz::UTC, now).unwrap();
        assert!(matches!(schedule, Schedule::Once { .. }));
        assert_eq!(next, utc("2026-03-01T12:30:00Z"));
    }

    #[test]
    fn iso_like_date_time() {
        let (schedule, next) = parse_pulse_expression("2026-04-01 14:30", chrono_tz::UTC, utc("2026-03-01T00:00:00Z")).unwrap();
        assert!(matches!(schedule, Schedule::Once { .. }));
        assert_eq!(next, utc("2026-04-01T14:30:00Z"));
    }

    #[test]
    fn unparseable_expression_errors() {
        let result = parse_pulse_expression("whenever I feel like it", chrono_tz::UTC, utc("2026-03-01T00:00:00Z"));
        assert!(result.is_err());
    }
}
