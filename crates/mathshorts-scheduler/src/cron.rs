//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds)
//! Field forms: *, */N, N, N-M, comma lists (mixable, e.g. "1-5" or "0,30").
//! DOW: 0-7 where both 0 and 7 mean Sunday.
//! The weekday cadence ("0 6 * * 1-5") needs real range and DOW support.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Parse a cron expression and compute the next run time after `after`.
pub fn next_run_from_cron(expression: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        tracing::warn!(
            "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
            expression
        );
        return None;
    }

    let minutes = parse_field(parts[0], 0, 59)?;
    let hours = parse_field(parts[1], 0, 23)?;
    let days = parse_field(parts[2], 1, 31)?;
    let months = parse_field(parts[3], 1, 12)?;
    let weekdays = parse_field(parts[4], 0, 7)?;

    let mut candidate = (after + Duration::minutes(1))
        .with_second(0)
        .unwrap_or(after)
        .with_nanosecond(0)
        .unwrap_or(after);

    // Scan up to a year ahead; DOM/MON patterns can be that sparse.
    for _ in 0..(366 * 24 * 60) {
        let dow = candidate.weekday().num_days_from_sunday();
        if minutes.contains(&candidate.minute())
            && hours.contains(&candidate.hour())
            && days.contains(&candidate.day())
            && months.contains(&candidate.month())
            && (weekdays.contains(&dow) || (dow == 0 && weekdays.contains(&7)))
        {
            return Some(candidate);
        }
        candidate += Duration::minutes(1);
    }

    None
}

/// Parse a cron field into the set of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    // */N — every N
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    // Comma list of atoms; each atom is N or N-M.
    let mut values = Vec::new();
    for atom in field.split(',') {
        let atom = atom.trim();
        if let Some((lo, hi)) = atom.split_once('-') {
            let lo: u32 = lo.parse().ok()?;
            let hi: u32 = hi.parse().ok()?;
            if lo > hi || lo < min || hi > max {
                return None;
            }
            values.extend(lo..=hi);
        } else {
            let n: u32 = atom.parse().ok()?;
            if n < min || n > max {
                return None;
            }
            values.push(n);
        }
    }
    if values.is_empty() { None } else { Some(values) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn test_every_hour() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 30, 0).unwrap();
        let next = next_run_from_cron("0 * * * *", after).unwrap();
        assert_eq!(next.hour(), 11);
        assert_eq!(next.minute(), 0);
    }

    #[test]
    fn test_weekday_range_skips_weekend() {
        // 2026-02-21 is a Saturday.
        let after = Utc.with_ymd_and_hms(2026, 2, 21, 0, 0, 0).unwrap();
        let next = next_run_from_cron("0 6 * * 1-5", after).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.day(), 23);
        assert_eq!(next.hour(), 6);
        assert_eq!(next.minute(), 0);
    }

    #[test]
    fn test_friday_only() {
        // 2026-02-23 is a Monday; next Friday is the 27th.
        let after = Utc.with_ymd_and_hms(2026, 2, 23, 13, 0, 0).unwrap();
        let next = next_run_from_cron("0 12 * * 5", after).unwrap();
        assert_eq!(next.weekday(), Weekday::Fri);
        assert_eq!(next.day(), 27);
        assert_eq!(next.hour(), 12);
    }

    #[test]
    fn test_sunday_as_seven() {
        let after = Utc.with_ymd_and_hms(2026, 2, 23, 0, 0, 0).unwrap();
        let next = next_run_from_cron("0 9 * * 7", after).unwrap();
        assert_eq!(next.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_every_15_minutes() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 2, 0).unwrap();
        let next = next_run_from_cron("*/15 * * * *", after).unwrap();
        assert_eq!(next.minute(), 15);
    }

    #[test]
    fn test_comma_list_with_range() {
        let after = Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap();
        let next = next_run_from_cron("5,40-42 * * * *", after).unwrap();
        assert_eq!(next.minute(), 5);
    }

    #[test]
    fn test_invalid_expressions() {
        let after = Utc::now();
        assert!(next_run_from_cron("bad", after).is_none());
        assert!(next_run_from_cron("61 * * * *", after).is_none());
        assert!(next_run_from_cron("5-2 * * * *", after).is_none());
    }
}
