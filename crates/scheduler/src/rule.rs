//! Single-rule match decision: day-of-week flags plus local time-of-day.

use {
    chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike},
    telegpick_store::types::Schedule,
};

use crate::{Error, Result};

/// Parse a rule's `HH:MM` local time-of-day.
pub fn parse_day_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| Error::MalformedRuleTime {
        value: value.to_string(),
    })
}

/// Parse the Monday-first string of seven `0`/`1` day flags.
pub fn parse_days(value: &str) -> Result<[bool; 7]> {
    let bytes = value.as_bytes();
    if bytes.len() != 7 || !bytes.iter().all(|b| matches!(b, b'0' | b'1')) {
        return Err(Error::MalformedDays {
            value: value.to_string(),
        });
    }
    let mut days = [false; 7];
    for (day, byte) in days.iter_mut().zip(bytes) {
        *day = *byte == b'1';
    }
    Ok(days)
}

/// Decide whether `rule` fires at the local instant `local`.
///
/// The rule's `day_time` (`HH:MM`) is compared against the local wall clock
/// at minute granularity; seconds never participate. The flag for the *local*
/// date's weekday must be set: an offset that crosses midnight moves the
/// weekday along with the time.
pub fn matches(rule: &Schedule, local: DateTime<FixedOffset>) -> Result<bool> {
    let rule_time = parse_day_time(&rule.day_time)?;
    let days = parse_days(&rule.days_of_week)?;

    let weekday = local.weekday().num_days_from_monday() as usize;
    if !days[weekday] {
        return Ok(false);
    }

    Ok(local.hour() == rule_time.hour() && local.minute() == rule_time.minute())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        chrono::{FixedOffset, TimeZone},
        rstest::rstest,
    };

    use super::*;

    fn schedule(days: &str, time: &str) -> Schedule {
        Schedule {
            id: "s1".into(),
            pic_id: "p1".into(),
            days_of_week: days.into(),
            day_time: time.into(),
        }
    }

    /// 2024-06-03 was a Monday.
    fn monday_at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 3, h, m, s)
            .unwrap()
    }

    #[test]
    fn exact_minute_matches() {
        let rule = schedule("1111111", "14:00");
        assert!(matches(&rule, monday_at(14, 0, 0)).unwrap());
    }

    #[test]
    fn seconds_are_ignored() {
        let rule = schedule("1111111", "14:00");
        assert!(matches(&rule, monday_at(14, 0, 59)).unwrap());
    }

    #[test]
    fn adjacent_minute_does_not_match() {
        let rule = schedule("1111111", "14:00");
        assert!(!matches(&rule, monday_at(14, 1, 0)).unwrap());
        assert!(!matches(&rule, monday_at(13, 59, 0)).unwrap());
    }

    #[test]
    fn inactive_weekday_does_not_match() {
        // Active on Tuesday only; the instant is a Monday.
        let rule = schedule("0100000", "14:00");
        assert!(!matches(&rule, monday_at(14, 0, 0)).unwrap());
    }

    #[test]
    fn active_weekday_matches() {
        let rule = schedule("1000000", "14:00");
        assert!(matches(&rule, monday_at(14, 0, 0)).unwrap());
    }

    #[test]
    fn all_days_disabled_never_matches() {
        let rule = schedule("0000000", "14:00");
        assert!(!matches(&rule, monday_at(14, 0, 0)).unwrap());
    }

    #[rstest]
    #[case("25:00")]
    #[case("12:60")]
    #[case("noon")]
    #[case("")]
    fn malformed_time_rejected(#[case] time: &str) {
        let rule = schedule("1111111", time);
        let err = matches(&rule, monday_at(12, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::MalformedRuleTime { .. }), "{time}");
    }

    #[rstest]
    #[case("111111")]
    #[case("11111111")]
    #[case("1112111")]
    #[case("mtwtfss")]
    fn malformed_days_rejected(#[case] days: &str) {
        let rule = schedule(days, "12:00");
        let err = matches(&rule, monday_at(12, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::MalformedDays { .. }), "{days}");
    }
}
