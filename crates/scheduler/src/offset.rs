//! Signed UTC offset parsing and application.

use std::sync::LazyLock;

use {
    chrono::{DateTime, FixedOffset, Timelike, Utc},
    regex::Regex,
};

use crate::{Error, Result};

#[allow(clippy::expect_used)]
static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d{2}):(\d{2})$").expect("static pattern"));

/// Parse a `±HH:MM` offset string into a fixed offset.
///
/// Anything that does not match the pattern, or that chrono cannot represent
/// as a fixed offset, is rejected as [`Error::MalformedOffset`].
pub fn parse_offset(offset: &str) -> Result<FixedOffset> {
    let malformed = || Error::MalformedOffset {
        offset: offset.to_string(),
    };

    let caps = OFFSET_RE.captures(offset).ok_or_else(malformed)?;
    let hours: i32 = caps[2].parse().map_err(|_| malformed())?;
    let minutes: i32 = caps[3].parse().map_err(|_| malformed())?;

    let mut east_secs = (hours * 60 + minutes) * 60;
    if &caps[1] == "-" {
        east_secs = -east_secs;
    }

    FixedOffset::east_opt(east_secs).ok_or_else(malformed)
}

/// Shift a UTC instant into the fixed offset described by `offset`
/// (`±HH:MM`), dropping sub-second precision.
///
/// Callers are expected to skip the offending pic on failure rather than
/// abort their scan.
pub fn resolve(utc: DateTime<Utc>, offset: &str) -> Result<DateTime<FixedOffset>> {
    let local = utc.with_timezone(&parse_offset(offset)?);
    Ok(local.with_nanosecond(0).unwrap_or(local))
}
