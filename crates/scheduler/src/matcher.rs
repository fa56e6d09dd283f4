//! Per-tick scan of every pic and rule against one UTC instant.

use {
    chrono::{DateTime, Utc},
    telegpick_store::types::{Pic, PicSnapshot, Schedule, User},
    tracing::warn,
};

use crate::{offset, rule};

/// One hit: a schedule whose local minute equals the tick's local minute.
#[derive(Debug, Clone)]
pub struct TickMatch {
    pub pic: Pic,
    pub schedule: Schedule,
    pub owner: User,
}

/// Evaluate the snapshot against `now`.
///
/// Pure in (snapshot, instant): the same inputs always yield the same match
/// set. A pic with a malformed offset, or a rule with a malformed time or day
/// flags, is skipped and logged with its id; the scan always covers every
/// remaining pic and rule. Match order follows snapshot order but carries no
/// guarantee downstream.
pub fn find_matches(snapshot: &[PicSnapshot], now: DateTime<Utc>) -> Vec<TickMatch> {
    let mut matches = Vec::new();

    for entry in snapshot {
        let local = match offset::resolve(now, &entry.pic.timezone) {
            Ok(local) => local,
            Err(error) => {
                warn!(pic_id = %entry.pic.id, %error, "skipping pic with malformed offset");
                continue;
            },
        };

        for schedule in &entry.schedules {
            match rule::matches(schedule, local) {
                Ok(true) => matches.push(TickMatch {
                    pic: entry.pic.clone(),
                    schedule: schedule.clone(),
                    owner: entry.owner.clone(),
                }),
                Ok(false) => {},
                Err(error) => {
                    warn!(
                        schedule_id = %schedule.id,
                        pic_id = %entry.pic.id,
                        %error,
                        "skipping malformed schedule"
                    );
                },
            }
        }
    }

    matches
}
