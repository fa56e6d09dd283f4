//! Row types and patch inputs shared by the gateway and the tick worker.

use serde::{Deserialize, Serialize};

/// An account. `password_hash` never leaves this crate's consumers as-is;
/// API responses use their own DTOs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub phone: String,
    /// Telegram chat the user opened with the bot; link codes and pictures
    /// are delivered there.
    pub chat_id: i64,
    /// Hash of the outstanding link code, if one was issued.
    pub link_code_hash: Option<String>,
    /// Set once the user has confirmed a link code.
    pub telegram_linked: bool,
}

/// A schedulable picture. `timezone` is a signed UTC offset (`±HH:MM`)
/// applied to every tick instant before its schedules are evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pic {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub timezone: String,
}

/// A firing rule for one pic: local time-of-day plus a Monday-first 7-flag
/// day-of-week string (`'1'` = active).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub pic_id: String,
    pub days_of_week: String,
    pub day_time: String,
}

/// Partial update for a pic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicPatch {
    pub filename: Option<String>,
    pub timezone: Option<String>,
}

/// Partial update for a schedule.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    pub days_of_week: Option<String>,
    pub day_time: Option<String>,
}

/// A pic with its schedules eagerly attached (list endpoint shape).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PicWithSchedules {
    #[serde(flatten)]
    pub pic: Pic,
    pub schedules: Vec<Schedule>,
}

/// One entry of the tick snapshot: a pic, its schedules, and its owner.
#[derive(Debug, Clone)]
pub struct PicSnapshot {
    pub pic: Pic,
    pub schedules: Vec<Schedule>,
    pub owner: User,
}
