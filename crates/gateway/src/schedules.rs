//! Schedule routes, nested under their pic.

use {
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    },
    serde::Deserialize,
    telegpick_store::types::{Schedule, SchedulePatch},
    uuid::Uuid,
};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const DEFAULT_DAYS: &str = "0000000";
const DEFAULT_DAY_TIME: &str = "00:00";

/// Reject day flags or times the matcher would later skip over.
fn validate_fields(days_of_week: Option<&str>, day_time: Option<&str>) -> ApiResult<()> {
    if let Some(days) = days_of_week {
        telegpick_scheduler::rule::parse_days(days)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    if let Some(time) = day_time {
        telegpick_scheduler::rule::parse_day_time(time)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    Ok(())
}

/// Every schedule operation goes through the owning user's pic first.
async fn ensure_owned(state: &AppState, user_id: &str, pic_id: &str) -> ApiResult<()> {
    state
        .pics
        .get_for_user(user_id, pic_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::bad_request("pic not found"))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub days_of_week: Option<String>,
    pub day_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub schedule_id: String,
    #[serde(flatten)]
    pub patch: SchedulePatch,
}

/// `POST /api/v1/telegpick/{pic_id}/schedule/create`
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(pic_id): Path<String>,
    Json(req): Json<CreateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_owned(&state, &user.id, &pic_id).await?;
    validate_fields(req.days_of_week.as_deref(), req.day_time.as_deref())?;

    let schedule = Schedule {
        id: Uuid::new_v4().to_string(),
        pic_id,
        days_of_week: req.days_of_week.unwrap_or_else(|| DEFAULT_DAYS.to_string()),
        day_time: req.day_time.unwrap_or_else(|| DEFAULT_DAY_TIME.to_string()),
    };
    state.pics.create_schedule(&schedule).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// `PATCH /api/v1/telegpick/{pic_id}/schedule/update`
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(pic_id): Path<String>,
    Json(req): Json<UpdateScheduleRequest>,
) -> ApiResult<Json<Schedule>> {
    ensure_owned(&state, &user.id, &pic_id).await?;
    validate_fields(req.patch.days_of_week.as_deref(), req.patch.day_time.as_deref())?;

    let schedule = state
        .pics
        .patch_schedule(&pic_id, &req.schedule_id, &req.patch)
        .await?;
    Ok(Json(schedule))
}

/// `DELETE /api/v1/telegpick/{pic_id}/{schedule_id}/delete`
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((pic_id, schedule_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    ensure_owned(&state, &user.id, &pic_id).await?;
    state.pics.delete_schedule(&pic_id, &schedule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
