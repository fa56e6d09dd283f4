//! Pic routes: list, create, patch, delete, upload, and file download.

use {
    axum::{
        Json,
        body::Bytes,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    telegpick_store::types::{Pic, PicPatch, PicWithSchedules},
    uuid::Uuid,
};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// Reject offset strings the matcher would later skip over.
fn validate_timezone(timezone: &str) -> ApiResult<()> {
    telegpick_scheduler::offset::parse_offset(timezone)
        .map(|_| ())
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct CreatePicRequest {
    pub filename: String,
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePicRequest {
    pub pic_id: String,
    #[serde(flatten)]
    pub patch: PicPatch,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Display name; the stored filename is `{name}-{uuid}.{ext}`.
    pub name: String,
    pub timezone: String,
}

/// `GET /api/v1/telegpick/pic/list?page&limit`
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PicWithSchedules>>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.pics.list_for_user(&user.id, page, limit).await?))
}

/// `POST /api/v1/telegpick/pic/create`
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreatePicRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.filename.trim().is_empty() {
        return Err(ApiError::bad_request("filename must not be empty"));
    }
    validate_timezone(&req.timezone)?;

    let pic = Pic {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        filename: req.filename,
        timezone: req.timezone,
    };
    state.pics.create_pic(&pic).await?;
    Ok((StatusCode::CREATED, Json(pic)))
}

/// `PATCH /api/v1/telegpick/pic/update`
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdatePicRequest>,
) -> ApiResult<Json<Pic>> {
    if let Some(ref timezone) = req.patch.timezone {
        validate_timezone(timezone)?;
    }
    let pic = state.pics.patch_pic(&user.id, &req.pic_id, &req.patch).await?;
    Ok(Json(pic))
}

/// `DELETE /api/v1/telegpick/{pic_id}/delete`
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(pic_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.pics.delete_pic(&user.id, &pic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/telegpick/upload?name&timezone`
///
/// Raw binary body; the original filename comes in `X-Filename` and supplies
/// the stored extension. Writes the file, then creates the pic row.
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    if body.is_empty() {
        return Err(ApiError::bad_request("empty body"));
    }
    if body.len() > state.config.pics.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge);
    }
    validate_timezone(&query.timezone)?;

    let ext = headers
        .get("x-filename")
        .and_then(|v| v.to_str().ok())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::bad_request("missing X-Filename header with extension"))?;

    let filename = format!("{}-{}.{ext}", sanitize_name(&query.name), Uuid::new_v4());
    let directory = &state.config.pics.directory;
    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    tokio::fs::write(directory.join(&filename), &body)
        .await
        .map_err(|_| ApiError::bad_request("there was an error uploading the file"))?;

    let pic = Pic {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        filename,
        timezone: query.timezone,
    };
    state.pics.create_pic(&pic).await?;
    Ok((StatusCode::CREATED, Json(pic)))
}

/// `GET /api/v1/telegpick/{pic_id}/picture`
pub async fn picture(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(pic_id): Path<String>,
) -> ApiResult<Response> {
    let pic = state
        .pics
        .get_for_user(&user.id, &pic_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("pic not found"))?;

    let path = state.config.pics.directory.join(&pic.filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::bad_request("pic file missing"))?;

    Ok(([(CONTENT_TYPE, content_type_for(&pic.filename))], bytes).into_response())
}

/// Keep stored filenames flat: no separators, nothing hidden.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "pic".to_string()
    } else {
        cleaned
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize_name("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_name("holiday-2024"), "holiday-2024");
        assert_eq!(sanitize_name(""), "pic");
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
