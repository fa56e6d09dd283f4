//! Account routes: register, login, logout, Telegram link confirmation.

use {
    axum::{
        Json,
        extract::State,
        http::{HeaderMap, StatusCode, header::SET_COOKIE},
        response::{IntoResponse, Response},
    },
    serde::{Deserialize, Serialize},
    telegpick_store::types::User,
    tracing::warn,
    uuid::Uuid,
};

use crate::{
    auth::{
        AuthUser, SESSION_COOKIE, generate_link_code, generate_token, hash_password, session_token,
        sha256_hex, verify_password,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub phone: String,
    /// Chat the user opened with the bot; link codes and pushes go there.
    pub chat_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub phone: String,
    pub telegram_linked: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            phone: user.phone,
            telegram_linked: user.telegram_linked,
        }
    }
}

/// `POST /api/v1/users/register`
///
/// Creates the account and issues a link code. Code delivery is best-effort:
/// a Telegram outage does not fail registration, it only logs.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::bad_request("username must not be empty"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let phone = req.phone.trim().to_string();
    if phone.is_empty() {
        return Err(ApiError::bad_request("phone must not be empty"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username,
        password_hash: hash_password(&req.password).map_err(ApiError::Internal)?,
        phone,
        chat_id: req.chat_id,
        link_code_hash: None,
        telegram_linked: false,
    };
    state.users.create_user(&user).await?;

    let code = generate_link_code();
    state
        .users
        .set_link_code_hash(&user.id, &sha256_hex(&code))
        .await?;
    if let Err(error) = state.notifier.send_link_code(user.chat_id, &code).await {
        warn!(user_id = %user.id, %error, "link code delivery failed");
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// `POST /api/v1/users/login`
///
/// Verifies the password and sets the HttpOnly session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let username = req.username.trim().to_lowercase();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let ttl_days = state.config.auth.session_ttl_days;
    let token = generate_token();
    state
        .users
        .insert_session(&token, &user.id, ttl_days)
        .await?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        u64::from(ttl_days) * 86_400
    );
    let mut response = Json(UserResponse::from(user)).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?,
    );
    Ok(response)
}

/// `POST /api/v1/users/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: AuthUser,
) -> ApiResult<StatusCode> {
    if let Some(token) = session_token(&headers) {
        state.users.delete_session(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/users/confirm_code`
///
/// Compares the submitted code's hash against the stored one and marks the
/// Telegram link confirmed.
pub async fn confirm_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ConfirmCodeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let Some(ref expected) = user.link_code_hash else {
        return Err(ApiError::bad_request("no outstanding link code"));
    };
    if &sha256_hex(req.code.trim()) != expected {
        return Err(ApiError::bad_request("invalid link code"));
    }

    state.users.confirm_link(&user.id).await?;
    let confirmed = state
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(UserResponse::from(confirmed)))
}
