//! API error surface. Every handler failure becomes a JSON `detail` body.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::error,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("not authenticated")]
    Unauthorized,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }
}

impl From<telegpick_store::Error> for ApiError {
    fn from(err: telegpick_store::Error) -> Self {
        match err {
            telegpick_store::Error::UserExists { username } => {
                Self::BadRequest(format!("user already exists: {username}"))
            },
            telegpick_store::Error::NotFound { entity, .. } => {
                Self::BadRequest(format!("{entity} not found"))
            },
            other => Self::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(source) => {
                error!(error = %source, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
