//! Route table and server entry point.

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{delete, get, patch, post},
    },
    tracing::info,
};

use crate::{pics, schedules, state::AppState, users};

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.pics.max_upload_bytes;
    Router::new()
        .route("/api/v1/users/register", post(users::register))
        .route("/api/v1/users/login", post(users::login))
        .route("/api/v1/users/logout", post(users::logout))
        .route("/api/v1/users/confirm_code", post(users::confirm_code))
        .route("/api/v1/telegpick/pic/list", get(pics::list))
        .route("/api/v1/telegpick/pic/create", post(pics::create))
        .route("/api/v1/telegpick/pic/update", patch(pics::update))
        .route("/api/v1/telegpick/upload", post(pics::upload))
        .route("/api/v1/telegpick/{pic_id}/delete", delete(pics::delete))
        .route("/api/v1/telegpick/{pic_id}/picture", get(pics::picture))
        .route(
            "/api/v1/telegpick/{pic_id}/schedule/create",
            post(schedules::create),
        )
        .route(
            "/api/v1/telegpick/{pic_id}/schedule/update",
            patch(schedules::update),
        )
        .route(
            "/api/v1/telegpick/{pic_id}/{schedule_id}/delete",
            delete(schedules::delete),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
