//! Axum HTTP handlers for the admin boundary
//!
//! Session login, monitor create/toggle/delete, and read-only monitor listing.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar, WithRejection,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    auth::SESSION_COOKIE,
    domain::{
        builder::{ConfigBuilder, MonitorQuery},
        monitor::{Monitor, MonitorId},
    },
    errors::AppError,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub instance: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionParams {
    pub secret: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        instance: state.instance_name.to_string(),
    })
}

pub async fn create_session(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<CreateSessionParams>, AppError>,
    cookies: CookieJar,
) -> Result<(CookieJar, String), AppError> {
    let Some(secret) = params.secret else {
        return Err(AppError::bad_request(
            "missing_secret",
            "missing param `secret`",
        ));
    };

    let session = state.sessions.authenticate(&secret).await?;
    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict);

    Ok((cookies.add(cookie), session.token))
}

pub async fn create_monitor(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MonitorQuery>, AppError>,
    body: Bytes,
) -> Result<(StatusCode, String), AppError> {
    let (kind, common, variant) = query.into_parts(body.to_vec());
    let config = ConfigBuilder::build(kind.as_deref(), &common, &variant)?;

    info!(name = %config.name, policy = ?config.policy(), "creating monitor");
    let id = state.monitors.create(config).await;

    Ok((StatusCode::CREATED, id.to_string()))
}

pub async fn list_monitors(State(state): State<AppState>) -> Json<Vec<Monitor>> {
    Json(state.monitors.list().await)
}

pub async fn get_monitor(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<MonitorId>, AppError>,
) -> Result<Json<Monitor>, AppError> {
    Ok(Json(state.monitors.get(id).await?))
}

pub async fn toggle_monitor(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<MonitorId>, AppError>,
) -> Result<String, AppError> {
    let monitor_state = state.monitors.toggle(id).await?;
    Ok(monitor_state.to_string())
}

pub async fn delete_monitor(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<MonitorId>, AppError>,
) -> Result<&'static str, AppError> {
    state.monitors.delete(id).await?;
    Ok("Monitor was deleted")
}
