//! Management API for bearer tokens.
//!
//! The token secret appears exactly once, in the issue response.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mcphub_core::{ApiToken, NewApiToken};
use serde::Serialize;

use crate::error::HttpError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ApiToken>>, HttpError> {
    let services = state.context.services().await?;
    Ok(Json(services.validator.list_tokens().await?))
}

pub async fn issue(
    State(state): State<AppState>,
    Json(request): Json<NewApiToken>,
) -> Result<(StatusCode, Json<ApiToken>), HttpError> {
    let services = state.context.services().await?;
    let token = services.validator.issue(request).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn revoke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let services = state.context.services().await?;
    services.validator.revoke(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct RevokedCount {
    pub removed: u64,
}

pub async fn revoke_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<RevokedCount>, HttpError> {
    let services = state.context.services().await?;
    let removed = services.validator.revoke_for_client(&client_id).await?;
    Ok(Json(RevokedCount { removed }))
}
