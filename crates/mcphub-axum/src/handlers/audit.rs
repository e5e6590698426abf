//! Management API for the audit log.

use axum::extract::{Query, State};
use axum::Json;
use mcphub_core::{AuditPage, AuditStats};
use serde::Deserialize;

use crate::error::HttpError;
use crate::state::AppState;

const fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    cursor: Option<String>,
}

pub async fn page(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditPage>, HttpError> {
    let services = state.context.services().await?;
    let page = services
        .audit
        .page(query.limit, query.cursor.as_deref())
        .await?;
    Ok(Json(page))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<AuditStats>, HttpError> {
    let services = state.context.services().await?;
    Ok(Json(services.audit.stats().await?))
}
