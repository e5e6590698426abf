//! Management API for workspaces.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mcphub_core::{NewWorkspace, Workspace, WorkspaceKind};
use serde::Deserialize;

use crate::error::HttpError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Workspace>>, HttpError> {
    Ok(Json(state.workspaces.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    name: String,
    #[serde(default)]
    kind: WorkspaceKind,
    /// Store path or URL; local workspaces default to `<name>.db`.
    store: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<Workspace>), HttpError> {
    let store = request
        .store
        .unwrap_or_else(|| format!("{}.db", request.name));
    let workspace = state
        .workspaces
        .create(NewWorkspace {
            name: request.name,
            kind: request.kind,
            store,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn switch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Workspace>, HttpError> {
    Ok(Json(state.workspaces.switch(id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    state.workspaces.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
