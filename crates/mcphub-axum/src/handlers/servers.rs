//! Management API for child server configurations and lifecycle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mcphub_core::{GatewayError, McpServer, McpTool, NewMcpServer, ServerStatus, UpdateMcpServer};
use serde::Serialize;

use crate::error::HttpError;
use crate::state::AppState;

/// A configured server plus its current runtime status.
#[derive(Serialize)]
pub struct ServerView {
    #[serde(flatten)]
    pub server: McpServer,
    pub status: ServerStatus,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ServerView>>, HttpError> {
    let services = state.context.services().await?;
    let servers = services.registry.list_servers().await?;

    let mut views = Vec::with_capacity(servers.len());
    for server in servers {
        let status = services.registry.status(server.id).await;
        views.push(ServerView { server, status });
    }
    Ok(Json(views))
}

pub async fn add(
    State(state): State<AppState>,
    Json(new_server): Json<NewMcpServer>,
) -> Result<(StatusCode, Json<McpServer>), HttpError> {
    let services = state.context.services().await?;
    let server = services.registry.add_server(new_server).await?;
    Ok((StatusCode::CREATED, Json(server)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateMcpServer>,
) -> Result<Json<McpServer>, HttpError> {
    let services = state.context.services().await?;
    let server = services.registry.update_server(id, update).await?;
    Ok(Json(server))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpError> {
    let services = state.context.services().await?;
    services.registry.remove_server(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ServerView>, HttpError> {
    let services = state.context.services().await?;
    services.registry.start(id).await?;

    let server = services.registry.get_server(id).await?;
    let status = services.registry.status(id).await;
    Ok(Json(ServerView { server, status }))
}

/// Tools exposed by one running server, under their original names.
pub async fn tools(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<McpTool>>, HttpError> {
    let services = state.context.services().await?;
    let server = services.registry.get_server(id).await?;

    let connection = services
        .registry
        .connection(id)
        .await
        .ok_or_else(|| HttpError::Conflict(format!("server not running: {}", server.name)))?;
    let tools = connection.list_tools().await.map_err(GatewayError::from)?;
    Ok(Json(tools))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ServerView>, HttpError> {
    let services = state.context.services().await?;
    services.registry.stop(id).await?;

    let server = services.registry.get_server(id).await?;
    let status = services.registry.status(id).await;
    Ok(Json(ServerView { server, status }))
}
