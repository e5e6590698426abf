//! Route definitions and router construction.
//!
//! Three surfaces: the aggregated MCP endpoints (`/mcp`, `/sse`,
//! `/messages`), the management API under `/api`, and an unauthenticated
//! health probe.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::state::AppState;

/// Management API routes, nested under `/api` by the caller.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Servers API
        .route(
            "/servers",
            get(handlers::servers::list).post(handlers::servers::add),
        )
        .route(
            "/servers/{id}",
            put(handlers::servers::update).delete(handlers::servers::remove),
        )
        .route("/servers/{id}/start", post(handlers::servers::start))
        .route("/servers/{id}/stop", post(handlers::servers::stop))
        .route("/servers/{id}/tools", get(handlers::servers::tools))
        // Tokens API
        .route(
            "/tokens",
            get(handlers::tokens::list).post(handlers::tokens::issue),
        )
        .route("/tokens/{id}", delete(handlers::tokens::revoke))
        .route(
            "/tokens/client/{client_id}",
            delete(handlers::tokens::revoke_client),
        )
        // Audit API
        .route("/audit", get(handlers::audit::page))
        .route("/audit/stats", get(handlers::audit::stats))
        // Workspaces API
        .route(
            "/workspaces",
            get(handlers::workspaces::list).post(handlers::workspaces::create),
        )
        .route("/workspaces/{id}", delete(handlers::workspaces::remove))
        .route(
            "/workspaces/{id}/switch",
            post(handlers::workspaces::switch),
        )
        // Events (SSE)
        .route("/events", get(handlers::events::stream))
}

/// Create the main router with every endpoint wired to shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Aggregated MCP surface
        .route(
            "/mcp",
            post(handlers::mcp::post_rpc).delete(handlers::mcp::delete_rpc),
        )
        .route("/sse", get(handlers::mcp::sse_stream))
        .route("/messages", post(handlers::mcp::post_session_message))
        // Management surface
        .nest("/api", api_routes())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
