//! Aggregated MCP endpoints: streamable HTTP and SSE with a companion
//! message endpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::auth::Bearer;
use crate::rpc;
use crate::sessions::SessionGuard;
use crate::state::AppState;

/// `POST /mcp` — one request, one response, stateless between calls.
pub async fn post_rpc(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    Json(body): Json<Value>,
) -> Response {
    match rpc::dispatch(&state, token.as_deref(), body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `DELETE /mcp` — session teardown for streamable HTTP clients. The
/// endpoint holds no per-session state, so this always succeeds.
pub async fn delete_rpc() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `GET /sse` — open an event stream. The first event names the companion
/// message endpoint for this session; responses to messages posted there
/// arrive as `message` events.
pub async fn sse_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let (session_id, receiver) = state.sessions.open();
    tracing::debug!(session_id = %session_id, "Opened SSE session");

    let endpoint = format!("/messages?sessionId={session_id}");
    let opening = stream::once(async move {
        Ok(Event::default().event("endpoint").data(endpoint))
    });

    // The guard lives inside the stream; dropping the stream (client went
    // away) closes the session.
    let guard = SessionGuard::new(session_id, state.sessions.clone());
    let messages = ReceiverStream::new(receiver).map(move |response| {
        let _session = &guard;
        Ok(Event::default().event("message").data(response.to_string()))
    });

    Sse::new(opening.chain(messages)).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(30))
            .text("ping"),
    )
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// `POST /messages?sessionId=...` — session-scoped message. The JSON-RPC
/// response goes out over the session's event stream, not this response.
pub async fn post_session_message(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    Bearer(token): Bearer,
    Json(body): Json<Value>,
) -> Response {
    let Some(sender) = state.sessions.sender(&query.session_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown session", "status": 404})),
        )
            .into_response();
    };

    if let Some(response) = rpc::dispatch(&state, token.as_deref(), body).await {
        if sender.send(response).await.is_err() {
            // Stream already gone; drop the stale session.
            state.sessions.close(&query.session_id);
            return StatusCode::GONE.into_response();
        }
    }

    StatusCode::ACCEPTED.into_response()
}
