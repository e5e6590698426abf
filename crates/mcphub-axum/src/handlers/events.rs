//! Application event stream for the management UI.

use axum::extract::State;
use axum::response::IntoResponse;

use crate::state::AppState;

/// `GET /api/events` — SSE stream of application events.
pub async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    state.events.clone().subscribe()
}
