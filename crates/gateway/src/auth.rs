use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

/// Gate on the shared admin bearer token (spec §4.11): reject before the
/// handler runs rather than inside it.
pub async fn require_admin_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header) = header else {
        return unauthorized();
    };
    // Accepts either the bare shared secret or a `Bearer`-prefixed form.
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    if !dockpit_jwt::constant_time_eq_hash(token, &state.admin_token_digest) {
        return unauthorized();
    }

    next.run(request).await
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "unauthorized" }))).into_response()
}
