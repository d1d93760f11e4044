use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    response::{IntoResponse, Response},
};

use crate::{error::ApiError, state::AppState};

/// Max traffic request body buffered before routing (spec §6 request size
/// limits) — the router operates on whole bodies, matching `dockpit-serving`
/// and `dockpit-router`'s in-memory `Bytes` contracts.
const MAX_TRAFFIC_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Fallback handler for everything not matched by `/__api` (spec §4.9 step
/// 2): buffers the body, hands the request to the routing pipeline keyed on
/// the `Host` header, and serves whatever it returns.
pub async fn serve_traffic(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_TRAFFIC_BODY_BYTES)
        .await
        .map_err(|e| ApiError::Validation { field: "body".to_string(), reason: e.to_string() })?;
    let request = http::Request::from_parts(parts, bytes);

    let response = dockpit_router::route(state.blob.as_ref(), &state.projects, state.executor(), &host, request).await?;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::from(body)).into_response())
}
