use axum::{
    http::header,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, sensitive_headers::SetSensitiveHeadersLayer, trace::TraceLayer,
};

use crate::{api, auth, state::AppState, traffic};

/// Sized to the worst case of one upload-chunk call: `BUCKET_SIZE` hashes at
/// `MAX_ASSET_SIZE_BYTES` each, base64-encoded (spec §4.6 limits).
const CHUNK_BODY_LIMIT_BYTES: usize = 400 * 1024 * 1024;

/// Assembles the full gateway router: an admin-gated control-plane API, an
/// ungated upload-chunk endpoint (authenticated by its own bearer JWT), and
/// a traffic fallback — layered inner to outer as body limit, trace,
/// sensitive headers, catch panic.
pub fn build_router(state: AppState) -> Router {
    let admin_api = Router::new()
        .route("/projects", post(api::create_project).get(api::list_projects))
        .route("/projects/{id}", get(api::get_project).delete(api::delete_project))
        .route("/projects/{id}/assets-upload-session", post(api::create_upload_session))
        .route("/projects/{id}/deploy", post(api::deploy))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_admin_token));

    let upload_api = Router::new().route("/projects/{id}/assets/upload", post(api::upload_chunk));

    Router::new()
        .route("/health", get(health))
        .nest("/__api", admin_api.merge(upload_api))
        .fallback(traffic::serve_traffic)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(CHUNK_BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
