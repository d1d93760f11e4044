//! The asset-serving pipeline (spec §4.8, C8): given a project's serving
//! config and binary manifest, turn a request pathname into a redirect or a
//! content-addressed asset response.

mod config;
mod intent;
mod path;
mod pattern;
mod redirects;
mod response;

pub use config::{DynamicRedirect, HeaderRule, HtmlHandling, NotFoundHandling, ServingConfig, StaticRedirect};
pub use intent::Intent;
pub use redirects::RedirectOutcome;

use bytes::Bytes;
use dockpit_blob::BlobStore;
use dockpit_manifest::Manifest;
use http::{HeaderMap, Method, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project manifest is missing or unreadable")]
    ManifestUnavailable,
    #[error("manifest decode failed: {0}")]
    Manifest(#[from] dockpit_manifest::Error),
    #[error("blob store error: {0}")]
    Blob(#[from] dockpit_blob::Error),
    #[error("response construction failed: {0}")]
    Response(#[from] http::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn manifest_blob_key(project_id: &str) -> String {
    format!("project/{project_id}/manifest")
}

/// Runs the full pipeline for one request: stage A redirects, stage B path
/// normalization, stage C/D/E intent resolution against the binary
/// manifest, and stage G response shaping. Returns `Ok(None)` when stage E
/// resolves to [`Intent::NoIntent`] — the caller (the router, C9) is
/// expected to fall through to server code in that case rather than treat
/// it as a 404.
pub async fn serve(
    blob: &dyn BlobStore,
    project_id: &str,
    config: &ServingConfig,
    host: &str,
    raw_pathname: &str,
    query: Option<&str>,
    method: &Method,
    request_headers: &HeaderMap,
) -> Result<Option<Response<Bytes>>> {
    let normalized = path::decode_and_normalize(raw_pathname);

    let pathname = match redirects::resolve(&config.static_redirects, &config.dynamic_redirects, host, &normalized) {
        Some(RedirectOutcome::External { to, status }) => {
            return Ok(Some(external_redirect(&to, status)?));
        }
        Some(RedirectOutcome::Proxy { pathname }) => pathname,
        None => normalized,
    };

    let manifest_bytes = match blob.get(&manifest_blob_key(project_id)).await? {
        Some((bytes, _meta)) => bytes,
        None => return Err(Error::ManifestUnavailable),
    };
    let manifest = Manifest::parse(&manifest_bytes)?;
    let lookup = |p: &str| manifest.lookup(p);

    match intent::resolve(&lookup, config.html_handling, config.not_found_handling, &pathname) {
        Intent::Asset { served_path, etag, status } => {
            // Stage F: redirect to the canonical encoding if the client
            // requested a differently-encoded form of the same path.
            let canonical = path::canonical_encoded(&pathname);
            if canonical != raw_pathname {
                let location = match query {
                    Some(q) if !q.is_empty() => format!("{canonical}?{q}"),
                    _ => canonical,
                };
                return Ok(Some(external_redirect(&location, 307)?));
            }
            let resp = response::serve_asset(blob, project_id, &served_path, &etag, status, method, request_headers, &config.header_rules).await?;
            Ok(Some(resp))
        }
        Intent::Redirect { to, status } => Ok(Some(external_redirect(&to, status)?)),
        Intent::NoIntent => Ok(None),
        Intent::NotFound => Ok(Some(Response::builder().status(StatusCode::NOT_FOUND).body(Bytes::new())?)),
    }
}

fn external_redirect(to: &str, status: u16) -> http::Result<Response<Bytes>> {
    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::TEMPORARY_REDIRECT);
    Response::builder().status(status_code).header(http::header::LOCATION, to).body(Bytes::new())
}
