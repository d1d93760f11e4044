use std::time::Instant;

use bytes::Bytes;
use dockpit_blob::{classify_latency, BlobStore, CacheClass};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};

use crate::config::HeaderRule;
use crate::redirects::apply_header_rules;

/// Every response revalidates with the origin before reuse; requests
/// carrying credentials or a `Range` skip caching entirely (spec §4.8 stage
/// G).
const ASSET_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

pub fn asset_key(project_id: &str, hash: &str) -> String {
    format!("project/{project_id}/asset/{hash}")
}

/// Fetches an asset by content hash and shapes the response per stage G:
/// method enforcement, `ETag`/conditional-GET, `Content-Type`, `Cache-Control`,
/// `X-Asset-Cache-Status`, and header-rule `set`/`unset` application.
pub async fn serve_asset(
    blob: &dyn BlobStore,
    project_id: &str,
    served_path: &str,
    etag: &str,
    status: u16,
    method: &Method,
    request_headers: &HeaderMap,
    header_rules: &[HeaderRule],
) -> http::Result<Response<Bytes>> {
    if method != Method::GET && method != Method::HEAD {
        return Response::builder().status(StatusCode::METHOD_NOT_ALLOWED).header(http::header::ALLOW, "GET, HEAD").body(Bytes::new());
    }

    let quoted_etag = format!("\"{etag}\"");
    if let Some(if_none_match) = request_headers.get(http::header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        if matches_any_etag(if_none_match, &quoted_etag) {
            let mut builder = Response::builder().status(StatusCode::NOT_MODIFIED);
            if let Some(headers) = builder.headers_mut() {
                headers.insert(http::header::ETAG, header_value(&quoted_etag));
                apply_header_rules(header_rules, served_path, headers);
            }
            return builder.body(Bytes::new());
        }
    }

    let started = Instant::now();
    let key = asset_key(project_id, etag);
    let fetched = match blob.get(&key).await {
        Ok(Some(entry)) => Some(entry),
        Ok(None) => None,
        Err(_) => None,
    };
    let cache_status = classify_latency(started.elapsed());

    let Some((bytes, meta)) = fetched else {
        return Response::builder().status(StatusCode::NOT_FOUND).body(Bytes::new());
    };

    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    let mut builder = Response::builder().status(status_code);
    if let Some(headers) = builder.headers_mut() {
        headers.insert(http::header::ETAG, header_value(&quoted_etag));
        let content_type = meta.content_type.as_deref().unwrap_or("application/octet-stream");
        headers.insert(http::header::CONTENT_TYPE, header_value(content_type));
        if should_cache(request_headers) {
            headers.insert(http::header::CACHE_CONTROL, header_value(ASSET_CACHE_CONTROL));
        }
        headers.insert("x-asset-cache-status", header_value(cache_status_label(cache_status)));
        apply_header_rules(header_rules, served_path, headers);
    }

    let body = if method == Method::HEAD { Bytes::new() } else { bytes };
    builder.body(body)
}

/// Matches `If-None-Match` (a comma-separated list of strong or weak
/// validators) against `quoted_etag`, per spec §4.8 stage G / Testable
/// Property 10.
fn matches_any_etag(if_none_match: &str, quoted_etag: &str) -> bool {
    if if_none_match.trim() == "*" {
        return true;
    }
    if_none_match.split(',').map(str::trim).map(|candidate| candidate.strip_prefix("W/").unwrap_or(candidate)).any(|candidate| candidate == quoted_etag)
}

fn should_cache(request_headers: &HeaderMap) -> bool {
    !request_headers.contains_key(http::header::AUTHORIZATION) && !request_headers.contains_key(http::header::RANGE)
}

fn cache_status_label(class: CacheClass) -> &'static str {
    match class {
        CacheClass::Hit => "HIT",
        CacheClass::Miss => "MISS",
    }
}

fn header_value(s: &str) -> HeaderValue {
    HeaderValue::from_str(s).unwrap_or_else(|_| HeaderValue::from_static(""))
}
