//! The request router (spec §4.9, C9): extracts the target project from a
//! request, enforces its status, decides worker-first vs asset-first, and
//! rewrites HTML/JS responses for path-based routing.

mod executor;
mod extract;
mod glob;
mod rewrite;

pub use executor::{AssetsBinding, ServerCodeExecutor};
pub use extract::{extract, strip_project_prefix, ProjectRoute};
pub use glob::matches_glob_patterns;
pub use rewrite::{base_path_shim, rewrite_html_attributes, rewrite_html_document, rewrite_script_text};

use std::collections::HashMap;

use bytes::Bytes;
use dockpit_blob::BlobStore;
use dockpit_projects::{Project, ProjectStatus, ProjectStore, RunWorkerFirst};
use dockpit_serving::ServingConfig;
use http::{HeaderValue, Request, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project store error: {0}")]
    Project(#[from] dockpit_projects::Error),
    #[error("serving pipeline error: {0}")]
    Serving(#[from] dockpit_serving::Error),
    #[error("blob store error: {0}")]
    Blob(#[from] dockpit_blob::Error),
    #[error("server code manifest decode failed: {0}")]
    ServerCodeManifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Which path the response took through stage 10's branching, surfaced to
/// clients as `X-Asset-Lookup` (spec §4.9 step 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLookupTag {
    Skip,
    Hit,
    Miss,
}

impl AssetLookupTag {
    fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "SKIP",
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

fn run_worker_first(project: &Project, rewritten_path: &str) -> bool {
    match &project.run_worker_first {
        None => false,
        Some(RunWorkerFirst::Bool(b)) => *b && project.has_server_code,
        Some(RunWorkerFirst::Globs(patterns)) => matches_glob_patterns(patterns, rewritten_path),
    }
}

fn serving_config(project: &Project) -> ServingConfig {
    project
        .serving_config
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn is_html_or_js(response: &Response<Bytes>) -> bool {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("text/html") || ct.contains("javascript"))
        .unwrap_or(false)
}

fn tag_response(mut response: Response<Bytes>, tag: AssetLookupTag) -> Response<Bytes> {
    response
        .headers_mut()
        .insert("x-asset-lookup", HeaderValue::from_static(tag.as_str()));
    response
}

/// Runs spec §4.9 steps 3-10 for one request. Steps 1 (analytics), 2
/// (`/__api`/`/admin` dispatch, handled by the caller before this is
/// invoked), and 5 (per-project rate limiting, an external collaborator)
/// are out of scope here.
pub async fn route<P: ProjectStore>(
    blob: &dyn BlobStore,
    projects: &P,
    executor: Option<&dyn ServerCodeExecutor>,
    host: &str,
    request: Request<Bytes>,
) -> Result<Response<Bytes>> {
    let pathname = request.uri().path().to_string();
    let Some(route) = extract(host, &pathname) else {
        return Ok(not_found());
    };

    let Some(project) = projects.get(&route.project_id).await? else {
        return Ok(not_found());
    };
    if project.status != ProjectStatus::Ready {
        return Ok(Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(Bytes::new())
            .unwrap_or_else(|_| Response::new(Bytes::new())));
    }

    let rewritten_path = if route.is_path_based {
        strip_project_prefix(&route.project_id, &pathname)
    } else {
        pathname.clone()
    };

    let config = serving_config(&project);
    let worker_first = run_worker_first(&project, &rewritten_path);

    let outcome = if worker_first && project.has_server_code {
        let Some(executor) = executor else {
            return Ok(not_found());
        };
        let response = run_executor(blob, executor, &route, request).await?;
        (response, AssetLookupTag::Skip)
    } else {
        let method = request.method().clone();
        let headers = request.headers().clone();
        let query = request.uri().query().map(str::to_string);
        let served = match dockpit_serving::serve(blob, &route.project_id, &config, host, &rewritten_path, query.as_deref(), &method, &headers).await {
            Ok(served) => served,
            // A project deployed with server code only (no assets phase)
            // never writes a binary manifest; that is a miss, not a fault.
            Err(dockpit_serving::Error::ManifestUnavailable) => None,
            Err(error) => return Err(error.into()),
        };
        match served {
            Some(response) => (response, AssetLookupTag::Hit),
            None if project.has_server_code => {
                let Some(executor) = executor else {
                    return Ok(not_found());
                };
                (run_executor(blob, executor, &route, request).await?, AssetLookupTag::Miss)
            }
            None => (not_found(), AssetLookupTag::Miss),
        }
    };

    let (response, tag) = outcome;
    let response = if route.is_path_based { rewrite_response(&route.project_id, response) } else { response };
    Ok(tag_response(response, tag))
}

/// Fetches the module manifest a deploy wrote (`project/{id}/module/MANIFEST`)
/// and every module it references (`project/{id}/module/{hash}`), keyed by
/// hash for the executor to resolve against `manifest.modules`.
async fn load_server_code(
    blob: &dyn BlobStore,
    project_id: &str,
) -> Result<Option<(dockpit_deploy::ServerCodeManifest, HashMap<String, Bytes>)>> {
    let Some((bytes, _meta)) = blob.get(&dockpit_deploy::module_manifest_key(project_id)).await? else {
        return Ok(None);
    };
    let manifest: dockpit_deploy::ServerCodeManifest = serde_json::from_slice(&bytes)?;

    let mut module_bytes_by_hash = HashMap::with_capacity(manifest.modules.len());
    for module_ref in manifest.modules.values() {
        let key = dockpit_deploy::module_key(project_id, &module_ref.hash);
        if let Some((module_bytes, _meta)) = blob.get(&key).await? {
            module_bytes_by_hash.insert(module_ref.hash.clone(), module_bytes);
        }
    }
    Ok(Some((manifest, module_bytes_by_hash)))
}

async fn run_executor(
    blob: &dyn BlobStore,
    executor: &dyn ServerCodeExecutor,
    route: &ProjectRoute,
    request: Request<Bytes>,
) -> Result<Response<Bytes>> {
    let Some((manifest, module_bytes_by_hash)) = load_server_code(blob, &route.project_id).await? else {
        return Ok(not_found());
    };
    Ok(executor
        .run(&manifest, module_bytes_by_hash, request, AssetsBinding { project_id: &route.project_id })
        .await)
}

fn rewrite_response(project_id: &str, response: Response<Bytes>) -> Response<Bytes> {
    if !is_html_or_js(&response) {
        return response;
    }
    let is_html = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("text/html"))
        .unwrap_or(false);

    let (parts, body) = response.into_parts();
    let Ok(text) = String::from_utf8(body.to_vec()) else {
        return Response::from_parts(parts, body);
    };
    let rewritten = if is_html {
        rewrite_html_document(project_id, &text)
    } else {
        rewrite_script_text(project_id, &text)
    };
    Response::from_parts(parts, Bytes::from(rewritten))
}

fn not_found() -> Response<Bytes> {
    Response::builder().status(StatusCode::NOT_FOUND).body(Bytes::new()).unwrap_or_else(|_| Response::new(Bytes::new()))
}
