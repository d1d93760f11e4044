use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use dockpit_deploy::ServerCodeManifest;
use dockpit_router::{AssetsBinding, ServerCodeExecutor};
use http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Delegates server-code execution to an external worker-runtime process
/// over HTTP — the sub-RPC spec §5 describes as a suspension point. This
/// process only resolves and hands over the manifest and module bytes; it
/// never compiles or runs them itself (spec §1 non-goals).
pub struct HttpServerCodeExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpServerCodeExecutor {
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self { client: reqwest::Client::new(), endpoint }
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    manifest: &'a ServerCodeManifest,
    modules: HashMap<&'a str, String>,
    project_id: &'a str,
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body_base64: String,
}

#[derive(Deserialize)]
struct RunResponse {
    status: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body_base64: String,
}

#[async_trait]
impl ServerCodeExecutor for HttpServerCodeExecutor {
    async fn run(
        &self,
        manifest: &ServerCodeManifest,
        module_bytes_by_hash: HashMap<String, Bytes>,
        request: Request<Bytes>,
        assets: AssetsBinding,
    ) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let modules = module_bytes_by_hash.iter().map(|(hash, bytes)| (hash.as_str(), STANDARD.encode(bytes))).collect();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let run_request = RunRequest {
            manifest,
            modules,
            project_id: assets.project_id,
            method: parts.method.to_string(),
            path: parts.uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_default(),
            headers,
            body_base64: STANDARD.encode(&body),
        };

        let Ok(sent) = self.client.post(format!("{}/run", self.endpoint)).json(&run_request).send().await else {
            return bad_gateway();
        };
        let Ok(run_response) = sent.json::<RunResponse>().await else {
            return bad_gateway();
        };

        let status = StatusCode::from_u16(run_response.status).unwrap_or(StatusCode::OK);
        let mut builder = Response::builder().status(status);
        if let Some(header_map) = builder.headers_mut() {
            for (name, value) in &run_response.headers {
                if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                    header_map.insert(name, value);
                }
            }
        }
        let body = STANDARD.decode(&run_response.body_base64).unwrap_or_default();
        builder.body(Bytes::from(body)).unwrap_or_else(|_| Response::new(Bytes::new()))
    }
}

fn bad_gateway() -> Response<Bytes> {
    Response::builder().status(StatusCode::BAD_GATEWAY).body(Bytes::new()).unwrap_or_else(|_| Response::new(Bytes::new()))
}
