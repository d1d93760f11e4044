use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::collections::HashMap;

use dockpit_deploy::ServerCodeManifest;

/// The abstract boundary to server-code execution (spec §9 "Dynamic worker
/// loading via host"). The core never interprets module bytes itself — it
/// only resolves which modules a project has and hands them, with the
/// inbound request and an `ASSETS` binding, to whatever actually runs them.
#[async_trait]
pub trait ServerCodeExecutor: Send + Sync {
    async fn run(
        &self,
        manifest: &ServerCodeManifest,
        module_bytes_by_hash: HashMap<String, Bytes>,
        request: Request<Bytes>,
        assets: AssetsBinding,
    ) -> Response<Bytes>;
}

/// The `env.ASSETS` binding passed to server code: a loopback into the
/// asset pipeline for this project/config (spec §4.9 step 10, Scenario F).
#[derive(Clone, Copy)]
pub struct AssetsBinding<'a> {
    pub project_id: &'a str,
}
