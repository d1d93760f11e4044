#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end exercises of the `/__api` control plane and the traffic
//! fallback, against a real listener the way integration tests for an
//! `axum` service are written (spec §8 testable properties).

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use dockpit_config::{Config, KvBindingTtl, LogFormat};
use dockpit_gateway::{build_router, AppState};
use secrecy::Secret;
use serde_json::{json, Value};

const ADMIN_TOKEN: &str = "admin-secret";
const JWT_SECRET: &str = "jwt-secret";

fn test_config() -> Config {
    Config {
        admin_token: Secret::new(ADMIN_TOKEN.to_string()),
        jwt_secret: Secret::new(JWT_SECRET.to_string()),
        base_domain: "dockpit.test".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        watchdog_interval_secs: 3600,
        log_format: LogFormat::Pretty,
        kv_ttl: KvBindingTtl::default(),
        worker_runtime_url: None,
    }
}

async fn spawn_server() -> String {
    let state = AppState::new(&test_config());
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn create_project_without_admin_token_is_unauthorized() {
    let base = spawn_server().await;
    let resp = client()
        .post(format!("{base}/__api/projects"))
        .json(&json!({ "name": "site" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scenario_a_create_deploy_static_site_serve() {
    let base = spawn_server().await;
    let content = b"<!doctype html>hi".to_vec();
    let hash = dockpit_content::content_hash(&content);

    let created: Value = client()
        .post(format!("{base}/__api/projects"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "name": "S" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = created["project"]["id"].as_str().unwrap().to_string();

    let session: Value = client()
        .post(format!("{base}/__api/projects/{project_id}/assets-upload-session"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "manifest": { "/index.html": { "hash": hash, "size": content.len() } } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["buckets"], json!([[hash]]));
    let upload_jwt = session["jwt"].as_str().unwrap().to_string();

    let mut chunk = HashMap::new();
    chunk.insert(hash.clone(), STANDARD.encode(&content));
    let upload_resp = client()
        .post(format!("{base}/__api/projects/{project_id}/assets/upload"))
        .header("Authorization", format!("Bearer {upload_jwt}"))
        .json(&chunk)
        .send()
        .await
        .unwrap();
    assert_eq!(upload_resp.status(), reqwest::StatusCode::CREATED);
    let uploaded: Value = upload_resp.json().await.unwrap();
    let completion_jwt = uploaded["jwt"].as_str().unwrap().to_string();

    let deploy_resp = client()
        .post(format!("{base}/__api/projects/{project_id}/deploy"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "completionJwt": completion_jwt }))
        .send()
        .await
        .unwrap();
    assert_eq!(deploy_resp.status(), reqwest::StatusCode::OK);
    let deployed: Value = deploy_resp.json().await.unwrap();
    assert_eq!(deployed["project"]["status"], "READY");

    let served = client()
        .get(format!("{base}/"))
        .header("Host", format!("{project_id}.dockpit.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status(), reqwest::StatusCode::OK);
    assert_eq!(served.headers().get("etag").unwrap(), &format!("\"{hash}\""));
    assert!(served.headers().get("content-type").unwrap().to_str().unwrap().starts_with("text/html"));
    let body = served.bytes().await.unwrap();
    assert_eq!(body.as_ref(), content.as_slice());
}

#[tokio::test]
async fn scenario_e_redeploy_only_uploads_new_hashes() {
    let base = spawn_server().await;

    let created: Value = client()
        .post(format!("{base}/__api/projects"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "name": "P" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = created["project"]["id"].as_str().unwrap().to_string();

    let body1 = b"one".to_vec();
    let body2 = b"two".to_vec();
    let h1 = dockpit_content::content_hash(&body1);
    let h2 = dockpit_content::content_hash(&body2);

    let session: Value = client()
        .post(format!("{base}/__api/projects/{project_id}/assets-upload-session"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "manifest": { "/a": { "hash": h1 }, "/b": { "hash": h2 } } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["newAssets"], 2);
    assert_eq!(session["skippedAssets"], 0);
    let upload_jwt = session["jwt"].as_str().unwrap().to_string();

    let mut chunk = HashMap::new();
    chunk.insert(h1.clone(), STANDARD.encode(&body1));
    chunk.insert(h2.clone(), STANDARD.encode(&body2));
    let uploaded: Value = client()
        .post(format!("{base}/__api/projects/{project_id}/assets/upload"))
        .header("Authorization", format!("Bearer {upload_jwt}"))
        .json(&chunk)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let completion_jwt = uploaded["jwt"].as_str().unwrap().to_string();

    client()
        .post(format!("{base}/__api/projects/{project_id}/deploy"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "completionJwt": completion_jwt }))
        .send()
        .await
        .unwrap();

    let body3 = b"three".to_vec();
    let h3 = dockpit_content::content_hash(&body3);

    let redeploy_session: Value = client()
        .post(format!("{base}/__api/projects/{project_id}/assets-upload-session"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "manifest": { "/a": { "hash": h1 }, "/c": { "hash": h3 } } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(redeploy_session["newAssets"], 1);
    assert_eq!(redeploy_session["skippedAssets"], 1);
    assert_eq!(redeploy_session["buckets"], json!([[h3]]));
}

#[tokio::test]
async fn missing_project_returns_404() {
    let base = spawn_server().await;
    let resp = client()
        .get(format!("{base}/__api/projects/does-not-exist"))
        .header("Authorization", ADMIN_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redeploy_of_ready_project_is_conflict() {
    let base = spawn_server().await;
    let created: Value = client()
        .post(format!("{base}/__api/projects"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({ "name": "R" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = created["project"]["id"].as_str().unwrap().to_string();

    client()
        .post(format!("{base}/__api/projects/{project_id}/deploy"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    let second = client()
        .post(format!("{base}/__api/projects/{project_id}/deploy"))
        .header("Authorization", ADMIN_TOKEN)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
}
