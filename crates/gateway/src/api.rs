use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dockpit_projects::{ManifestEntry, Project, ProjectStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

const MAX_PROJECT_NAME_LEN: usize = 128;

fn validate_project_name(name: &Option<String>) -> Result<(), ApiError> {
    match name {
        Some(n) if n.is_empty() || n.len() > MAX_PROJECT_NAME_LEN => {
            Err(ApiError::Validation { field: "name".to_string(), reason: "must be 1-128 characters".to_string() })
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_project_name(&body.name)?;
    let project = state.projects.create(body.name).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "project": project }))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = state.projects.list(query.limit.unwrap_or(20), query.cursor).await?;
    Ok(Json(json!({
        "success": true,
        "projects": page.projects,
        "nextCursor": page.next_cursor,
    })))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project = state.projects.get(&project_id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let _ = get_or_404(&state.projects, &project_id).await?;
    state.projects.delete(&project_id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn get_or_404(projects: &dyn ProjectStore, id: &str) -> Result<Project, ApiError> {
    projects.get(id).await?.ok_or(ApiError::NotFound)
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub manifest: HashMap<String, ManifestEntry>,
}

pub async fn create_upload_session(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    get_or_404(state.projects.as_ref(), &project_id).await?;
    let created = state.upload.create_session(&project_id, body.manifest).await?;
    Ok(Json(json!({
        "success": true,
        "jwt": created.jwt,
        "buckets": created.buckets,
        "newAssets": created.new_assets,
        "skippedAssets": created.skipped_assets,
    })))
}

#[derive(Debug, Serialize)]
struct UploadChunkResponse {
    success: bool,
    jwt: Option<String>,
}

pub async fn upload_chunk(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    headers: axum::http::HeaderMap,
    Json(chunk): Json<HashMap<String, String>>,
) -> Result<(StatusCode, Json<UploadChunkResponse>), ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let result = state.upload.upload_chunk(&project_id, token, chunk).await?;
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::OK);
    Ok((status, Json(UploadChunkResponse { success: true, jwt: result.jwt })))
}

pub async fn deploy(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<dockpit_deploy::DeployRequest>,
) -> Result<Json<Value>, ApiError> {
    let project = state.finalizer.finalize(&project_id, body).await?;
    Ok(Json(json!({ "success": true, "project": project })))
}
