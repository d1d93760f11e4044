use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Error taxonomy for the `/__api` surface (spec §4.11, §7): every variant
/// maps to one status code and is rendered as `{"success": false, "error"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<dockpit_projects::Error> for ApiError {
    fn from(error: dockpit_projects::Error) -> Self {
        match error {
            dockpit_projects::Error::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<dockpit_upload::Error> for ApiError {
    fn from(error: dockpit_upload::Error) -> Self {
        match error {
            dockpit_upload::Error::Validation { field, reason } => Self::Validation { field, reason },
            dockpit_upload::Error::Unauthorized => Self::Unauthorized,
            dockpit_upload::Error::SessionNotFound => Self::NotFound,
            dockpit_upload::Error::Project(e) => e.into(),
            dockpit_upload::Error::Blob(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<dockpit_deploy::Error> for ApiError {
    fn from(error: dockpit_deploy::Error) -> Self {
        match error {
            dockpit_deploy::Error::NotFound => Self::NotFound,
            dockpit_deploy::Error::Immutable => Self::Conflict("project is already READY".to_string()),
            dockpit_deploy::Error::Validation { field, reason } => Self::Validation { field, reason },
            dockpit_deploy::Error::Unauthorized => Self::Unauthorized,
            dockpit_deploy::Error::Project(e) => e.into(),
            dockpit_deploy::Error::Blob(e) => Self::Internal(e.to_string()),
            dockpit_deploy::Error::Manifest(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<dockpit_router::Error> for ApiError {
    fn from(error: dockpit_router::Error) -> Self {
        match error {
            dockpit_router::Error::Project(e) => e.into(),
            dockpit_router::Error::Serving(e) => Self::Internal(e.to_string()),
        }
    }
}
