#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project not found")]
    NotFound,
    #[error("project is immutable once deployed")]
    Immutable,
    #[error("validation failed at {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("authentication failed")]
    Unauthorized,
    #[error("project error: {0}")]
    Project(#[from] dockpit_projects::Error),
    #[error("blob store error: {0}")]
    Blob(#[from] dockpit_blob::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] dockpit_manifest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), reason: reason.into() }
    }
}
