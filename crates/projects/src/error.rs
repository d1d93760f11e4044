#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project not found")]
    NotFound,
    #[error("project metadata corrupt: {0}")]
    Corrupt(String),
    #[error("blob store error: {0}")]
    Blob(#[from] dockpit_blob::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
