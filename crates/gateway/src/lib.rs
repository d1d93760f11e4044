//! The control-plane HTTP surface (spec §4.11, C11): binds the admin API,
//! the upload-chunk endpoint, and the traffic fallback onto one `axum`
//! router.

mod api;
mod auth;
mod error;
mod executor;
mod server;
mod state;
mod traffic;

pub use error::ApiError;
pub use executor::HttpServerCodeExecutor;
pub use server::build_router;
pub use state::AppState;
