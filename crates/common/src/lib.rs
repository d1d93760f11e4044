//! Shared types, error definitions, and utilities used across all dockpit crates.

pub mod error;
pub mod time;

pub use error::{Context, Error, FromMessage, Result};
