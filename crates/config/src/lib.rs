//! Process configuration (spec §6 "Process config"): shared admin token,
//! JWT secret, base serving domain, KV binding TTL hints, bind address, and
//! watchdog tick — loaded from environment variables with an optional TOML
//! file overlay layered on top.

use std::path::{Path, PathBuf};

use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid bind address {0}")]
    InvalidBindAddr(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Per-binding TTL hint the control plane passes through to the external
/// blob/KV collaborator (spec §6).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KvBindingTtl {
    pub projects_secs: Option<u64>,
    pub assets_secs: Option<u64>,
    pub server_code_secs: Option<u64>,
}

/// Optional file overlay, deserialized from TOML; every field is optional
/// since env vars are the source of truth for secrets.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileOverlay {
    base_domain: Option<String>,
    bind_addr: Option<String>,
    watchdog_interval_secs: Option<u64>,
    log_format: Option<String>,
    kv_ttl: Option<KvBindingTtl>,
    worker_runtime_url: Option<String>,
}

#[derive(Clone)]
pub struct Config {
    pub admin_token: Secret<String>,
    pub jwt_secret: Secret<String>,
    pub base_domain: String,
    pub bind_addr: String,
    pub watchdog_interval_secs: u64,
    pub log_format: LogFormat,
    pub kv_ttl: KvBindingTtl,
    /// Base URL of the external worker runtime that compiles and invokes
    /// uploaded server code (spec §1: deliberately out of scope here).
    /// `None` means no worker runtime is configured — projects with server
    /// code fall through to a 404 rather than ever reaching it.
    pub worker_runtime_url: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("admin_token", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("base_domain", &self.base_domain)
            .field("bind_addr", &self.bind_addr)
            .field("watchdog_interval_secs", &self.watchdog_interval_secs)
            .field("log_format", &self.log_format)
            .field("worker_runtime_url", &self.worker_runtime_url)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";

/// Load configuration from environment variables, with an optional TOML
/// overlay read from `DOCKPIT_CONFIG_FILE` if set — a single explicit path
/// rather than a directory search, since this process has one config file
/// at most.
pub fn load_from_env() -> Result<Config> {
    let overlay = match std::env::var("DOCKPIT_CONFIG_FILE") {
        Ok(path) => load_overlay(Path::new(&path))?,
        Err(_) => FileOverlay::default(),
    };

    let admin_token = env_var("DOCKPIT_ADMIN_TOKEN")?;
    let jwt_secret = env_var("DOCKPIT_JWT_SECRET")?;

    let base_domain = std::env::var("DOCKPIT_BASE_DOMAIN")
        .ok()
        .or(overlay.base_domain)
        .ok_or(Error::MissingVar("DOCKPIT_BASE_DOMAIN"))?;

    let bind_addr = std::env::var("DOCKPIT_BIND_ADDR")
        .ok()
        .or(overlay.bind_addr)
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let watchdog_interval_secs = std::env::var("DOCKPIT_WATCHDOG_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .or(overlay.watchdog_interval_secs)
        .unwrap_or(DEFAULT_WATCHDOG_INTERVAL_SECS);

    let log_format = std::env::var("DOCKPIT_LOG_FORMAT")
        .ok()
        .or(overlay.log_format)
        .map(|v| if v.eq_ignore_ascii_case("json") { LogFormat::Json } else { LogFormat::Pretty })
        .unwrap_or_default();

    let worker_runtime_url = std::env::var("DOCKPIT_WORKER_RUNTIME_URL").ok().or(overlay.worker_runtime_url);

    Ok(Config {
        admin_token: Secret::new(admin_token),
        jwt_secret: Secret::new(jwt_secret),
        base_domain,
        bind_addr,
        watchdog_interval_secs,
        log_format,
        kv_ttl: overlay.kv_ttl.unwrap_or_default(),
        worker_runtime_url,
    })
}

fn env_var(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::MissingVar(name))
}

fn load_overlay(path: &Path) -> Result<FileOverlay> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| Error::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_overlay_parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockpit.toml");
        std::fs::write(&path, "base_domain = \"example.test\"\nwatchdog_interval_secs = 30\n").unwrap();
        let overlay = load_overlay(&path).unwrap();
        assert_eq!(overlay.base_domain.as_deref(), Some("example.test"));
        assert_eq!(overlay.watchdog_interval_secs, Some(30));
    }

    #[test]
    fn load_overlay_missing_file_errors() {
        let err = load_overlay(Path::new("/nonexistent/dockpit.toml")).unwrap_err();
        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
