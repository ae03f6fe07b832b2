//! Adapter configuration
//!
//! Loaded from the environment; CLI flags override individual fields.

use std::path::PathBuf;
use std::time::Duration;

/// Default gateway base URL (the gateway strips `/api` before routing)
pub const DEFAULT_API_URL: &str = "http://localhost:8081/api";

/// Default reverse-geocoding service
pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gateway base URL, endpoints are appended verbatim
    pub api_base_url: String,
    /// Session record file
    pub session_file: PathBuf,
    /// Reverse-geocoding base URL
    pub geocode_url: String,
    /// Per-request timeout (none by default)
    pub request_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: std::env::var("URBANOPS_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            session_file: std::env::var("URBANOPS_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_session_file()),
            geocode_url: std::env::var("URBANOPS_GEOCODE_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODE_URL.to_string()),
            request_timeout: std::env::var("URBANOPS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

impl AppConfig {
    /// Config pointing at an explicit gateway, everything else from the environment
    pub fn with_api_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn default_session_file() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".urbanops").join("session.json")
}
