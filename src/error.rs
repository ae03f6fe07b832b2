//! Error handling for the UrbanOps adapter

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Message surfaced when the gateway rejects the session token
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

/// Message surfaced when the gateway cannot be reached during auth calls
pub const NETWORK_UNAVAILABLE_MESSAGE: &str =
    "Network error: Unable to connect to server. Please check if the backend is running.";

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Gateway unreachable (connection refused, DNS, TLS, broken stream)
    #[error("{0}")]
    NetworkUnavailable(String),

    /// 401 from an authenticated call; the session has been cleared
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    /// Any other non-2xx response
    #[error("{0}")]
    Api(String),

    /// Login / registration rejected
    #[error("{0}")]
    Auth(String),

    /// Caller-supplied value the gateway cannot address
    #[error("{0}")]
    InvalidInput(String),

    /// Session store failure
    #[error("Session error: {0}")]
    Session(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map a transport-level reqwest failure onto the taxonomy.
    ///
    /// Anything that never produced an HTTP status is treated as the gateway
    /// being unreachable.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            Error::NetworkUnavailable(err.to_string())
        } else {
            Error::Http(err)
        }
    }

    /// True for failures where the gateway never answered
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }

    /// Short machine-readable code, used in logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            Error::NetworkUnavailable(_) => "NETWORK_UNAVAILABLE",
            Error::SessionExpired => "SESSION_EXPIRED",
            Error::Api(_) => "API_ERROR",
            Error::Auth(_) => "AUTH_ERROR",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Session(_) => "SESSION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_message() {
        assert_eq!(Error::SessionExpired.to_string(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_api_error_displays_backend_message() {
        let err = Error::Api("Incident not valid".to_string());
        assert_eq!(err.to_string(), "Incident not valid");
        assert_eq!(err.code(), "API_ERROR");
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkUnavailable("refused".to_string()).is_network());
        assert!(!Error::SessionExpired.is_network());
    }
}
