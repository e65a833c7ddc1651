//! Error types for ragcheck

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ragcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A bounded network call or subprocess exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl Error {
    /// Map a reqwest transport error, keeping timeouts distinct from other failures.
    pub fn from_transport(err: reqwest::Error, operation: &'static str, after: Duration) -> Self {
        if err.is_timeout() {
            Error::Timeout { operation, after }
        } else {
            ApiError::from(err).into()
        }
    }

    /// True when the error came from an exceeded deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Query endpoint and transport errors.
///
/// HTTP error statuses are not errors here; the query client hands them back as data.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Credential acquisition errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Interactive login failed: {0}")]
    Login(String),

    #[error("Token request rejected: {0}")]
    Fetch(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Query endpoint not configured. Set APIM_ENDPOINT or pass --endpoint.")]
    MissingEndpoint,

    #[error("Token URL not configured. Set IMS_TOKEN_URL.")]
    MissingTokenUrl,

    #[error("Client credentials not configured. Set IMS_CLIENT_ID and IMS_CLIENT_SECRET.")]
    MissingClientCredentials,

    #[error("No credential source applies to this environment")]
    NoCredentialSource,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_operation() {
        let err = Error::Timeout {
            operation: "query request",
            after: Duration::from_secs(5),
        };
        let msg = err.to_string();
        assert!(msg.contains("query request"));
        assert!(msg.contains("5s"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_api_error_invalid_response() {
        let err = ApiError::InvalidResponse("expected value at line 1".to_string());
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn test_auth_error_fetch_carries_issuer_detail() {
        let err = AuthError::Fetch("invalid client secret".to_string());
        assert!(err.to_string().contains("invalid client secret"));
    }

    #[test]
    fn test_auth_error_login() {
        let err = AuthError::Login("command returned an empty token".to_string());
        assert!(err.to_string().contains("empty token"));
    }

    #[test]
    fn test_config_error_missing_credentials() {
        let err = ConfigError::MissingClientCredentials;
        assert!(err.to_string().contains("IMS_CLIENT_ID"));
    }

    #[test]
    fn test_config_error_missing_endpoint() {
        let err = ConfigError::MissingEndpoint;
        assert!(err.to_string().contains("--endpoint"));
    }

    #[test]
    fn test_error_from_auth_error() {
        let err: Error = AuthError::Login("boom".to_string()).into();

        match err {
            Error::Auth(AuthError::Login(_)) => (),
            _ => panic!("Expected Error::Auth(AuthError::Login)"),
        }
        assert!(!Error::Other("x".to_string()).is_timeout());
    }

    #[test]
    fn test_error_from_config_error() {
        let err: Error = ConfigError::NoCredentialSource.into();

        match err {
            Error::Config(ConfigError::NoCredentialSource) => (),
            _ => panic!("Expected Error::Config(ConfigError::NoCredentialSource)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("invalid: [yaml: content").unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}
