use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Normalized failure of a backend call.
///
/// Every error that crosses the API client boundary is one of these, so
/// controllers only ever deal with a single kind carrying a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: Unable to connect to server")]
    Network,

    #[error("Server error: Please try again later")]
    Server,

    #[error("Please check your input and try again")]
    Validation,

    #[error("You are not authorized to perform this action")]
    Unauthorized,

    #[error("The requested resource was not found")]
    NotFound,

    #[error("Too many requests: Please slow down")]
    RateLimited,

    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("{0}")]
    Rejected(String),

    #[error("Failed to decode binary payload: {0}")]
    Decode(String),

    #[error("Failed to initialize binary schema: {0}")]
    Schema(String),

    #[error("An unknown error occurred")]
    Unknown,

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Map an HTTP status to its fixed error kind.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ApiError::Validation,
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server,
            _ => ApiError::Unknown,
        }
    }

    /// Classify a transport failure.
    ///
    /// A status on the error means a response arrived; connect, timeout and
    /// request failures mean the request went out without one.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status);
        }
        if err.is_connect() || err.is_timeout() || err.is_request() {
            return ApiError::Network;
        }
        ApiError::Other(err.to_string())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_transport(&err)
    }
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(ApiError::from_status(StatusCode::BAD_REQUEST), ApiError::Validation);
        assert_eq!(ApiError::from_status(StatusCode::UNAUTHORIZED), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(StatusCode::NOT_FOUND), ApiError::NotFound);
        assert_eq!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS), ApiError::RateLimited);
        assert_eq!(ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR), ApiError::Server);
        assert_eq!(ApiError::from_status(StatusCode::BAD_GATEWAY), ApiError::Server);
        assert_eq!(ApiError::from_status(StatusCode::CONFLICT), ApiError::Unknown);
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            ApiError::Network.to_string(),
            "Network error: Unable to connect to server"
        );
        assert_eq!(
            ApiError::MaxRetriesExceeded { attempts: 3 }.to_string(),
            "Max retries exceeded after 3 attempts"
        );
        assert_eq!(
            AdminError::from(ApiError::NotFound).to_string(),
            "The requested resource was not found"
        );
    }
}
