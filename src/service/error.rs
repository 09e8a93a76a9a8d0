//! Error types for remote compute service calls.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by a [`ComputeService`](super::ComputeService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network-level failure reaching the service.
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// The endpoint that failed.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {endpoint}: {body}")]
    HttpStatus {
        /// The endpoint that returned the status.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// Response body, truncated for display.
        body: String,
    },

    /// The response could not be interpreted.
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        /// The endpoint whose response was malformed.
        endpoint: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The collection lacks the metadata a capability needs.
    #[error("{capability} is not available for '{collection}': {reason}")]
    Unsupported {
        /// The capability requested (e.g. `mask_clouds`).
        capability: &'static str,
        /// The collection it was requested on.
        collection: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// No authenticated session is available.
    #[error("no authenticated session for {endpoint}\n  Suggestion: call Session::ensure_authenticated() first")]
    Unauthenticated {
        /// The endpoint that needed credentials.
        endpoint: String,
    },

    /// The configured base URL is unusable.
    #[error("invalid service URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// Writing an export to disk failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Longest response body kept in an error message.
const MAX_BODY_CHARS: usize = 300;

impl ServiceError {
    /// Creates a network error.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates an HTTP status error, truncating long bodies.
    pub fn http_status(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
            format!("{truncated}...")
        } else {
            body.to_string()
        };
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
            body,
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-capability error.
    pub fn unsupported(
        capability: &'static str,
        collection: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            capability,
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
