//! Error types for remote catalog fetches.

use thiserror::Error;

/// Errors fetching the collection listing or the spectral index catalog.
///
/// A fetch failure is never interpreted as "collection absent".
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level failure.
    #[error("network error fetching catalog {url}: {source}\n  Suggestion: check connectivity; the catalog is required to validate collections")]
    Network {
        /// The catalog URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The catalog host answered with a non-success status.
    #[error("HTTP {status} fetching catalog {url}")]
    HttpStatus {
        /// The catalog URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The catalog payload had an unexpected shape.
    #[error("invalid catalog payload from {url}: {reason}")]
    InvalidPayload {
        /// The catalog URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl CatalogError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid-payload error.
    pub fn invalid_payload(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
