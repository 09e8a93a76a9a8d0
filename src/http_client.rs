//! Shared HTTP client construction for the compute service and catalog sources.
//!
//! Both talk to remote JSON endpoints and must agree on timeout, user-agent
//! and compression settings.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout. Exports of large regions can be slow.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Timeouts applied to every request made by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_secs: u64,
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// Failure constructing an HTTP client.
#[derive(Debug, thiserror::Error)]
#[error("HTTP client construction failed: {reason}")]
pub struct ClientBuildError {
    reason: String,
}

/// Builds an HTTP client using the shared policy.
///
/// # Errors
///
/// Returns [`ClientBuildError`] when reqwest cannot build the client, even
/// after falling back to environment-only proxy discovery.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, ClientBuildError> {
    match try_build_client(timeouts, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed macOS environments panic when querying system proxy settings.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            try_build_client(timeouts, true).map_err(|failure| match failure {
                BuildClientFailure::Panic => ClientBuildError {
                    reason: "client construction panicked while reading proxy settings".to_string(),
                },
                BuildClientFailure::Build(error) => ClientBuildError {
                    reason: error.to_string(),
                },
            })
        }
        Err(BuildClientFailure::Build(error)) => Err(ClientBuildError {
            reason: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    timeouts: HttpTimeouts,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(timeouts: HttpTimeouts) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.read_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    for (scheme, names) in [
        ("https", ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        ("http", ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
    ] {
        let Some(proxy) = first_env_value(&names) else {
            continue;
        };
        let resolved = if scheme == "https" {
            Proxy::https(&proxy)
        } else {
            Proxy::http(&proxy)
        };
        if let Ok(resolved) = resolved {
            builder = builder.proxy(resolved);
        }
    }
    builder
}

fn first_env_value(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
