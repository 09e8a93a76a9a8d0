//! User-Agent string shared by the compute service and catalog clients.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/geoharvest";

/// Default User-Agent for every outgoing request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("geoharvest/{version} (geospatial-harvester; +{PROJECT_UA_URL})")
}
