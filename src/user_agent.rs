//! Shared User-Agent string for listing and download requests.

/// Default User-Agent for every request the mirror sends.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    format!("mirror-caddy/{}", env!("CARGO_PKG_VERSION"))
}
