use thiserror::Error;

/// Top-level error type for the `tixly-api` crate.
///
/// Covers every failure mode across both API surfaces: the REST gateway
/// and the notification channel. `tixly-core` maps these into the
/// user-facing diagnostics shown next to a cached page.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Gateway ─────────────────────────────────────────────────────
    /// Structured error response from the gateway.
    #[error("Gateway error (HTTP {status}): {message}")]
    Server { message: String, status: u16 },

    // ── Notification channel ────────────────────────────────────────
    /// Channel connection failed.
    #[error("Channel connection failed: {0}")]
    ChannelConnect(String),

    /// Channel closed unexpectedly.
    #[error("Channel closed: {reason}")]
    ChannelClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request never produced a response at all
    /// (network down, connect refused, timeout).
    pub fn is_no_response(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout() || e.is_connect() || (e.is_request() && e.status().is_none())
            }
            Self::ChannelConnect(_) | Self::ChannelClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Server { status: 404, .. } => true,
            _ => false,
        }
    }
}
