use thiserror::Error;

/// Top-level error type for the `leadhunter-api` crate.
///
/// Covers every failure mode of the backend surfaces: authentication,
/// transport, REST rows, and the realtime WebSocket.
/// `leadhunter-core` maps these into user-facing conditions.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in rejected (wrong password, unconfirmed email, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The backend refused the request for the current session or key
    /// (HTTP 401/403, row-level security violations).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// Structured error from the REST layer (`{message, code, details, hint}`).
    #[error("Backend error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Realtime ────────────────────────────────────────────────────
    /// Realtime WebSocket connection failed.
    #[error("Realtime connection failed: {0}")]
    RealtimeConnect(String),

    /// Realtime WebSocket closed unexpectedly.
    #[error("Realtime channel closed (code {code}): {reason}")]
    RealtimeClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_show_status_and_message() {
        let err = Error::Api {
            message: "permission denied for table leads".into(),
            code: Some("42501".into()),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "Backend error (HTTP 403): permission denied for table leads"
        );
    }

    #[test]
    fn realtime_close_shows_code_and_reason() {
        let err = Error::RealtimeClosed {
            code: 1000,
            reason: "channel closed by server".into(),
        };
        assert_eq!(
            err.to_string(),
            "Realtime channel closed (code 1000): channel closed by server"
        );
    }
}
