// ── Core error types ──
//
// User-facing errors from leadhunter-core. Consumers never see raw HTTP
// status handling or JSON parse failures; `From<leadhunter_api::Error>`
// folds transport-layer errors into these variants.
//
// Every variant carries owned strings so an error can be parked in a
// handle's error slot and handed out by clone.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    /// The operation needs a signed-in user and there is none, or the
    /// backend rejected the session.
    #[error("Sign-in required: {message}")]
    AuthRequired { message: String },

    // ── Backend ──────────────────────────────────────────────────────
    /// Network, permission, or validation failure reported by the gateway.
    #[error("Backend error: {message}")]
    Gateway {
        message: String,
        /// Backend error code (e.g. `"42501"`), if the backend sent one.
        code: Option<String>,
        /// HTTP status, if the failure came from an HTTP response.
        status: Option<u16>,
    },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Caller errors ────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The handle or workspace was closed before the operation ran.
    #[error("Data handle is closed")]
    Disconnected,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }

    pub(crate) fn auth_required(message: impl Into<String>) -> Self {
        Self::AuthRequired {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<leadhunter_api::Error> for CoreError {
    fn from(err: leadhunter_api::Error) -> Self {
        use leadhunter_api::Error as Api;

        match err {
            Api::Authentication { message } | Api::Unauthorized { message } => {
                CoreError::AuthRequired { message }
            }
            Api::Transport(ref e) => CoreError::Gateway {
                message: e.to_string(),
                code: None,
                status: e.status().map(|s| s.as_u16()),
            },
            Api::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "row".into(),
                identifier: message,
            },
            Api::Api {
                message,
                code,
                status,
            } => CoreError::Gateway {
                message,
                code,
                status: Some(status),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Gateway {
                message: format!("Request timed out after {timeout_secs}s"),
                code: None,
                status: None,
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::RealtimeConnect(reason) => CoreError::Gateway {
                message: format!("Realtime connection failed: {reason}"),
                code: None,
                status: None,
            },
            Api::RealtimeClosed { code, reason } => CoreError::Gateway {
                message: format!("Realtime channel closed (code {code}): {reason}"),
                code: None,
                status: None,
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_becomes_auth_required() {
        let err = CoreError::from(leadhunter_api::Error::Unauthorized {
            message: "JWT expired".into(),
        });
        assert!(err.is_auth_required());
    }

    #[test]
    fn api_errors_keep_code_and_status() {
        let err = CoreError::from(leadhunter_api::Error::Api {
            message: "permission denied".into(),
            code: Some("42501".into()),
            status: 403,
        });
        assert_eq!(
            err,
            CoreError::Gateway {
                message: "permission denied".into(),
                code: Some("42501".into()),
                status: Some(403),
            }
        );
    }

    #[test]
    fn missing_rows_become_not_found() {
        let err = CoreError::from(leadhunter_api::Error::Api {
            message: "no rows".into(),
            code: Some("PGRST116".into()),
            status: 404,
        });
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
