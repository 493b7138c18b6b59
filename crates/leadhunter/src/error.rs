//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use leadhunter_config::ConfigError;
use leadhunter_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Backend request failed: {message}{}", code_suffix(.code.as_deref()))]
    #[diagnostic(
        code(leadhunter::backend),
        help("Check the project URL and your network, or retry with -vv for request logs.")
    )]
    Backend {
        message: String,
        code: Option<String>,
    },

    #[error("The workspace was closed before the operation ran")]
    #[diagnostic(code(leadhunter::disconnected))]
    Disconnected,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Sign-in required: {message}")]
    #[diagnostic(
        code(leadhunter::auth),
        help(
            "Set `email` in your profile and provide the password via\n\
             LEADHUNTER_PASSWORD or the system keyring."
        )
    )]
    AuthRequired { message: String },

    #[error("No {what} configured for profile '{profile}'")]
    #[diagnostic(
        code(leadhunter::no_credentials),
        help(
            "Add it to the profile in config.toml, store it in the system keyring,\n\
             or pass --anon-key / set LEADHUNTER_ANON_KEY."
        )
    )]
    NoCredentials { profile: String, what: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(leadhunter::not_found),
        help("Run: leadhunter {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(leadhunter::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(leadhunter::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(leadhunter::no_config),
        help(
            "Create a profile in {path}\n\
             or pass --url and --anon-key."
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(leadhunter::config))]
    Config(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(leadhunter::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Operation '{action}' failed")]
    #[diagnostic(code(leadhunter::failed))]
    Failed { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(leadhunter::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    #[diagnostic(code(leadhunter::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Backend { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::AuthRequired { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthRequired { message } => CliError::AuthRequired { message },
            CoreError::Gateway { message, code, .. } => CliError::Backend { message, code },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Disconnected => CliError::Disconnected,
            CoreError::Config { message } => CliError::Config(message),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile, what } => CliError::NoCredentials { profile, what },
            ConfigError::UnknownProfile(name) => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let auth = CliError::from(CoreError::AuthRequired {
            message: "no session".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let backend = CliError::from(CoreError::Gateway {
            message: "timed out".into(),
            code: None,
            status: None,
        });
        assert_eq!(backend.exit_code(), exit_code::CONNECTION);

        let invalid = CliError::from(CoreError::Validation {
            message: "blank name".into(),
        });
        assert_eq!(invalid.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn missing_key_is_an_auth_error() {
        let err = CliError::from(ConfigError::NoCredentials {
            profile: "prod".into(),
            what: "anon key".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "No anon key configured for profile 'prod'");
    }
}
