//! Shared helpers for command handlers.

use std::io::IsTerminal;

use serde_json::Value;

use leadhunter_core::CoreError;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a `--meta` argument. It must be a JSON object.
pub fn parse_meta(raw: &str) -> Result<Value, CliError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: "meta".into(),
        reason: format!("invalid JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: "meta".into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

/// Surface the error a handle parked in its error slot, if any.
pub fn check(error: Option<CoreError>) -> Result<(), CoreError> {
    error.map_or(Ok(()), Err)
}

/// The handle's recorded error, or a generic one when the slot is empty.
pub fn failure(error: Option<CoreError>, action: &str) -> CoreError {
    error.unwrap_or_else(|| CoreError::Internal(format!("{action} failed")))
}

pub fn not_found(entity_type: &str, identifier: &str) -> CoreError {
    CoreError::NotFound {
        entity_type: entity_type.into(),
        identifier: identifier.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn meta_must_be_an_object() {
        assert_eq!(parse_meta(r#"{"minutes":5}"#).unwrap()["minutes"], 5);
        assert!(matches!(parse_meta("[1,2]"), Err(CliError::Validation { .. })));
        assert!(matches!(parse_meta("{oops"), Err(CliError::Validation { .. })));
    }

    #[test]
    fn yes_flag_skips_the_prompt() {
        assert!(confirm("Delete?", "campaigns delete", true).unwrap());
    }
}
