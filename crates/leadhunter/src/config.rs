//! CLI configuration: a thin wrapper around `leadhunter_config`.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--url, --anon-key, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use leadhunter_config::{Config, Profile};
use leadhunter_core::{TlsVerification, WorkspaceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Clap default for `--timeout`; a profile timeout wins over it.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Translate a `Profile` + global flags into a `WorkspaceConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<WorkspaceConfig, CliError> {
    let mut config = leadhunter_config::profile_to_workspace_config_with(
        profile,
        profile_name,
        global.anon_key.clone().map(SecretString::from),
    )?;

    if let Some(ref url) = global.url {
        config.url = leadhunter_config::parse_url(url)?;
    }
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if profile.timeout.is_none() || global.timeout != DEFAULT_TIMEOUT_SECS {
        config.timeout = Duration::from_secs(global.timeout);
    }
    Ok(config)
}

/// Build a `WorkspaceConfig` from the config file, profile, and CLI overrides.
pub fn build_workspace_config(global: &GlobalOpts) -> Result<WorkspaceConfig, CliError> {
    let cfg = leadhunter_config::load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    // If a profile exists, use it with CLI flag overrides
    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global);
    }

    // An explicitly named profile that doesn't exist is an error
    if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available.join(", "),
        });
    }

    // No profile -- build from CLI flags / env vars alone
    let url = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: leadhunter_config::config_path().display().to_string(),
    })?;
    let anon_key = global
        .anon_key
        .clone()
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.clone(),
            what: "anon key".into(),
        })?;

    let mut profile = Profile::new(url);
    profile.insecure = Some(global.insecure);
    profile.timeout = Some(global.timeout);
    Ok(leadhunter_config::profile_to_workspace_config_with(
        &profile,
        &profile_name,
        Some(SecretString::from(anon_key)),
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["leadhunter"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["completions", "bash"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let mut profile = Profile::new("https://abc.example.co");
        profile.anon_key = Some("from-profile".into());
        profile.timeout = Some(10);

        let config = resolve_profile(&profile, "leadhunter-cli-test", &global(&[])).unwrap();
        assert_eq!(config.url.as_str(), "https://abc.example.co/");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.tls, TlsVerification::SystemDefaults);

        let config = resolve_profile(
            &profile,
            "leadhunter-cli-test",
            &global(&["--url", "https://other.example.co", "-k", "--timeout", "5"]),
        )
        .unwrap();
        assert_eq!(config.url.host_str(), Some("other.example.co"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn anon_key_flag_wins() {
        use secrecy::ExposeSecret;

        let mut profile = Profile::new("https://abc.example.co");
        profile.anon_key = Some("from-profile".into());
        let config = resolve_profile(
            &profile,
            "leadhunter-cli-test",
            &global(&["--anon-key", "from-flag"]),
        )
        .unwrap();
        assert_eq!(config.anon_key.expose_secret(), "from-flag");
    }
}
