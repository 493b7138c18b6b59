//! Shared configuration for LeadHunter tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `leadhunter_core::WorkspaceConfig`. The CLI adds
//! flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use leadhunter_core::{SignIn, TlsVerification, WorkspaceConfig};

const KEYRING_SERVICE: &str = "leadhunter";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured for profile '{profile}'")]
    NoCredentials { profile: String, what: String },

    #[error("profile '{0}' not found in config")]
    UnknownProfile(String),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }

    /// The profile name to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_realtime() -> bool {
    true
}

/// A named backend project profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Project URL (e.g., "https://abc.example.co").
    pub url: String,

    /// Public anon key (plaintext; prefer keyring or env var).
    pub anon_key: Option<String>,

    /// Environment variable name containing the anon key.
    pub anon_key_env: Option<String>,

    /// Sign-in email. Without one the CLI runs anonymously.
    pub email: Option<String>,

    /// Sign-in password (plaintext; prefer keyring).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Open realtime change feeds for long-running commands.
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: None,
            anon_key_env: None,
            email: None,
            password: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            realtime: default_realtime(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("app", "radarhunter", "leadhunter").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("leadhunter");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path. A missing file yields the defaults.
///
/// Environment overrides use the `LEADHUNTER_` prefix with `__` as the
/// nesting separator (`LEADHUNTER_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LEADHUNTER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_secret(profile_name: &str, kind: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{kind}")).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

/// Resolve the anon key: profile's env var, then keyring, then plaintext.
pub fn resolve_anon_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's anon_key_env → env var lookup
    if let Some(ref env_name) = profile.anon_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_secret(profile_name, "anon-key") {
        return Ok(secret);
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.anon_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        what: "anon key".into(),
    })
}

/// Resolve sign-in credentials.
///
/// `Ok(None)` when no email is configured. An email without any
/// resolvable password is an error.
pub fn resolve_sign_in(profile: &Profile, profile_name: &str) -> Result<Option<SignIn>, ConfigError> {
    let Some(email) = profile
        .email
        .clone()
        .or_else(|| std::env::var("LEADHUNTER_EMAIL").ok())
    else {
        return Ok(None);
    };

    // 1. Env var
    if let Ok(pw) = std::env::var("LEADHUNTER_PASSWORD") {
        return Ok(Some(SignIn {
            email,
            password: SecretString::from(pw),
        }));
    }

    // 2. Keyring
    if let Some(password) = keyring_secret(profile_name, "password") {
        return Ok(Some(SignIn { email, password }));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(Some(SignIn {
            email,
            password: SecretString::from(pw.clone()),
        }));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        what: "password".into(),
    })
}

pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `WorkspaceConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_workspace_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<WorkspaceConfig, ConfigError> {
    profile_to_workspace_config_with(profile, profile_name, None)
}

/// Like [`profile_to_workspace_config`], with an anon key that takes
/// priority over the profile's credential chain.
pub fn profile_to_workspace_config_with(
    profile: &Profile,
    profile_name: &str,
    anon_key: Option<SecretString>,
) -> Result<WorkspaceConfig, ConfigError> {
    let url = parse_url(&profile.url)?;
    let anon_key = match anon_key {
        Some(key) => key,
        None => resolve_anon_key(profile, profile_name)?,
    };
    let sign_in = resolve_sign_in(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = WorkspaceConfig::new(url, anon_key);
    config.sign_in = sign_in;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));
    config.realtime_enabled = profile.realtime;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const UNSET_ENV: &str = "LEADHUNTER_TEST_SURELY_UNSET_ANON_KEY";

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_profiles_from_toml() {
        let (_dir, path) = write_config(
            r#"
default_profile = "prod"

[defaults]
output = "json"

[profiles.prod]
url = "https://abc.example.co"
anon_key = "anon-123"
email = "ana@example.com"
timeout = 10
realtime = false
"#,
        );

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.default_profile_name(), "prod");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 30);

        let prod = config.profile("prod").unwrap();
        assert_eq!(prod.url, "https://abc.example.co");
        assert_eq!(prod.email.as_deref(), Some("ana@example.com"));
        assert_eq!(prod.timeout, Some(10));
        assert!(!prod.realtime);
        assert!(matches!(
            config.profile("staging"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), "default");
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn serialized_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        let mut profile = Profile::new("https://abc.example.co");
        profile.anon_key_env = Some("LEADHUNTER_ANON_KEY".into());
        config.profiles.insert("default".into(), profile);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.anon_key_env.as_deref(), Some("LEADHUNTER_ANON_KEY"));
        assert!(profile.realtime);
    }

    #[test]
    fn plaintext_key_is_the_last_resort() {
        let mut profile = Profile::new("https://abc.example.co");
        profile.anon_key_env = Some(UNSET_ENV.into());
        profile.anon_key = Some("anon-plain".into());

        let key = resolve_anon_key(&profile, "leadhunter-test-plaintext").unwrap();
        assert_eq!(key.expose_secret(), "anon-plain");
    }

    #[test]
    fn missing_key_is_reported() {
        let profile = Profile::new("https://abc.example.co");
        let err = resolve_anon_key(&profile, "leadhunter-test-nokey").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn profile_translates_to_workspace_config() {
        let mut profile = Profile::new("https://abc.example.co");
        profile.anon_key = Some("anon-plain".into());
        profile.timeout = Some(12);
        profile.ca_cert = Some("/etc/ssl/custom.pem".into());

        let config = profile_to_workspace_config(&profile, "leadhunter-test-translate").unwrap();
        assert_eq!(config.url.as_str(), "https://abc.example.co/");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(
            config.tls,
            TlsVerification::CustomCa("/etc/ssl/custom.pem".into())
        );
        assert!(config.realtime_enabled);

        profile.insecure = Some(true);
        let config = profile_to_workspace_config(&profile, "leadhunter-test-translate").unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn bad_url_is_a_validation_error() {
        let mut profile = Profile::new("not a url");
        profile.anon_key = Some("anon".into());
        assert!(matches!(
            profile_to_workspace_config(&profile, "leadhunter-test-badurl"),
            Err(ConfigError::Validation { .. })
        ));
    }
}
