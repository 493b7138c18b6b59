// ── Runtime connection configuration ──
//
// These types describe *how* to reach the backend. They carry credential
// data and connection tuning, but never touch disk. The CLI constructs a
// `WorkspaceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Email/password sign-in credentials.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub email: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for hosted backends.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted backends with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one backend project.
///
/// Built by the CLI, passed to [`Workspace::connect`](crate::Workspace::connect).
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Project URL (e.g. `https://abc.example.co`).
    pub url: Url,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: SecretString,
    /// Sign in with these on connect. Without them the workspace runs
    /// anonymously and "assigned to me" queries fail with `AuthRequired`.
    pub sign_in: Option<SignIn>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Open a realtime change feed for each handle.
    pub realtime_enabled: bool,
}

impl WorkspaceConfig {
    pub fn new(url: Url, anon_key: SecretString) -> Self {
        Self {
            url,
            anon_key,
            sign_in: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            realtime_enabled: true,
        }
    }
}
