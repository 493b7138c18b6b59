use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;

/// Access tokens this close to expiry are refreshed before use.
pub const REFRESH_LEEWAY_SECS: i64 = 30;

/// Email/password credentials for the backend's password grant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// An authenticated session.
///
/// Issued by [`RestGateway::sign_in_with_password`](crate::RestGateway::sign_in_with_password).
/// The access token replaces the anon key in the `Authorization` header
/// while the session is live.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session with no expiry, for callers that already hold a token.
    pub fn new(user_id: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the access token has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the session should be renewed before the next request:
    /// it holds a refresh token and expires within [`REFRESH_LEEWAY_SECS`].
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some()
            && self.is_expired(now + Duration::seconds(REFRESH_LEEWAY_SECS))
    }
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: TokenUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_session(self, issued_at: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| issued_at + Duration::seconds(secs)));

        Session {
            user_id: self.user.id,
            email: self.user.email,
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at,
        }
    }
}

/// Error body returned by the auth endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    pub(crate) fn into_message(self, fallback: &str) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .unwrap_or_else(|| fallback.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn expires_in_is_relative_to_issue_time() {
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let resp: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "expires_in": 3600,
            "user": { "id": "u-1", "email": "ana@example.com" }
        }))
        .unwrap();

        let session = resp.into_session(issued);
        assert_eq!(session.user_id, "u-1");
        assert_eq!(session.expires_at, Some(issued + Duration::seconds(3600)));
        assert!(!session.is_expired(issued));
        assert!(session.is_expired(issued + Duration::seconds(3600)));
    }

    #[test]
    fn session_without_expiry_never_expires() {
        let session = Session::new("u-2", SecretString::from("t".to_owned()));
        assert!(!session.is_expired(Utc::now()));
        assert!(!session.needs_refresh(Utc::now()));
    }

    #[test]
    fn refresh_is_due_inside_the_leeway() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut session = Session::new("u-3", SecretString::from("t".to_owned()));
        session.expires_at = Some(now + Duration::seconds(REFRESH_LEEWAY_SECS - 1));
        assert!(!session.is_expired(now));
        assert!(!session.needs_refresh(now), "no refresh token to use");

        session.refresh_token = Some(SecretString::from("r".to_owned()));
        assert!(session.needs_refresh(now));
        assert!(!session.needs_refresh(now - Duration::seconds(60)));
    }
}
