// Async client for the LeadHunter managed backend.
//
// REST rows: /rest/v1/{table}   (apikey header + Bearer token)
// Auth:      /auth/v1/token?grant_type=password|refresh_token, /auth/v1/logout
// Realtime:  /realtime/v1/websocket (see realtime.rs)

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::auth::{AuthErrorBody, Credentials, Session, TokenResponse};
use crate::error::Error;
use crate::gateway::{ChangeSubscription, Gateway};
use crate::query::{Query, Table};
use crate::realtime::{RealtimeHandle, ReconnectConfig};
use crate::transport::TransportConfig;

// ── Error response shape from the REST layer ─────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// [`Gateway`] implementation backed by the hosted REST, auth, and
/// realtime endpoints.
///
/// Requests carry the project's anon key in the `apikey` header. Once a
/// session exists its access token is sent as the bearer token, otherwise
/// the anon key is. A session close to expiry is renewed with its refresh
/// token before the request goes out.
pub struct RestGateway {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
    refresh: tokio::sync::Mutex<()>,
    reconnect: ReconnectConfig,
    feeds: Mutex<HashMap<Table, RealtimeHandle>>,
    cancel: CancellationToken,
}

impl RestGateway {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from the project URL, anon key, and transport config.
    pub fn new(
        base_url: &str,
        anon_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(anon_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid anon key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert("apikey", key_value);

        let http = transport.build_client_with_headers(headers)?;
        Self::with_client(base_url, anon_key, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages the `apikey` header).
    pub fn with_client(
        base_url: &str,
        anon_key: SecretString,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            anon_key,
            session: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
            reconnect: ReconnectConfig::default(),
            feeds: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Auth ─────────────────────────────────────────────────────────

    /// Exchange email and password for a session and keep it for
    /// subsequent requests.
    pub async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, Error> {
        let session = self
            .token_grant(
                "password",
                &json!({
                    "email": credentials.email,
                    "password": credentials.password.expose_secret(),
                }),
            )
            .await?;
        tracing::info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// Trade the session's refresh token for a new access token.
    ///
    /// A failed refresh leaves the old session in place and surfaces as
    /// [`Error::Authentication`].
    async fn refresh_session(&self, current: &Session) -> Result<Session, Error> {
        let Some(refresh_token) = &current.refresh_token else {
            return Ok(current.clone());
        };
        let mut session = self
            .token_grant(
                "refresh_token",
                &json!({ "refresh_token": refresh_token.expose_secret() }),
            )
            .await?;
        if session.refresh_token.is_none() {
            session.refresh_token = current.refresh_token.clone();
            self.set_session(Some(session.clone()));
        }
        tracing::info!(user_id = %session.user_id, "session refreshed");
        Ok(session)
    }

    /// POST to the token endpoint and install the resulting session.
    async fn token_grant(&self, grant_type: &str, body: &Value) -> Result<Session, Error> {
        let url = self.base_url.join("auth/v1/token")?;
        debug!("POST {url} grant_type={grant_type}");

        let resp = self
            .http
            .post(url)
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body: AuthErrorBody = resp.json().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: body.into_message(status.as_str()),
            });
        }

        let token: TokenResponse = self.handle_response(resp).await?;
        let session = token.into_session(Utc::now());
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Revoke the current session server-side and forget it locally.
    ///
    /// The local session is cleared even when the revoke call fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        self.set_session(None);

        let url = self.base_url.join("auth/v1/logout")?;
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    /// Install (or clear) the session used for authorization.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Stop every realtime feed opened through this gateway.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn table_url(&self, table: Table) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("rest/v1/{table}"))?)
    }

    /// The session to authorize with, refreshed first when it is due.
    ///
    /// Concurrent callers share one refresh.
    async fn live_session(&self) -> Result<Option<Session>, Error> {
        match self.session() {
            Some(session) if session.needs_refresh(Utc::now()) => {}
            other => return Ok(other),
        }
        let _refreshing = self.refresh.lock().await;
        match self.session() {
            Some(session) if session.needs_refresh(Utc::now()) => {
                self.refresh_session(&session).await.map(Some)
            }
            other => Ok(other),
        }
    }

    async fn bearer(&self) -> Result<String, Error> {
        Ok(self.live_session().await?.map_or_else(
            || self.anon_key.expose_secret().to_owned(),
            |s| s.access_token.expose_secret().to_owned(),
        ))
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&raw).ok();

        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Error::Unauthorized {
                message: parsed
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| status.to_string()),
            };
        }

        match parsed {
            Some(err) => Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            },
            None => Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            },
        }
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn query(&self, table: Table, query: &Query) -> Result<Vec<Value>, Error> {
        let url = self.table_url(table)?;
        let params = query.to_params();
        let bearer = self.bearer().await?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .query(&params)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, Error> {
        let url = self.table_url(table)?;
        let bearer = self.bearer().await?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), Error> {
        let url = self.table_url(table)?;
        let bearer = self.bearer().await?;
        debug!("PATCH {url} id={id}");

        let resp = self
            .http
            .patch(url)
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal")
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), Error> {
        let url = self.table_url(table)?;
        let bearer = self.bearer().await?;
        debug!("DELETE {url} id={id}");

        let resp = self
            .http
            .delete(url)
            .bearer_auth(bearer)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn subscribe(&self, table: Table) -> Result<ChangeSubscription, Error> {
        let access_token = self.live_session().await?.map(|s| s.access_token);
        let mut feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);

        if feeds.get(&table).is_some_and(RealtimeHandle::is_shut_down) {
            feeds.remove(&table);
        }
        let handle = match feeds.entry(table) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let handle = RealtimeHandle::connect(
                    &self.base_url,
                    self.anon_key.expose_secret(),
                    table,
                    access_token,
                    self.reconnect.clone(),
                    self.cancel.child_token(),
                )?;
                e.insert(handle)
            }
        };

        Ok(ChangeSubscription::new(
            table,
            handle.subscribe(),
            handle.child_token(),
        ))
    }

    fn unsubscribe(&self, subscription: ChangeSubscription) {
        let table = subscription.table();
        subscription.close();
        drop(subscription);

        let mut feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);
        if feeds
            .get(&table)
            .is_some_and(|h| h.subscriber_count() == 0)
        {
            if let Some(handle) = feeds.remove(&table) {
                debug!(%table, "last subscriber gone, closing realtime feed");
                handle.shutdown();
            }
        }
    }
}

impl Drop for RestGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Ensure the base URL ends with `/` so relative joins keep any path prefix.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://abc.example.co").unwrap();
        assert_eq!(url.as_str(), "https://abc.example.co/");

        let prefixed = normalize_base_url("http://localhost:8000/backend").unwrap();
        assert_eq!(
            prefixed.join("rest/v1/leads").unwrap().as_str(),
            "http://localhost:8000/backend/rest/v1/leads"
        );
    }

    #[tokio::test]
    async fn bearer_falls_back_to_anon_key() {
        let gw = RestGateway::new(
            "http://localhost:54321",
            SecretString::from("anon".to_owned()),
            &TransportConfig::default(),
        )
        .unwrap();
        assert_eq!(gw.bearer().await.unwrap(), "anon");

        gw.set_session(Some(Session::new("u-1", SecretString::from("jwt".to_owned()))));
        assert_eq!(gw.bearer().await.unwrap(), "jwt");
        assert_eq!(gw.session().unwrap().user_id, "u-1");
    }
}
