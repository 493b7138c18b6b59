//! Realtime change feed with auto-reconnect.
//!
//! Joins one table's change channel over the backend's Phoenix-style
//! WebSocket and streams parsed [`ChangeEvent`]s through a
//! [`tokio::sync::broadcast`] channel. Reconnects with exponential backoff
//! and jitter, re-joining the channel on every new connection.
//!
//! # Example
//!
//! ```rust,ignore
//! use leadhunter_api::{RealtimeHandle, ReconnectConfig, Table};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let base = Url::parse("https://project.example.co")?;
//! let handle = RealtimeHandle::connect(
//!     &base, "anon-key", Table::Leads, None,
//!     ReconnectConfig::default(), CancellationToken::new(),
//! )?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(change) = rx.recv().await {
//!     println!("{} on {}", change.kind, change.table);
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::query::Table;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 256;

const PROTOCOL_VSN: &str = "1.0.0";
const SCHEMA: &str = "public";

// ── ChangeEvent ──────────────────────────────────────────────────────

/// Kind of row change that triggered a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change pushed by the backend.
///
/// The data layer treats these as "something changed" signals and
/// refetches; the record payloads are kept for logging and for consumers
/// that want them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Backoff and keepalive configuration for the realtime connection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,

    /// Interval between protocol heartbeats. Default: 25s.
    pub heartbeat: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
            heartbeat: Duration::from_secs(25),
        }
    }
}

// ── RealtimeHandle ───────────────────────────────────────────────────

/// Handle to a running change feed for one table.
///
/// Call [`shutdown`](Self::shutdown) to tear down the background task;
/// the task also stops when the parent cancellation token fires.
#[derive(Debug)]
pub struct RealtimeHandle {
    table: Table,
    event_tx: broadcast::Sender<Arc<ChangeEvent>>,
    cancel: CancellationToken,
}

impl RealtimeHandle {
    /// Spawn the connection loop for `table`.
    ///
    /// Returns as soon as the task is spawned; the first connection attempt
    /// happens asynchronously. `cancel` should be a child of the owning
    /// gateway's token so that gateway shutdown tears every feed down.
    pub fn connect(
        base_url: &Url,
        anon_key: &str,
        table: Table,
        access_token: Option<SecretString>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let ws_url = realtime_url(base_url, anon_key)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task = ChannelTask {
            url: ws_url,
            table,
            access_token,
            reconnect,
        };
        let task_tx = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(task, task_tx, task_cancel).await;
        });

        Ok(Self {
            table,
            event_tx,
            cancel,
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Get a new broadcast receiver for the change feed.
    ///
    /// A consumer that falls behind receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ChangeEvent>> {
        self.event_tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// A token that fires when this feed shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct ChannelTask {
    url: Url,
    table: Table,
    access_token: Option<SecretString>,
    reconnect: ReconnectConfig,
}

/// connect → join → read → on error, backoff → reconnect.
async fn ws_loop(
    task: ChannelTask,
    event_tx: broadcast::Sender<Arc<ChangeEvent>>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&task, &event_tx, &cancel) => {
                match result {
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!(table = %task.table, "realtime disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(table = %task.table, error = %e, attempt, "realtime error");

                        if let Some(max) = task.reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    table = %task.table,
                                    max_retries = max,
                                    "realtime reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &task.reconnect);
                        tracing::debug!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!(table = %task.table, "realtime loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    task: &ChannelTask,
    event_tx: &broadcast::Sender<Arc<ChangeEvent>>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::debug!(table = %task.table, "connecting realtime channel");

    let uri: tungstenite::http::Uri = task
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::RealtimeConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
        .await
        .map_err(|e| Error::RealtimeConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();
    let topic = channel_topic(task.table);
    let mut msg_ref: u64 = 1;

    let join = join_message(&topic, task.table, task.access_token.as_ref(), msg_ref);
    write
        .send(tungstenite::Message::Text(join.to_string().into()))
        .await
        .map_err(|e| Error::RealtimeConnect(e.to_string()))?;

    tracing::info!(table = %task.table, "realtime channel joined");

    let mut heartbeat = tokio::time::interval(task.reconnect.heartbeat);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            _ = heartbeat.tick() => {
                msg_ref += 1;
                write
                    .send(tungstenite::Message::Text(heartbeat_message(msg_ref).to_string().into()))
                    .await
                    .map_err(|e| Error::RealtimeConnect(e.to_string()))?;
                tracing::trace!("realtime heartbeat");
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(change) = parse_message(text.as_str(), &topic)? {
                            tracing::debug!(table = %change.table, kind = %change.kind, "row change");
                            // No receivers just means nobody is listening right now
                            let _ = event_tx.send(Arc::new(change));
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "realtime close frame received");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(Error::RealtimeConnect(e.to_string())),
                    None => {
                        tracing::info!("realtime stream ended");
                        return Ok(());
                    }
                    // Ping/Pong/Binary
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ── Protocol messages ────────────────────────────────────────────────

/// Phoenix message envelope.
#[derive(Debug, Deserialize)]
struct PhxMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChangesPayload {
    data: ChangeEvent,
}

fn channel_topic(table: Table) -> String {
    format!("realtime:{SCHEMA}:{table}")
}

fn join_message(
    topic: &str,
    table: Table,
    access_token: Option<&SecretString>,
    msg_ref: u64,
) -> Value {
    let mut payload = json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [
                { "event": "*", "schema": SCHEMA, "table": table.as_ref() }
            ]
        }
    });
    if let Some(token) = access_token {
        payload["access_token"] = Value::String(token.expose_secret().to_owned());
    }
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": payload,
        "ref": msg_ref.to_string(),
    })
}

fn heartbeat_message(msg_ref: u64) -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": msg_ref.to_string(),
    })
}

/// Parse one text frame.
///
/// Returns `Ok(Some(_))` for a change on `topic`, `Ok(None)` for replies,
/// heartbeats, and anything unparseable, and `Err` when the server rejects
/// the channel join or reports a channel error.
fn parse_message(text: &str, topic: &str) -> Result<Option<ChangeEvent>, Error> {
    let msg: PhxMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse realtime envelope");
            return Ok(None);
        }
    };

    if msg.topic != topic {
        return Ok(None);
    }

    match msg.event.as_str() {
        "postgres_changes" => match serde_json::from_value::<ChangesPayload>(msg.payload) {
            Ok(p) => Ok(Some(p.data)),
            Err(e) => {
                tracing::debug!(error = %e, "unrecognized change payload");
                Ok(None)
            }
        },
        "phx_reply" if msg.payload["status"] == "error" => Err(Error::RealtimeConnect(format!(
            "channel join rejected: {}",
            msg.payload["response"]
        ))),
        "phx_error" => Err(Error::RealtimeConnect("channel error".into())),
        "phx_close" => Err(Error::RealtimeClosed {
            code: 1000,
            reason: "channel closed by server".into(),
        }),
        _ => Ok(None),
    }
}

/// Build the WebSocket endpoint from the REST base URL.
///
/// `https://host` becomes `wss://host/realtime/v1/websocket?apikey=..&vsn=1.0.0`.
pub fn realtime_url(base_url: &Url, anon_key: &str) -> Result<Url, Error> {
    let mut url = base_url.clone();
    let scheme = match base_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::RealtimeConnect(format!(
                "unsupported URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::RealtimeConnect("cannot derive WebSocket URL".into()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    let mut url = url.join("realtime/v1/websocket")?;
    url.query_pairs_mut()
        .clear()
        .append_pair("apikey", anon_key)
        .append_pair("vsn", PROTOCOL_VSN);
    Ok(url)
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(attempt.min(30) as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOPIC: &str = "realtime:public:leads";

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.heartbeat, Duration::from_secs(25));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_then_caps() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..ReconnectConfig::default()
        };
        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);
        assert!(d1 > d0, "d1 ({d1:?}) should exceed d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should exceed d1 ({d1:?})");
        assert!(calculate_backoff(40, &config) <= Duration::from_millis(12_500));
    }

    #[test]
    fn realtime_url_swaps_scheme_and_sets_query() {
        let base = Url::parse("https://abc.example.co").unwrap();
        let url = realtime_url(&base, "anon").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://abc.example.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let local = Url::parse("http://127.0.0.1:54321/").unwrap();
        assert_eq!(realtime_url(&local, "k").unwrap().scheme(), "ws");
    }

    #[test]
    fn realtime_url_keeps_base_path_prefix() {
        let base = Url::parse("http://localhost:8000/backend").unwrap();
        assert_eq!(
            realtime_url(&base, "anon").unwrap().as_str(),
            "ws://localhost:8000/backend/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );

        let slashed = Url::parse("https://gw.example.co/api/").unwrap();
        assert_eq!(
            realtime_url(&slashed, "anon").unwrap().path(),
            "/api/realtime/v1/websocket"
        );
    }

    #[test]
    fn join_message_targets_table_changes() {
        let token = SecretString::from("jwt".to_owned());
        let msg = join_message(TOPIC, Table::Leads, Some(&token), 1);
        assert_eq!(msg["event"], "phx_join");
        assert_eq!(msg["topic"], TOPIC);
        assert_eq!(msg["payload"]["config"]["postgres_changes"][0]["table"], "leads");
        assert_eq!(msg["payload"]["access_token"], "jwt");
    }

    #[test]
    fn parses_postgres_change() {
        let raw = json!({
            "topic": TOPIC,
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "ids": [1],
                "data": {
                    "type": "UPDATE",
                    "table": "leads",
                    "schema": "public",
                    "record": { "id": "l-1", "status": "won" },
                    "old_record": { "id": "l-1" },
                    "commit_timestamp": "2024-05-02T14:30:00Z"
                }
            }
        });
        let change = parse_message(&raw.to_string(), TOPIC).unwrap().unwrap();
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.table, "leads");
        assert_eq!(change.record.unwrap()["status"], "won");
    }

    #[test]
    fn ignores_replies_other_topics_and_garbage() {
        let ok_reply = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": { "status": "ok", "response": {} }
        });
        assert!(parse_message(&ok_reply.to_string(), TOPIC).unwrap().is_none());

        let heartbeat_reply = json!({
            "topic": "phoenix", "event": "phx_reply", "ref": "2",
            "payload": { "status": "ok", "response": {} }
        });
        assert!(parse_message(&heartbeat_reply.to_string(), TOPIC).unwrap().is_none());

        assert!(parse_message("not json at all", TOPIC).unwrap().is_none());
    }

    #[test]
    fn rejected_join_is_an_error() {
        let reply = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": { "status": "error", "response": { "reason": "unauthorized" } }
        });
        assert!(matches!(
            parse_message(&reply.to_string(), TOPIC),
            Err(Error::RealtimeConnect(_))
        ));
    }

    #[test]
    fn change_kind_serializes_uppercase() {
        assert_eq!(ChangeKind::Delete.to_string(), "DELETE");
        assert_eq!(serde_json::to_value(ChangeKind::Insert).unwrap(), "INSERT");
    }

    #[tokio::test]
    async fn handle_shutdown_cancels_token() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let reconnect = ReconnectConfig {
            max_retries: Some(0),
            ..ReconnectConfig::default()
        };
        let handle = RealtimeHandle::connect(
            &base,
            "anon",
            Table::Campaigns,
            None,
            reconnect,
            CancellationToken::new(),
        )
        .unwrap();
        let _rx = handle.subscribe();
        assert_eq!(handle.subscriber_count(), 1);
        assert_eq!(handle.table(), Table::Campaigns);
        handle.shutdown();
        assert!(handle.is_shut_down());
    }
}
