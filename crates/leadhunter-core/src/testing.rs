// ── In-memory gateway for core tests ──

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use leadhunter_api::{
    ChangeEvent, ChangeKind, ChangeSubscription, Error, Gateway, Query, Session, Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Query,
    Insert,
    Update,
    Delete,
}

/// A [`Gateway`] over in-memory JSON rows.
///
/// Supports equality filters and ordering on one column, per-operation
/// injected failures, a per-table query counter, and a change feed driven
/// by [`emit`](Self::emit).
#[derive(Default)]
pub(crate) struct MemoryGateway {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    session: Mutex<Option<Session>>,
    failures: Mutex<HashSet<(Op, Table)>>,
    queries: Mutex<HashMap<Table, usize>>,
    feeds: Mutex<HashMap<Table, broadcast::Sender<Arc<ChangeEvent>>>>,
    unsubscribed: AtomicUsize,
    next_id: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

impl MemoryGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn seed(&self, table: Table, rows: Vec<Value>) {
        lock(&self.tables).insert(table, rows);
    }

    pub(crate) fn rows(&self, table: Table) -> Vec<Value> {
        lock(&self.tables).get(&table).cloned().unwrap_or_default()
    }

    pub(crate) fn sign_in(&self, user_id: &str) {
        *lock(&self.session) = Some(Session::new(user_id, SecretString::from("test-token")));
    }

    /// Make `op` on `table` fail with a network-style error until cleared.
    pub(crate) fn fail(&self, op: Op, table: Table) {
        lock(&self.failures).insert((op, table));
    }

    pub(crate) fn recover(&self, op: Op, table: Table) {
        lock(&self.failures).remove(&(op, table));
    }

    pub(crate) fn query_count(&self, table: Table) -> usize {
        lock(&self.queries).get(&table).copied().unwrap_or(0)
    }

    pub(crate) fn unsubscribed(&self) -> usize {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    /// Create the change feed for `table` with a given buffer size, ahead
    /// of the first subscriber. Later subscribers share it.
    pub(crate) fn open_feed(&self, table: Table, capacity: usize) {
        lock(&self.feeds).insert(table, broadcast::channel(capacity).0);
    }

    /// Push a change notification to every subscriber of `table`.
    /// Returns how many receivers got it.
    pub(crate) fn emit(&self, table: Table, kind: ChangeKind) -> usize {
        let Some(tx) = lock(&self.feeds).get(&table).cloned() else {
            return 0;
        };
        tx.send(Arc::new(ChangeEvent {
            table: table.to_string(),
            schema: Some("public".into()),
            kind,
            record: None,
            old_record: None,
            commit_timestamp: None,
        }))
        .unwrap_or(0)
    }

    fn check(&self, op: Op, table: Table) -> Result<(), Error> {
        if lock(&self.failures).contains(&(op, table)) {
            return Err(Error::Timeout { timeout_secs: 30 });
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn query(&self, table: Table, query: &Query) -> Result<Vec<Value>, Error> {
        *lock(&self.queries).entry(table).or_default() += 1;
        self.check(Op::Query, table)?;

        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| {
                query.filters().iter().all(|f| {
                    row.get(&f.column).is_some_and(|v| text(v) == f.value)
                })
            })
            .collect();

        if let Some(order) = query.ordering() {
            rows.sort_by(|a, b| {
                let key = |r: &Value| r.get(&order.column).map(text).unwrap_or_default();
                let cmp = key(a).cmp(&key(b));
                if order.ascending { cmp } else { cmp.reverse() }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Value) -> Result<Vec<Value>, Error> {
        self.check(Op::Insert, table)?;
        if let Value::Object(map) = &mut row {
            if !map.contains_key("id") {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                map.insert("id".into(), Value::String(format!("mem-{n}")));
            }
        }
        lock(&self.tables)
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), Error> {
        self.check(Op::Update, table)?;
        let mut tables = lock(&self.tables);
        let rows = tables.entry(table).or_default();
        if let (Some(Value::Object(target)), Value::Object(fields)) =
            (rows.iter_mut().find(|r| row_id(r) == Some(id)), patch)
        {
            target.extend(fields);
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), Error> {
        self.check(Op::Delete, table)?;
        lock(&self.tables)
            .entry(table)
            .or_default()
            .retain(|r| row_id(r) != Some(id));
        Ok(())
    }

    fn session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    async fn subscribe(&self, table: Table) -> Result<ChangeSubscription, Error> {
        let rx = lock(&self.feeds)
            .entry(table)
            .or_insert_with(|| broadcast::channel(16).0)
            .subscribe();
        Ok(ChangeSubscription::new(table, rx, CancellationToken::new()))
    }

    fn unsubscribe(&self, subscription: ChangeSubscription) {
        self.unsubscribed.fetch_add(1, Ordering::SeqCst);
        subscription.close();
    }
}
