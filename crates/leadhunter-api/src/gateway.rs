// ── Backend gateway seam ──
//
// The data layer talks to the backend only through `Gateway`. Rows cross
// this seam as raw JSON; typed decoding happens on the consumer side.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::auth::Session;
use crate::error::Error;
use crate::query::{Query, Table};
use crate::realtime::ChangeEvent;

/// Row and change-feed access to the backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch rows from `table` matching `query`.
    async fn query(&self, table: Table, query: &Query) -> Result<Vec<Value>, Error>;

    /// Insert one row and return the stored representation(s).
    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>, Error>;

    /// Apply a partial update to the row with the given id.
    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), Error>;

    /// Delete the row with the given id.
    async fn delete(&self, table: Table, id: &str) -> Result<(), Error>;

    /// The current session, if signed in.
    fn session(&self) -> Option<Session>;

    /// Open a change subscription on `table`.
    async fn subscribe(&self, table: Table) -> Result<ChangeSubscription, Error>;

    /// Release a subscription. After this returns no further events are
    /// delivered through it.
    fn unsubscribe(&self, subscription: ChangeSubscription) {
        subscription.close();
    }
}

/// What a [`ChangeSubscription`] yields.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// A row in the watched table changed.
    Changed(Arc<ChangeEvent>),
    /// The receiver fell behind. Counts the dropped notifications plus
    /// any that were still queued, which are folded into this event.
    Lagged(u64),
}

/// A live change feed for one table.
#[derive(Debug)]
pub struct ChangeSubscription {
    table: Table,
    rx: broadcast::Receiver<Arc<ChangeEvent>>,
    cancel: CancellationToken,
}

impl ChangeSubscription {
    pub fn new(
        table: Table,
        rx: broadcast::Receiver<Arc<ChangeEvent>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { table, rx, cancel }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription is closed or the feed has
    /// shut down. After a lag the backlog is discarded, so a burst that
    /// overflows the buffer surfaces as a single [`SubscriptionEvent::Lagged`].
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            result = self.rx.recv() => result,
        };
        match result {
            Ok(change) => Some(SubscriptionEvent::Changed(change)),
            Err(RecvError::Lagged(missed)) => Some(SubscriptionEvent::Lagged(missed + self.drain())),
            Err(RecvError::Closed) => None,
        }
    }

    /// Drop everything already queued and report how much that was.
    fn drain(&mut self) -> u64 {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => drained += 1,
                Err(TryRecvError::Lagged(n)) => drained += n,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return drained,
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::realtime::ChangeKind;

    fn change() -> Arc<ChangeEvent> {
        Arc::new(ChangeEvent {
            table: "leads".into(),
            schema: Some("public".into()),
            kind: ChangeKind::Insert,
            record: None,
            old_record: None,
            commit_timestamp: None,
        })
    }

    #[tokio::test]
    async fn delivers_changes_until_closed() {
        let (tx, rx) = broadcast::channel(4);
        let mut sub = ChangeSubscription::new(Table::Leads, rx, CancellationToken::new());

        tx.send(change()).unwrap();
        assert!(matches!(sub.recv().await, Some(SubscriptionEvent::Changed(_))));

        sub.close();
        tx.send(change()).unwrap();
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn reports_lag() {
        let (tx, rx) = broadcast::channel(1);
        let mut sub = ChangeSubscription::new(Table::Leads, rx, CancellationToken::new());

        tx.send(change()).unwrap();
        tx.send(change()).unwrap();
        assert!(matches!(sub.recv().await, Some(SubscriptionEvent::Lagged(2))));
    }

    #[tokio::test]
    async fn lag_swallows_the_queued_backlog() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = ChangeSubscription::new(Table::Leads, rx, CancellationToken::new());

        for _ in 0..5 {
            tx.send(change()).unwrap();
        }
        assert!(matches!(sub.recv().await, Some(SubscriptionEvent::Lagged(5))));
        assert!(matches!(sub.rx.try_recv(), Err(TryRecvError::Empty)));

        tx.send(change()).unwrap();
        assert!(matches!(sub.recv().await, Some(SubscriptionEvent::Changed(_))));
    }

    #[tokio::test]
    async fn ends_when_sender_drops() {
        let (tx, rx) = broadcast::channel::<Arc<ChangeEvent>>(1);
        let mut sub = ChangeSubscription::new(Table::Campaigns, rx, CancellationToken::new());
        drop(tx);
        assert!(sub.recv().await.is_none());
    }
}
