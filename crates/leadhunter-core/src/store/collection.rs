// ── Ordered reactive entity collection ──
//
// One ordered snapshot per collection, published through a `watch`
// channel. Every mutation swaps in a new `Arc<Vec<_>>`, so readers holding
// an older snapshot never observe a partial update.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Campaign, EntityId, Lead};

/// Entities addressable by id inside a collection.
pub(crate) trait Keyed {
    fn key(&self) -> &EntityId;
}

impl Keyed for Lead {
    fn key(&self) -> &EntityId {
        &self.id
    }
}

impl Keyed for Campaign {
    fn key(&self) -> &EntityId {
        &self.id
    }
}

pub(crate) type Snapshot<T> = Arc<Vec<Arc<T>>>;

pub(crate) struct EntityCollection<T: Keyed + Send + Sync + 'static> {
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Keyed + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Replace the whole collection, keeping the given order.
    pub(crate) fn replace(&self, items: Vec<T>) {
        let values: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    /// Put `item` at the front.
    pub(crate) fn prepend(&self, item: T) {
        self.snapshot.send_modify(|snap| {
            let mut values = Vec::with_capacity(snap.len() + 1);
            values.push(Arc::new(item));
            values.extend(snap.iter().cloned());
            *snap = Arc::new(values);
        });
    }

    /// Replace the entity with `key` by `f(entity)`, in place.
    /// Returns `false` (and publishes nothing) if no entity has that key.
    pub(crate) fn update(&self, key: &EntityId, f: impl FnOnce(&T) -> T) -> bool {
        self.snapshot.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|e| e.key() == key) else {
                return false;
            };
            let mut values: Vec<Arc<T>> = snap.iter().cloned().collect();
            values[pos] = Arc::new(f(&values[pos]));
            *snap = Arc::new(values);
            true
        })
    }

    /// Remove the entity with `key`. Returns it if it was present.
    pub(crate) fn remove(&self, key: &EntityId) -> Option<Arc<T>> {
        let mut removed = None;
        self.snapshot.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|e| e.key() == key) else {
                return false;
            };
            let mut values: Vec<Arc<T>> = snap.iter().cloned().collect();
            removed = Some(values.remove(pos));
            *snap = Arc::new(values);
            true
        });
        removed
    }

    pub(crate) fn get(&self, key: &EntityId) -> Option<Arc<T>> {
        self.snapshot
            .borrow()
            .iter()
            .find(|e| e.key() == key)
            .cloned()
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: EntityId,
        value: u32,
    }

    impl Keyed for Item {
        fn key(&self) -> &EntityId {
            &self.id
        }
    }

    fn item(id: &str, value: u32) -> Item {
        Item {
            id: EntityId::from(id),
            value,
        }
    }

    #[test]
    fn replace_keeps_order() {
        let col = EntityCollection::new();
        col.replace(vec![item("b", 2), item("a", 1)]);
        let snap = col.snapshot();
        assert_eq!(snap[0].id.as_str(), "b");
        assert_eq!(snap[1].id.as_str(), "a");
    }

    #[test]
    fn update_replaces_in_place() {
        let col = EntityCollection::new();
        col.replace(vec![item("a", 1), item("b", 2), item("c", 3)]);

        assert!(col.update(&EntityId::from("b"), |old| item("b", old.value * 10)));
        let snap = col.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[1].value, 20);

        assert!(!col.update(&EntityId::from("zz"), |old| item("zz", old.value)));
    }

    #[test]
    fn prepend_and_remove() {
        let col = EntityCollection::new();
        col.replace(vec![item("a", 1)]);
        col.prepend(item("new", 0));
        assert_eq!(col.snapshot()[0].id.as_str(), "new");
        assert_eq!(col.len(), 2);

        let removed = col.remove(&EntityId::from("a")).unwrap();
        assert_eq!(removed.value, 1);
        assert!(col.get(&EntityId::from("a")).is_none());
        assert!(col.remove(&EntityId::from("a")).is_none());
    }

    #[test]
    fn old_snapshots_are_not_affected_by_mutation() {
        let col = EntityCollection::new();
        col.replace(vec![item("a", 1)]);
        let before = col.snapshot();
        col.update(&EntityId::from("a"), |_| item("a", 9));
        assert_eq!(before[0].value, 1);
        assert_eq!(col.snapshot()[0].value, 9);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let col = EntityCollection::new();
        let mut rx = col.subscribe();
        col.prepend(item("a", 1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
