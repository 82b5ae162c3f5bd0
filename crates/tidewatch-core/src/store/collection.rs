// ── Reactive entity collection ──
//
// Concurrent id-keyed storage with a secondary natural-key index and a
// sorted snapshot that is rebuilt on every change.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// An entity with a server id and a human-facing natural key
/// (model number, serial number).
pub trait Keyed {
    fn id(&self) -> &str;
    fn code(&self) -> &str;
}

/// A concurrent collection for a single entity type.
///
/// Every mutation rebuilds the snapshot readers receive. Snapshots are
/// ordered by natural key.
pub(crate) struct EntityCollection<T: Keyed + Send + Sync + 'static> {
    by_id: DashMap<String, Arc<T>>,

    /// Natural key -> id.
    code_to_id: DashMap<String, String>,

    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Keyed + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            code_to_id: DashMap::new(),
            snapshot,
        }
    }

    /// Upsert every incoming entity, then prune ids not in the incoming
    /// set. Readers see one change, never an empty intermediate state.
    pub(crate) fn replace_all(&self, items: Vec<T>) {
        let incoming: HashSet<String> = items.iter().map(|e| e.id().to_owned()).collect();
        for entity in items {
            self.upsert(entity);
        }
        for id in self.ids() {
            if !incoming.contains(&id) {
                self.remove(&id);
            }
        }
        self.publish();
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<T>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn get_by_code(&self, code: &str) -> Option<Arc<T>> {
        let id = self.code_to_id.get(code)?;
        self.get(id.value())
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.by_id.clear();
        self.code_to_id.clear();
        self.publish();
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ids(&self) -> Vec<String> {
        self.by_id.iter().map(|r| r.key().clone()).collect()
    }

    fn upsert(&self, entity: T) {
        let id = entity.id().to_owned();
        let code = entity.code().to_owned();

        // Drop the old natural key if it changed.
        if let Some(old) = self.by_id.get(&id).map(|r| r.code().to_owned()) {
            if old != code {
                self.code_to_id.remove(&old);
            }
        }

        self.by_id.insert(id.clone(), Arc::new(entity));
        self.code_to_id.insert(code, id);
    }

    fn remove(&self, id: &str) {
        if let Some((_, removed)) = self.by_id.remove(id) {
            self.code_to_id.remove_if(removed.code(), |_, mapped| mapped == id);
        }
    }

    fn publish(&self) {
        let mut values: Vec<Arc<T>> = self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| a.code().cmp(b.code()));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, &'static str);

    impl Keyed for Item {
        fn id(&self) -> &str {
            self.0
        }
        fn code(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn lookup_by_id_and_code() {
        let col = EntityCollection::new();
        col.replace_all(vec![Item("1", "WB-100")]);

        assert_eq!(*col.get("1").unwrap(), Item("1", "WB-100"));
        assert_eq!(*col.get_by_code("WB-100").unwrap(), Item("1", "WB-100"));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn changed_code_drops_old_mapping() {
        let col = EntityCollection::new();
        col.replace_all(vec![Item("1", "old")]);
        col.replace_all(vec![Item("1", "new")]);

        assert!(col.get_by_code("old").is_none());
        assert!(col.get_by_code("new").is_some());
    }

    #[test]
    fn replace_all_prunes_and_sorts() {
        let col = EntityCollection::new();
        col.replace_all(vec![Item("1", "b"), Item("2", "gone")]);

        col.replace_all(vec![Item("1", "b"), Item("3", "a")]);

        let snap = col.snapshot();
        let codes: Vec<_> = snap.iter().map(|i| i.code()).collect();
        assert_eq!(codes, vec!["a", "b"]);
        assert!(col.get("2").is_none());
        assert!(col.get_by_code("gone").is_none());
    }

    #[test]
    fn clear_empties_snapshot() {
        let col = EntityCollection::new();
        col.replace_all(vec![Item("1", "a")]);
        col.clear();
        assert!(col.snapshot().is_empty());
        assert_eq!(col.len(), 0);
    }
}
