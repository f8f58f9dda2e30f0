use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::QueryResponse;

/// Scan results keyed by scan id, shared between the HTTP handlers and the dispatcher.
///
/// Cloning is cheap and every clone sees the same entries. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct ResultStore {
    inner: Arc<RwLock<HashMap<u64, QueryResponse>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for `id`. Last write wins.
    pub async fn put(&self, id: u64, result: QueryResponse) {
        self.inner.write().await.insert(id, result);
    }

    pub async fn get(&self, id: u64) -> Option<QueryResponse> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Insert `result` only if `id` is not taken yet. Returns whether it was inserted.
    pub async fn insert_new(&self, id: u64, result: QueryResponse) -> bool {
        let mut map = self.inner.write().await;
        if map.contains_key(&id) {
            return false;
        }
        map.insert(id, result);
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
