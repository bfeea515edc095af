//! # Transaction Boundary and Commit Overlay
//!
//! Two pieces make the commit interval transactional. The
//! [`TransactionBoundary`] trait is the external provider contract: the
//! orchestrator calls `begin` before a chunk's processing starts, `commit`
//! after a successful write, and `rollback` on any chunk-scoped failure.
//! [`TransactionalBuffer`] is the explicit staging overlay used in place of a
//! proxy-intercepted collection: pending additions live in a chunk-scoped
//! buffer and only materialize into the canonical collection on commit.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

/// External transaction provider wrapped around each chunk's commit interval.
#[async_trait]
pub trait TransactionBoundary: Send {
    async fn begin(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
}

/// No-op transaction provider for purely in-memory runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryTransaction;

#[async_trait]
impl TransactionBoundary for InMemoryTransaction {
    async fn begin(&mut self) -> Result<()> {
        debug!("transaction begin");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        debug!("transaction commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        debug!("transaction rollback");
        Ok(())
    }
}

/// Transaction-scoped overlay over a shared canonical collection.
///
/// Single-writer: one chunk owns the pending buffer at a time. Clones share
/// both the canonical collection and the pending buffer, so an observer
/// handle sees exactly the durably committed entries via [`snapshot`].
///
/// [`snapshot`]: TransactionalBuffer::snapshot
#[derive(Debug)]
pub struct TransactionalBuffer<T> {
    canonical: Arc<Mutex<Vec<T>>>,
    pending: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for TransactionalBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            canonical: Arc::clone(&self.canonical),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Clone> Default for TransactionalBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> TransactionalBuffer<T> {
    pub fn new() -> Self {
        Self {
            canonical: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Open a fresh transaction scope, discarding any stale pending entries.
    pub fn begin(&self) {
        self.pending.lock().clear();
    }

    /// Stage an addition into the current transaction scope.
    pub fn stage(&self, item: T) {
        self.pending.lock().push(item);
    }

    /// Materialize all pending additions into the canonical collection.
    pub fn commit(&self) {
        let mut pending = self.pending.lock();
        self.canonical.lock().append(&mut pending);
    }

    /// Discard all pending additions.
    pub fn rollback(&self) {
        self.pending.lock().clear();
    }

    /// Durably committed entries only; staged additions are invisible.
    pub fn snapshot(&self) -> Vec<T> {
        self.canonical.lock().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Clear both canonical and pending state. For use between runs only.
    pub fn reset(&self) {
        self.canonical.lock().clear();
        self.pending.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_entries_invisible_until_commit() {
        let buffer = TransactionalBuffer::new();
        buffer.begin();
        buffer.stage("a");
        buffer.stage("b");
        assert!(buffer.snapshot().is_empty());
        assert_eq!(buffer.pending_len(), 2);

        buffer.commit();
        assert_eq!(buffer.snapshot(), vec!["a", "b"]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn rollback_discards_pending_only() {
        let buffer = TransactionalBuffer::new();
        buffer.begin();
        buffer.stage(1);
        buffer.commit();

        buffer.begin();
        buffer.stage(2);
        buffer.rollback();

        assert_eq!(buffer.snapshot(), vec![1]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn begin_clears_stale_pending() {
        let buffer = TransactionalBuffer::new();
        buffer.stage(1);
        buffer.begin();
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn clones_share_committed_state() {
        let buffer = TransactionalBuffer::new();
        let observer = buffer.clone();

        buffer.begin();
        buffer.stage("x");
        assert!(observer.snapshot().is_empty());

        buffer.commit();
        assert_eq!(observer.snapshot(), vec!["x"]);
    }

    #[tokio::test]
    async fn in_memory_transaction_is_infallible() {
        let mut txn = InMemoryTransaction;
        txn.begin().await.unwrap();
        txn.commit().await.unwrap();
        txn.rollback().await.unwrap();
    }
}
