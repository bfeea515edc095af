//! # Test Doubles
//!
//! Failure-injecting collaborators for exercising skip, retry, and rollback
//! behavior without real I/O. [`FailureInjectingProcessor`] distinguishes
//! items that were *attempted* (the processed list, which survives rollback)
//! from items that were *durably written* (the committed overlay, which
//! participates in the chunk transaction). [`RecordingWriter`] captures
//! written chunks and can be told to fail.
//!
//! Both doubles are cloneable observer handles: clones share state, so a
//! test can keep one handle while the orchestrator drives the other.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ItemError;
use crate::item::{ItemProcessor, ItemWriter};
use crate::transaction::TransactionalBuffer;

/// Which error kind an injected failure raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureKind {
    /// Business failure eligible for skip/retry classification.
    #[default]
    Recoverable,
    /// Unrecoverable failure; the run aborts regardless of classifier.
    Fatal,
}

/// Item processor that records every attempt and simulates failures for
/// designated items.
///
/// On each call the item is appended to the processed list unconditionally,
/// staged into the committed overlay, and then checked against the pending
/// failure records: a match is consumed (one-shot) and the configured error
/// kind is raised. The processed list is never rolled back; the committed
/// overlay materializes only when the surrounding chunk commits.
#[derive(Debug)]
pub struct FailureInjectingProcessor<T> {
    processed: Arc<Mutex<Vec<T>>>,
    committed: TransactionalBuffer<T>,
    failures: Arc<Mutex<Vec<T>>>,
    failure_kind: FailureKind,
}

impl<T> Clone for FailureInjectingProcessor<T> {
    fn clone(&self) -> Self {
        Self {
            processed: Arc::clone(&self.processed),
            committed: self.committed.clone(),
            failures: Arc::clone(&self.failures),
            failure_kind: self.failure_kind,
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> FailureInjectingProcessor<T> {
    /// Processor with no injected failures.
    pub fn new() -> Self {
        Self::with_failures_of_kind(Vec::new(), FailureKind::default())
    }

    /// Processor whose designated items fail with a recoverable error.
    pub fn with_failures(failures: Vec<T>) -> Self {
        Self::with_failures_of_kind(failures, FailureKind::Recoverable)
    }

    pub fn with_failures_of_kind(failures: Vec<T>, failure_kind: FailureKind) -> Self {
        Self {
            processed: Arc::new(Mutex::new(Vec::new())),
            committed: TransactionalBuffer::new(),
            failures: Arc::new(Mutex::new(failures)),
            failure_kind,
        }
    }

    /// Every item that has passed through `process`, including failed
    /// attempts and re-processed items.
    pub fn processed(&self) -> Vec<T> {
        self.processed.lock().clone()
    }

    /// Items whose containing chunk durably committed.
    pub fn committed(&self) -> Vec<T> {
        self.committed.snapshot()
    }

    /// Failure records not yet consumed.
    pub fn pending_failures(&self) -> Vec<T> {
        self.failures.lock().clone()
    }

    /// Reset processed, committed, and pending failure records together.
    /// For use between runs only.
    pub fn clear(&self) {
        self.processed.lock().clear();
        self.committed.reset();
        self.failures.lock().clear();
    }

    fn take_failure(&self, item: &T) -> bool {
        let mut failures = self.failures.lock();
        if let Some(pos) = failures.iter().position(|f| f == item) {
            failures.remove(pos);
            true
        } else {
            false
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> Default for FailureInjectingProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> ItemProcessor<T> for FailureInjectingProcessor<T>
where
    T: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    async fn process(&mut self, item: T) -> Result<T, ItemError> {
        self.processed.lock().push(item.clone());
        self.committed.stage(item.clone());

        if self.take_failure(&item) {
            return Err(match self.failure_kind {
                FailureKind::Recoverable => {
                    ItemError::recoverable(format!("injected failure for {item:?}"))
                }
                FailureKind::Fatal => ItemError::fatal(format!("injected failure for {item:?}")),
            });
        }
        Ok(item)
    }

    fn on_chunk_begin(&mut self) {
        self.committed.begin();
    }

    fn on_chunk_commit(&mut self) {
        self.committed.commit();
    }

    fn on_chunk_rollback(&mut self) {
        self.committed.rollback();
    }
}

/// How a [`RecordingWriter`] fails.
#[derive(Debug, Clone)]
enum WriteFailure<T> {
    Never,
    Always,
    /// Fail the first `n` write calls, then succeed.
    FirstCalls(u32),
    /// Fail whenever the chunk contains one of these items.
    OnItems(Vec<T>),
}

/// Item writer that records every successfully written chunk.
///
/// All-or-nothing per call: a failing write records nothing.
#[derive(Debug)]
pub struct RecordingWriter<T> {
    chunks: Arc<Mutex<Vec<Vec<T>>>>,
    failure: Arc<Mutex<WriteFailure<T>>>,
    write_calls: Arc<Mutex<u32>>,
}

impl<T> Clone for RecordingWriter<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: Arc::clone(&self.chunks),
            failure: Arc::clone(&self.failure),
            write_calls: Arc::clone(&self.write_calls),
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> RecordingWriter<T> {
    pub fn new() -> Self {
        Self::with_failure(WriteFailure::Never)
    }

    /// Writer that fails every write call.
    pub fn failing_always() -> Self {
        Self::with_failure(WriteFailure::Always)
    }

    /// Writer that fails the first `n` write calls, then succeeds.
    pub fn failing_first(n: u32) -> Self {
        Self::with_failure(WriteFailure::FirstCalls(n))
    }

    /// Writer that fails whenever a chunk contains one of `items`.
    pub fn failing_on_items(items: Vec<T>) -> Self {
        Self::with_failure(WriteFailure::OnItems(items))
    }

    fn with_failure(failure: WriteFailure<T>) -> Self {
        Self {
            chunks: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(failure)),
            write_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Successfully written chunks, in commit order.
    pub fn written_chunks(&self) -> Vec<Vec<T>> {
        self.chunks.lock().clone()
    }

    /// All successfully written items, flattened in commit order.
    pub fn written_items(&self) -> Vec<T> {
        self.chunks.lock().iter().flatten().cloned().collect()
    }

    /// Total write calls, including failed ones.
    pub fn write_calls(&self) -> u32 {
        *self.write_calls.lock()
    }

    /// Reset recorded chunks and the call counter. For use between runs.
    pub fn clear(&self) {
        self.chunks.lock().clear();
        *self.write_calls.lock() = 0;
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> Default for RecordingWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> ItemWriter<T> for RecordingWriter<T>
where
    T: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    async fn write(&mut self, items: &[T]) -> Result<(), ItemError> {
        *self.write_calls.lock() += 1;

        let mut failure = self.failure.lock();
        let fail = match &mut *failure {
            WriteFailure::Never => false,
            WriteFailure::Always => true,
            WriteFailure::FirstCalls(remaining) => {
                if *remaining > 0 {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            }
            WriteFailure::OnItems(marked) => items.iter().any(|i| marked.contains(i)),
        };
        drop(failure);

        if fail {
            return Err(ItemError::write(format!(
                "injected write failure for chunk of {} items",
                items.len()
            )));
        }

        self.chunks.lock().push(items.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn processor_records_attempts_and_stages_commits() {
        let mut processor = FailureInjectingProcessor::new();
        processor.on_chunk_begin();
        processor.process("a").await.unwrap();
        processor.process("b").await.unwrap();

        assert_eq!(processor.processed(), vec!["a", "b"]);
        // Staged only; nothing durable until the chunk commits.
        assert!(processor.committed().is_empty());

        processor.on_chunk_commit();
        assert_eq!(processor.committed(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_item_stays_processed_but_not_committed() {
        let mut processor = FailureInjectingProcessor::with_failures(vec!["bad"]);
        processor.on_chunk_begin();
        let err = processor.process("bad").await.unwrap_err();
        assert!(matches!(err, ItemError::Recoverable { .. }));

        processor.on_chunk_rollback();
        assert_eq!(processor.processed(), vec!["bad"]);
        assert!(processor.committed().is_empty());
    }

    #[tokio::test]
    async fn failure_records_are_consumed_once() {
        let mut processor = FailureInjectingProcessor::with_failures(vec![7]);
        processor.on_chunk_begin();
        assert!(processor.process(7).await.is_err());
        assert!(processor.pending_failures().is_empty());
        // Second attempt succeeds; the record was consumed.
        assert!(processor.process(7).await.is_ok());
    }

    #[tokio::test]
    async fn fatal_kind_raises_fatal_errors() {
        let mut processor =
            FailureInjectingProcessor::with_failures_of_kind(vec![1], FailureKind::Fatal);
        processor.on_chunk_begin();
        let err = processor.process(1).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn clear_resets_all_tracking() {
        let mut processor = FailureInjectingProcessor::with_failures(vec![2, 3]);
        processor.on_chunk_begin();
        let _ = processor.process(1).await;
        let _ = processor.process(2).await;
        processor.on_chunk_commit();

        processor.clear();
        assert!(processor.processed().is_empty());
        assert!(processor.committed().is_empty());
        assert!(processor.pending_failures().is_empty());
    }

    #[tokio::test]
    async fn writer_records_chunks_in_order() {
        let mut writer = RecordingWriter::new();
        writer.write(&[1, 2]).await.unwrap();
        writer.write(&[3]).await.unwrap();

        assert_eq!(writer.written_chunks(), vec![vec![1, 2], vec![3]]);
        assert_eq!(writer.written_items(), vec![1, 2, 3]);
        assert_eq!(writer.write_calls(), 2);
    }

    #[tokio::test]
    async fn failing_writer_records_nothing() {
        let mut writer = RecordingWriter::failing_always();
        assert!(writer.write(&[1]).await.is_err());
        assert!(writer.written_chunks().is_empty());
        assert_eq!(writer.write_calls(), 1);
    }

    #[tokio::test]
    async fn first_n_failures_then_success() {
        let mut writer = RecordingWriter::failing_first(1);
        assert!(writer.write(&[1]).await.is_err());
        assert!(writer.write(&[1]).await.is_ok());
        assert_eq!(writer.written_items(), vec![1]);
    }

    #[tokio::test]
    async fn item_triggered_failures_persist() {
        let mut writer = RecordingWriter::failing_on_items(vec!["c"]);
        assert!(writer.write(&["a", "c"]).await.is_err());
        assert!(writer.write(&["c"]).await.is_err());
        assert!(writer.write(&["a"]).await.is_ok());
    }

    #[tokio::test]
    async fn observer_clone_shares_state() {
        let mut processor = FailureInjectingProcessor::new();
        let observer = processor.clone();

        processor.on_chunk_begin();
        processor.process(9).await.unwrap();
        processor.on_chunk_commit();

        assert_eq!(observer.processed(), vec![9]);
        assert_eq!(observer.committed(), vec![9]);
    }
}
