use async_trait::async_trait;

use crate::error::ItemError;

/// Accepts a chunk of processed items and persists them atomically.
///
/// A write call is all-or-nothing: on failure no partial write may be
/// visible. The orchestrator rolls the chunk back and consults the failure
/// classifier when a write fails.
#[async_trait]
pub trait ItemWriter<T>: Send {
    async fn write(&mut self, items: &[T]) -> Result<(), ItemError>;
}
