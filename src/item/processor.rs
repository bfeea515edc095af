use async_trait::async_trait;

use crate::error::ItemError;

/// Transforms or validates one item at a time.
///
/// The chunk orchestrator wraps every chunk in a transaction boundary and
/// notifies the processor through the `on_chunk_*` hooks. Processors that
/// stage transaction-scoped state (for example a committed-set overlay)
/// materialize or discard it from those hooks; stateless processors keep the
/// default no-op bodies.
#[async_trait]
pub trait ItemProcessor<T>: Send {
    /// Process a single item, returning the (possibly transformed) item or a
    /// classified failure.
    async fn process(&mut self, item: T) -> Result<T, ItemError>;

    /// A new chunk transaction has begun.
    fn on_chunk_begin(&mut self) {}

    /// The surrounding chunk committed; staged state becomes durable.
    fn on_chunk_commit(&mut self) {}

    /// The surrounding chunk rolled back; staged state must be discarded.
    fn on_chunk_rollback(&mut self) {}
}

/// Identity processor that passes every item through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughProcessor;

#[async_trait]
impl<T: Send + 'static> ItemProcessor<T> for PassthroughProcessor {
    async fn process(&mut self, item: T) -> Result<T, ItemError> {
        Ok(item)
    }
}
