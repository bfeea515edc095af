//! # Chunk Orchestrator
//!
//! Drives the read → process → buffer → write → commit loop over the item
//! collaborators. The orchestrator owns chunk boundaries: it accumulates
//! items up to the configured chunk size, passes each through the processor,
//! hands the surviving chunk atomically to the writer, and commits or rolls
//! back the surrounding transaction per chunk.
//!
//! ## Failure handling
//!
//! The orchestrator is the sole consumer of classifier verdicts:
//!
//! - **Skip**: the chunk transaction rolls back (discarding any tentative
//!   staged state), the failing item is excluded, the skip counter
//!   increments, and the surviving items are re-processed in a fresh
//!   transaction.
//! - **Retry**: the transaction rolls back and the chunk is re-processed
//!   with the item retained, bounded by the configured retry limit.
//! - **Abort**: the run terminates; the triggering error propagates to the
//!   caller unchanged as the source of [`ChunkflowError::Aborted`].
//!
//! A write failure rolls the chunk back first, then follows the same
//! decision table. A skip verdict on a write failure enters single-item scan
//! mode: each surviving item is processed and written in its own
//! transaction, so only the culprit is excluded.
//!
//! Fatal errors abort unconditionally, bypassing the classifier.
//!
//! ## Ordering
//!
//! Items within a chunk are processed in the order read from the source, and
//! chunks commit in creation order. There is no concurrent chunk execution.

use std::fmt;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{
    FailureClassifier, FailureContext, FailurePhase, StandardFailureClassifier, Verdict,
};
use crate::config::ChunkConfig;
use crate::error::{ChunkflowError, ItemError, Result};
use crate::events::{BatchEvent, EventPublisher};
use crate::item::{ItemProcessor, ItemSource, ItemWriter};
use crate::orchestration::states::ChunkState;
use crate::orchestration::types::{ChunkOutcome, RunSummary};
use crate::transaction::{InMemoryTransaction, TransactionBoundary};

/// Chunk-oriented pipeline driver.
///
/// Construct with [`ChunkOrchestrator::new`], optionally swap in a custom
/// classifier or transaction boundary, then call [`run`] with the item
/// collaborators. The skip counter accumulates across runs until [`clear`]
/// is called; an aborted orchestrator must be cleared before it can run
/// again.
///
/// [`run`]: ChunkOrchestrator::run
/// [`clear`]: ChunkOrchestrator::clear
pub struct ChunkOrchestrator<T> {
    config: ChunkConfig,
    classifier: Box<dyn FailureClassifier<T>>,
    transaction: Box<dyn TransactionBoundary>,
    publisher: EventPublisher,
    state: ChunkState,
    skip_count: u32,
}

impl<T> ChunkOrchestrator<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    /// Create an orchestrator with the standard classifier and the in-memory
    /// transaction boundary.
    pub fn new(config: ChunkConfig) -> Self {
        let publisher = EventPublisher::new(config.event_channel_capacity);
        Self {
            config,
            classifier: Box::new(StandardFailureClassifier::new()),
            transaction: Box::new(InMemoryTransaction),
            publisher,
            state: ChunkState::default(),
            skip_count: 0,
        }
    }

    /// Replace the failure classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn FailureClassifier<T>>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the transaction boundary provider.
    pub fn with_transaction_boundary(mut self, boundary: Box<dyn TransactionBoundary>) -> Self {
        self.transaction = boundary;
        self
    }

    /// Current run state.
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Items skipped since the last [`clear`](ChunkOrchestrator::clear).
    pub fn skip_count(&self) -> u32 {
        self.skip_count
    }

    /// Subscribe to run lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::events::PublishedEvent> {
        self.publisher.subscribe()
    }

    /// Reset skip counter and state between runs. Undefined results if the
    /// collaborators are mid-chunk, so only call while no run is active.
    pub fn clear(&mut self) {
        self.skip_count = 0;
        self.state = ChunkState::Idle;
    }

    /// Drive the pipeline until the source is exhausted or the run aborts.
    ///
    /// A partial trailing chunk is written and committed before shutdown.
    /// On abort the state machine parks in [`ChunkState::Aborted`] and the
    /// triggering error is returned.
    pub async fn run<S, P, W>(
        &mut self,
        source: &mut S,
        processor: &mut P,
        writer: &mut W,
    ) -> Result<RunSummary>
    where
        S: ItemSource<T>,
        P: ItemProcessor<T>,
        W: ItemWriter<T>,
    {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let skip_count_at_start = self.skip_count;
        let mut summary = RunSummary {
            run_id,
            items_read: 0,
            items_written: 0,
            skip_count: 0,
            chunks_committed: 0,
            chunks_rolled_back: 0,
            started_at,
            finished_at: started_at,
            chunk_outcomes: Vec::new(),
        };

        info!(%run_id, chunk_size = self.config.chunk_size, "run started");
        self.publisher.publish(BatchEvent::RunStarted { run_id }).await;

        let mut chunk_index: u64 = 0;
        loop {
            self.transition(ChunkState::Reading)?;
            let mut inputs = Vec::with_capacity(self.config.chunk_size);
            while inputs.len() < self.config.chunk_size {
                match source.next().await {
                    Some(item) => inputs.push(item),
                    None => break,
                }
            }

            if inputs.is_empty() {
                self.transition(ChunkState::Idle)?;
                break;
            }
            summary.items_read += inputs.len();

            match self.execute_chunk(run_id, chunk_index, inputs, processor, writer).await {
                Ok(outcome) => {
                    summary.items_written += outcome.written;
                    summary.chunks_committed += 1;
                    summary.chunks_rolled_back += u64::from(outcome.rollbacks);
                    summary.chunk_outcomes.push(outcome);
                }
                Err(err) => {
                    return Err(self.fail_run(run_id, err).await);
                }
            }

            self.transition(ChunkState::Idle)?;
            chunk_index += 1;
        }

        summary.skip_count = self.skip_count - skip_count_at_start;
        summary.finished_at = Utc::now();

        info!(
            %run_id,
            items_read = summary.items_read,
            items_written = summary.items_written,
            skip_count = summary.skip_count,
            chunks_committed = summary.chunks_committed,
            "run completed"
        );
        self.publisher
            .publish(BatchEvent::RunCompleted {
                run_id,
                chunks_committed: summary.chunks_committed,
                skip_count: summary.skip_count,
            })
            .await;

        Ok(summary)
    }

    /// Process, write, and commit a single chunk, re-attempting after
    /// rollbacks until it commits or the run aborts.
    async fn execute_chunk<P, W>(
        &mut self,
        run_id: Uuid,
        chunk_index: u64,
        inputs: Vec<T>,
        processor: &mut P,
        writer: &mut W,
    ) -> Result<ChunkOutcome>
    where
        P: ItemProcessor<T>,
        W: ItemWriter<T>,
    {
        let mut skipped = vec![false; inputs.len()];
        let mut attempts = vec![1u32; inputs.len()];
        let mut write_attempts: u32 = 1;
        let mut rollbacks: u32 = 0;

        loop {
            self.transition(ChunkState::Processing)?;
            self.transaction.begin().await?;
            processor.on_chunk_begin();

            let mut outputs = Vec::with_capacity(inputs.len());
            let mut failure: Option<(usize, ItemError)> = None;
            for (i, item) in inputs.iter().enumerate() {
                if skipped[i] {
                    continue;
                }
                match processor.process(item.clone()).await {
                    Ok(out) => outputs.push(out),
                    Err(err) => {
                        failure = Some((i, err));
                        break;
                    }
                }
            }

            if let Some((i, err)) = failure {
                self.rollback_chunk(run_id, chunk_index, processor, &err).await?;
                rollbacks += 1;

                let context = FailureContext {
                    chunk_index,
                    attempt_number: attempts[i],
                    max_attempts: self.config.retry_limit,
                    phase: FailurePhase::Processing,
                };
                match self.decide(Some(&inputs[i]), &err, &context) {
                    Verdict::Skip => {
                        self.record_skip(run_id, chunk_index, &inputs[i], &err).await?;
                        skipped[i] = true;
                        continue;
                    }
                    Verdict::Retry { delay } => {
                        if attempts[i] >= self.config.retry_limit {
                            return Err(ChunkflowError::RetryLimitExceeded {
                                attempts: attempts[i],
                            });
                        }
                        attempts[i] += 1;
                        debug!(
                            chunk_index,
                            item = ?inputs[i],
                            attempt = attempts[i],
                            "retrying chunk after processing failure"
                        );
                        if let Some(delay) = delay {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }
                    Verdict::Abort => {
                        return Err(ChunkflowError::Aborted { source: err });
                    }
                }
            }

            // Every surviving item processed; hand the chunk to the writer.
            self.transition(ChunkState::Writing)?;
            let chunk_skips = skipped.iter().filter(|s| **s).count();

            if outputs.is_empty() {
                // Whole chunk skipped away; nothing to write but the commit
                // interval still closes.
                self.commit_chunk(run_id, chunk_index, processor, 0).await?;
                return Ok(ChunkOutcome {
                    chunk_index,
                    written: 0,
                    skipped: chunk_skips,
                    rollbacks,
                });
            }

            match writer.write(&outputs).await {
                Ok(()) => {
                    self.commit_chunk(run_id, chunk_index, processor, outputs.len()).await?;
                    return Ok(ChunkOutcome {
                        chunk_index,
                        written: outputs.len(),
                        skipped: chunk_skips,
                        rollbacks,
                    });
                }
                Err(err) => {
                    self.transition(ChunkState::Committing)?;
                    self.rollback_chunk(run_id, chunk_index, processor, &err).await?;
                    rollbacks += 1;

                    let context = FailureContext {
                        chunk_index,
                        attempt_number: write_attempts,
                        max_attempts: self.config.retry_limit,
                        phase: FailurePhase::Writing,
                    };
                    match self.decide(None, &err, &context) {
                        Verdict::Skip => {
                            // Scan mode: isolate the culprit by writing the
                            // surviving items one at a time.
                            return self
                                .scan_chunk(
                                    run_id,
                                    chunk_index,
                                    &inputs,
                                    &mut skipped,
                                    &mut attempts,
                                    rollbacks,
                                    processor,
                                    writer,
                                )
                                .await;
                        }
                        Verdict::Retry { delay } => {
                            if write_attempts >= self.config.retry_limit {
                                return Err(ChunkflowError::RetryLimitExceeded {
                                    attempts: write_attempts,
                                });
                            }
                            write_attempts += 1;
                            debug!(
                                chunk_index,
                                attempt = write_attempts,
                                "retrying chunk after write failure"
                            );
                            if let Some(delay) = delay {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                        Verdict::Abort => {
                            return Err(ChunkflowError::Aborted { source: err });
                        }
                    }
                }
            }
        }
    }

    /// Single-item scan after a skip verdict on a write failure: each
    /// surviving item gets its own process/write/commit interval, so a
    /// failing write excludes only the item that caused it.
    #[allow(clippy::too_many_arguments)]
    async fn scan_chunk<P, W>(
        &mut self,
        run_id: Uuid,
        chunk_index: u64,
        inputs: &[T],
        skipped: &mut [bool],
        attempts: &mut [u32],
        mut rollbacks: u32,
        processor: &mut P,
        writer: &mut W,
    ) -> Result<ChunkOutcome>
    where
        P: ItemProcessor<T>,
        W: ItemWriter<T>,
    {
        debug!(chunk_index, "entering single-item scan");
        let mut written: usize = 0;

        for i in 0..inputs.len() {
            if skipped[i] {
                continue;
            }
            loop {
                self.transition(ChunkState::Processing)?;
                self.transaction.begin().await?;
                processor.on_chunk_begin();

                let (err, phase) = match processor.process(inputs[i].clone()).await {
                    Ok(out) => {
                        self.transition(ChunkState::Writing)?;
                        match writer.write(std::slice::from_ref(&out)).await {
                            Ok(()) => {
                                self.commit_chunk(run_id, chunk_index, processor, 1).await?;
                                written += 1;
                                break;
                            }
                            Err(err) => {
                                self.transition(ChunkState::Committing)?;
                                (err, FailurePhase::Writing)
                            }
                        }
                    }
                    Err(err) => (err, FailurePhase::Processing),
                };

                self.rollback_chunk(run_id, chunk_index, processor, &err).await?;
                rollbacks += 1;

                let context = FailureContext {
                    chunk_index,
                    attempt_number: attempts[i],
                    max_attempts: self.config.retry_limit,
                    phase,
                };
                match self.decide(Some(&inputs[i]), &err, &context) {
                    Verdict::Skip => {
                        self.record_skip(run_id, chunk_index, &inputs[i], &err).await?;
                        skipped[i] = true;
                        break;
                    }
                    Verdict::Retry { delay } => {
                        if attempts[i] >= self.config.retry_limit {
                            return Err(ChunkflowError::RetryLimitExceeded {
                                attempts: attempts[i],
                            });
                        }
                        attempts[i] += 1;
                        if let Some(delay) = delay {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Verdict::Abort => {
                        return Err(ChunkflowError::Aborted { source: err });
                    }
                }
            }
        }

        Ok(ChunkOutcome {
            chunk_index,
            written,
            skipped: skipped.iter().filter(|s| **s).count(),
            rollbacks,
        })
    }

    /// Fatal errors abort unconditionally; everything else goes through the
    /// classifier.
    fn decide(&self, item: Option<&T>, error: &ItemError, context: &FailureContext) -> Verdict {
        if error.is_fatal() {
            return Verdict::Abort;
        }
        let verdict = self.classifier.classify(item, error, context);
        debug!(
            classifier = self.classifier.classifier_name(),
            phase = %context.phase,
            attempt = context.attempt_number,
            ?verdict,
            "failure classified"
        );
        verdict
    }

    /// Close the commit interval successfully: commit the transaction and
    /// notify the processor so staged state materializes.
    async fn commit_chunk<P>(
        &mut self,
        run_id: Uuid,
        chunk_index: u64,
        processor: &mut P,
        written: usize,
    ) -> Result<()>
    where
        P: ItemProcessor<T>,
    {
        self.transition(ChunkState::Committing)?;
        self.transaction.commit().await?;
        processor.on_chunk_commit();
        self.transition(ChunkState::Committed)?;
        debug!(chunk_index, written, "chunk committed");
        self.publisher
            .publish(BatchEvent::ChunkCommitted {
                run_id,
                chunk_index,
                written,
            })
            .await;
        Ok(())
    }

    /// Discard all chunk-scoped mutations after a failure.
    async fn rollback_chunk<P>(
        &mut self,
        run_id: Uuid,
        chunk_index: u64,
        processor: &mut P,
        cause: &ItemError,
    ) -> Result<()>
    where
        P: ItemProcessor<T>,
    {
        processor.on_chunk_rollback();
        self.transaction.rollback().await?;
        self.transition(ChunkState::RolledBack)?;
        debug!(chunk_index, %cause, "chunk rolled back");
        self.publisher
            .publish(BatchEvent::ChunkRolledBack {
                run_id,
                chunk_index,
                reason: cause.to_string(),
            })
            .await;
        Ok(())
    }

    /// Count and log a skipped item. Verdicts are never silently swallowed:
    /// every skip is logged with the item identity and cause, and the run
    /// aborts if a configured skip limit is exceeded.
    async fn record_skip(
        &mut self,
        run_id: Uuid,
        chunk_index: u64,
        item: &T,
        cause: &ItemError,
    ) -> Result<()> {
        if let Some(limit) = self.config.skip_limit {
            if self.skip_count >= limit {
                return Err(ChunkflowError::SkipLimitExceeded { limit });
            }
        }
        self.skip_count += 1;
        warn!(
            chunk_index,
            item = ?item,
            cause = %cause,
            skip_count = self.skip_count,
            "item skipped"
        );
        self.publisher
            .publish(BatchEvent::ItemSkipped {
                run_id,
                chunk_index,
                item: format!("{item:?}"),
                cause: cause.to_string(),
            })
            .await;
        Ok(())
    }

    /// Park the state machine in `Aborted` and propagate the failure.
    async fn fail_run(&mut self, run_id: Uuid, err: ChunkflowError) -> ChunkflowError {
        let _ = self.transition(ChunkState::Aborted);
        error!(%run_id, error = %err, "run aborted");
        self.publisher
            .publish(BatchEvent::RunAborted {
                run_id,
                cause: err.to_string(),
            })
            .await;
        err
    }

    /// Validated state transition.
    fn transition(&mut self, target: ChunkState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(ChunkflowError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        debug!(from = %self.state, to = %target, "state transition");
        self.state = target;
        Ok(())
    }
}
