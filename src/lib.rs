#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Chunkflow
//!
//! Chunk-oriented item-processing pipeline with pluggable failure
//! classification and transactional commit semantics.
//!
//! ## Overview
//!
//! Items flow from an [`ItemSource`] through an [`ItemProcessor`] into a
//! bounded chunk, which an [`ItemWriter`] persists atomically. Each chunk is
//! one transactional unit: its buffered mutations become durable only when
//! the chunk commits and vanish entirely when it rolls back. Failures raised
//! while processing or writing are routed through a [`FailureClassifier`]
//! that decides, per item and error kind, whether to skip the item, retry it
//! within a bound, or abort the run.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - chunk state machine and run driver
//! - [`item`] - source, processor, and writer contracts
//! - [`classifier`] - skip/retry/abort failure classification
//! - [`transaction`] - transaction boundary and commit overlay
//! - [`events`] - run lifecycle event publishing
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//! - [`testing`] - failure-injecting test doubles
//!
//! ## Quick Start
//!
//! ```rust
//! use chunkflow::{ChunkConfig, ChunkOrchestrator, PassthroughProcessor, VecSource};
//! use chunkflow::testing::RecordingWriter;
//!
//! # tokio_test::block_on(async {
//! let config = ChunkConfig { chunk_size: 2, ..ChunkConfig::default() };
//! let mut orchestrator = ChunkOrchestrator::new(config);
//!
//! let mut source = VecSource::new(vec!["a", "b", "c"]);
//! let mut processor = PassthroughProcessor;
//! let mut writer = RecordingWriter::new();
//!
//! let summary = orchestrator.run(&mut source, &mut processor, &mut writer).await.unwrap();
//! assert_eq!(summary.items_written, 3);
//! assert_eq!(summary.chunks_committed, 2);
//! # });
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod item;
pub mod logging;
pub mod orchestration;
pub mod testing;
pub mod transaction;

pub use classifier::{
    DefaultVerdict, FailureClassifier, FailureClassifierConfig, FailureContext, FailurePhase,
    StandardFailureClassifier, Verdict,
};
pub use config::ChunkConfig;
pub use error::{ChunkflowError, ItemError, Result};
pub use events::{BatchEvent, EventPublisher, PublishedEvent};
pub use item::{ItemProcessor, ItemSource, ItemWriter, PassthroughProcessor, VecSource};
pub use orchestration::{ChunkOrchestrator, ChunkOutcome, ChunkState, RunSummary};
pub use transaction::{InMemoryTransaction, TransactionBoundary, TransactionalBuffer};
