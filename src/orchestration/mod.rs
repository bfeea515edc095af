//! # Orchestration Engine
//!
//! The chunk-oriented execution core: a state-machine driver that pulls
//! items from a source, processes them, buffers them into bounded chunks,
//! and commits each chunk as one transactional unit.
//!
//! ## Core Components
//!
//! - [`ChunkOrchestrator`]: drives the read/process/write/commit loop and is
//!   the sole consumer of failure-classifier verdicts
//! - [`ChunkState`]: the per-interval state machine with validated
//!   transitions
//! - [`RunSummary`] / [`ChunkOutcome`]: observable results of a run

pub mod orchestrator;
pub mod states;
pub mod types;

pub use orchestrator::ChunkOrchestrator;
pub use states::ChunkState;
pub use types::{ChunkOutcome, RunSummary};
