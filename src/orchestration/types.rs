//! Core result types shared across the orchestration loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single committed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// Zero-based creation index; chunks commit in this order.
    pub chunk_index: u64,
    /// Items durably written for this chunk.
    pub written: usize,
    /// Items skipped out of this chunk.
    pub skipped: usize,
    /// Rollbacks the chunk went through before committing.
    pub rollbacks: u32,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub items_read: usize,
    pub items_written: usize,
    /// Items skipped during this run.
    pub skip_count: u32,
    pub chunks_committed: u64,
    pub chunks_rolled_back: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub chunk_outcomes: Vec<ChunkOutcome>,
}
