use serde::{Deserialize, Serialize};
use std::fmt;

/// Chunk run state definitions.
///
/// The orchestrator loops `Idle → Reading → Processing → Writing →
/// Committing → {Committed, RolledBack} → Idle` until the source is
/// exhausted. `Aborted` is terminal and reachable from any non-terminal
/// state. `RolledBack` re-enters `Processing` when the chunk is
/// re-attempted (retry, skip re-process, or single-item scan), and
/// `Committed` re-enters `Processing` between the sub-intervals of a
/// single-item scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    /// Between commit intervals; no chunk is open.
    Idle,
    /// Pulling items from the source up to the chunk size.
    Reading,
    /// Passing chunk items through the processor.
    Processing,
    /// Handing the surviving chunk to the writer.
    Writing,
    /// Deciding the fate of the chunk transaction.
    Committing,
    /// The chunk transaction durably succeeded.
    Committed,
    /// The chunk transaction was discarded.
    RolledBack,
    /// The run terminated on a fatal or unclassifiable failure.
    Aborted,
}

impl ChunkState {
    /// Check if this is a terminal state (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Check if a chunk is currently open in this state.
    pub fn is_chunk_open(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Writing | Self::Committing | Self::RolledBack
        )
    }

    /// Whether a direct transition to `target` is legal.
    pub fn can_transition_to(&self, target: ChunkState) -> bool {
        if target == Self::Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Self::Idle, Self::Reading)
                | (Self::Reading, Self::Processing)
                | (Self::Reading, Self::Idle)
                | (Self::Processing, Self::Writing)
                | (Self::Processing, Self::RolledBack)
                | (Self::Writing, Self::Committing)
                | (Self::Committing, Self::Committed)
                | (Self::Committing, Self::RolledBack)
                | (Self::Committed, Self::Idle)
                | (Self::Committed, Self::Processing)
                | (Self::RolledBack, Self::Processing)
                | (Self::RolledBack, Self::Idle)
        )
    }
}

impl Default for ChunkState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reading => write!(f, "reading"),
            Self::Processing => write!(f, "processing"),
            Self::Writing => write!(f, "writing"),
            Self::Committing => write!(f, "committing"),
            Self::Committed => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

impl std::str::FromStr for ChunkState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "reading" => Ok(Self::Reading),
            "processing" => Ok(Self::Processing),
            "writing" => Ok(Self::Writing),
            "committing" => Ok(Self::Committing),
            "committed" => Ok(Self::Committed),
            "rolled_back" => Ok(Self::RolledBack),
            "aborted" => Ok(Self::Aborted),
            _ => Err(format!("Invalid chunk state: {s}")),
        }
    }
}
