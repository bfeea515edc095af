use crate::error::{ChunkflowError, Result};

/// Configuration for the chunk orchestrator.
///
/// Chunk size and retry bounds are deliberately configurable rather than
/// fixed constants; defaults match common batch-processing practice.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum number of items accumulated per chunk between commit points.
    pub chunk_size: usize,
    /// Maximum number of attempts per item before a retry verdict escalates
    /// to an abort.
    pub retry_limit: u32,
    /// Optional cap on skipped items per run. Exceeding it aborts the run.
    pub skip_limit: Option<u32>,
    /// Capacity of the lifecycle event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            retry_limit: 3,
            skip_limit: None,
            event_channel_capacity: 1024,
        }
    }
}

impl ChunkConfig {
    /// Load configuration from `CHUNKFLOW_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(chunk_size) = std::env::var("CHUNKFLOW_CHUNK_SIZE") {
            config.chunk_size = chunk_size.parse().map_err(|e| {
                ChunkflowError::Configuration(format!("Invalid chunk_size: {e}"))
            })?;
        }

        if let Ok(retry_limit) = std::env::var("CHUNKFLOW_RETRY_LIMIT") {
            config.retry_limit = retry_limit.parse().map_err(|e| {
                ChunkflowError::Configuration(format!("Invalid retry_limit: {e}"))
            })?;
        }

        if let Ok(skip_limit) = std::env::var("CHUNKFLOW_SKIP_LIMIT") {
            config.skip_limit = Some(skip_limit.parse().map_err(|e| {
                ChunkflowError::Configuration(format!("Invalid skip_limit: {e}"))
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that the orchestrator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkflowError::Configuration(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ChunkflowError::Configuration(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
