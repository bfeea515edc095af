//! # Failure Classification
//!
//! Centralized decision point for failures raised while processing or writing
//! items. Given an error and its context, a [`FailureClassifier`] returns one
//! of three verdicts: skip the failing item and continue, retry the same item
//! bounded by the attempt limit, or abort the whole run. The orchestrator is
//! the sole consumer of verdicts; classifiers never act on them directly.
//!
//! [`StandardFailureClassifier`] covers the common cases: fatal errors always
//! abort, recoverable and write errors follow a configured default verdict
//! with an optional per-item skip allow-list and exponential backoff delays
//! for retries.

use std::time::Duration;

use crate::error::ItemError;

/// Decision returned by a failure classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Exclude the failing item from its chunk and continue the run.
    Skip,
    /// Re-attempt the same item, optionally after a delay.
    Retry { delay: Option<Duration> },
    /// Terminate the run, propagating the triggering error.
    Abort,
}

/// Pipeline phase in which the failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Processing,
    Writing,
}

impl std::fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Writing => write!(f, "writing"),
        }
    }
}

/// Context information for failure classification.
#[derive(Debug, Clone)]
pub struct FailureContext {
    /// Index of the chunk in which the failure occurred.
    pub chunk_index: u64,
    /// Current attempt number for the failing item or write (1-based).
    pub attempt_number: u32,
    /// Maximum allowed attempts.
    pub max_attempts: u32,
    /// Whether the failure came from processing or writing.
    pub phase: FailurePhase,
}

/// Trait for failure classification strategies.
///
/// Classification must be deterministic for identical (item, error-kind)
/// pairs within a run.
pub trait FailureClassifier<T>: Send + Sync {
    fn classify(&self, item: Option<&T>, error: &ItemError, context: &FailureContext) -> Verdict;

    /// Classifier name for log identification.
    fn classifier_name(&self) -> &'static str {
        "custom"
    }
}

/// Default verdict applied to recoverable failures not covered by the skip
/// allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultVerdict {
    #[default]
    Skip,
    Retry,
}

/// Configuration for [`StandardFailureClassifier`].
#[derive(Debug, Clone)]
pub struct FailureClassifierConfig<T> {
    /// Verdict for recoverable failures outside the allow-list.
    pub default_verdict: DefaultVerdict,
    /// Items always skipped on recoverable failure, regardless of the
    /// default verdict.
    pub skippable_items: Vec<T>,
    /// Base delay for exponential retry backoff.
    pub base_retry_delay: Duration,
    /// Cap applied to calculated retry delays.
    pub max_retry_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
}

impl<T> Default for FailureClassifierConfig<T> {
    fn default() -> Self {
        Self {
            default_verdict: DefaultVerdict::Skip,
            skippable_items: Vec::new(),
            base_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Standard classifier covering the fatal/recoverable/write taxonomy.
pub struct StandardFailureClassifier<T> {
    config: FailureClassifierConfig<T>,
}

impl<T> Default for StandardFailureClassifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StandardFailureClassifier<T> {
    pub fn new() -> Self {
        Self {
            config: FailureClassifierConfig::default(),
        }
    }

    pub fn with_config(config: FailureClassifierConfig<T>) -> Self {
        Self { config }
    }

    /// Calculate the backoff delay for the given attempt, capped at the
    /// configured maximum.
    fn retry_delay(&self, attempt_number: u32) -> Duration {
        let delay = self.config.base_retry_delay.mul_f64(
            self.config
                .backoff_multiplier
                .powi(attempt_number.saturating_sub(1) as i32),
        );
        delay.min(self.config.max_retry_delay)
    }
}

impl<T: PartialEq + Send + Sync> FailureClassifier<T> for StandardFailureClassifier<T> {
    fn classify(&self, item: Option<&T>, error: &ItemError, context: &FailureContext) -> Verdict {
        if error.is_fatal() {
            return Verdict::Abort;
        }

        if let Some(item) = item {
            if self.config.skippable_items.contains(item) {
                return Verdict::Skip;
            }
        }

        match self.config.default_verdict {
            DefaultVerdict::Skip => Verdict::Skip,
            DefaultVerdict::Retry => {
                if context.attempt_number < context.max_attempts {
                    Verdict::Retry {
                        delay: Some(self.retry_delay(context.attempt_number)),
                    }
                } else {
                    Verdict::Abort
                }
            }
        }
    }

    fn classifier_name(&self) -> &'static str {
        "StandardFailureClassifier"
    }
}
