//! Error types for bloomwatch.
//!
//! All errors are strongly typed using thiserror. Nothing in the core is
//! allowed to escape `evaluate`/`publish`/`get` as an error: fetch and
//! normalization failures degrade to empty results and are surfaced as
//! diagnostics only. The types here exist for the boundaries that *do*
//! return `Result` (typed constructors, source fetchers, the scheduler).

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Validation errors raised by typed constructors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid weather window: started_at ({started_at}) must be before expected_end_at ({expected_end_at})")]
    InvalidWeatherWindow {
        started_at: DateTime<Utc>,
        expected_end_at: DateTime<Utc>,
    },

    #[error("Invalid stage progress: complete ({complete}) exceeds total ({total})")]
    InvalidStageProgress { complete: u32, total: u32 },

    #[error("Stage progress total must be positive")]
    ZeroProgressTotal,

    #[error("Plant name cannot be empty")]
    EmptyPlantName,
}

/// Errors raised at the inventory-source boundary.
///
/// Fetchers are contract-bound to catch their own failures and return
/// `Ok(None)`; these variants exist for implementations that cannot, so the
/// reconciler can log and fall through the priority chain.
#[derive(Debug)]
pub enum SourceError {
    Unavailable { source: String, reason: String },

    MalformedPayload { source: String, reason: String },
}

// Manual impls instead of `#[derive(Error)]`: thiserror would treat the
// `source` field (a source *name*, not a cause) as the error source.
impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { source, reason } => {
                write!(f, "Source '{source}' is unavailable: {reason}")
            }
            Self::MalformedPayload { source, reason } => {
                write!(f, "Source '{source}' returned a malformed payload: {reason}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Errors raised by the pass scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Engine worker thread is no longer running")]
    Disconnected,

    #[error("Trigger queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

/// Top-level error type for bloomwatch.
#[derive(Debug, Error)]
pub enum BloomError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BloomError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a source error.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Returns true if this error is recoverable by falling through the
    /// source priority chain.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

/// Result type alias for bloomwatch operations.
pub type BloomResult<T> = Result<T, BloomError>;
