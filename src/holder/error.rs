//! Errors raised by state holders and their builder.

use thiserror::Error;

use super::config::ConfigError;

/// Errors returned when interacting with a running holder.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HolderError {
    /// The owning scope was cancelled or the pipeline ended; the action
    /// was not accepted.
    #[error("State holder stopped; action not accepted")]
    Stopped,

    /// The action buffer is at capacity under the `Reject` overflow policy.
    #[error("Action buffer full (capacity {capacity})")]
    BufferFull { capacity: usize },

    /// A user-supplied transform, mutation or mapper panicked.
    #[error("State pipeline failed: {0}")]
    PipelineFailed(String),
}

/// Errors that can occur when building a state holder.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Transform not specified. Call .transform(f) before .build()")]
    MissingTransform,

    #[error("Invalid holder configuration: {}", format_violations(.0))]
    InvalidConfig(Vec<ConfigError>),
}

fn format_violations(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
