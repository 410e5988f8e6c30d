//! Holder configuration: sharing policy and action buffering.
//!
//! Configuration is plain serde data so it can be embedded in an
//! application's own config file. Validation uses Stillwater's `Validation`
//! to report every problem at once instead of stopping at the first.
//!
//! # Example
//!
//! ```rust
//! use mutator::holder::{HolderConfig, OverflowPolicy, SharingStarted};
//! use std::time::Duration;
//!
//! let config = HolderConfig::default()
//!     .with_started(SharingStarted::while_subscribed_for(Duration::from_millis(250)))
//!     .with_action_capacity(16)
//!     .with_overflow(OverflowPolicy::Reject);
//!
//! assert!(config.validate().is_success());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Stop timeout used by [`SharingStarted::while_subscribed`].
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;

/// Default cap on actions waiting for the pipeline to connect.
pub const DEFAULT_ACTION_CAPACITY: usize = 64;

const MAX_ACTION_CAPACITY: usize = 65_536;
const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// When the upstream mutation pipeline runs relative to state observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SharingStarted {
    /// Start immediately and run until the owning scope ends.
    Eagerly,

    /// Start on the first observer and run until the owning scope ends.
    Lazily,

    /// Run while observed. After the last observer leaves, stop once
    /// `stop_timeout_ms` has passed without a new one. A later observer
    /// restarts the pipeline from the initial state.
    WhileSubscribed {
        #[serde(default = "default_stop_timeout_ms")]
        stop_timeout_ms: u64,

        /// After stopping, reset the cached value to the initial state
        /// once this much time passes unobserved. `None` keeps it forever.
        #[serde(default)]
        replay_expiration_ms: Option<u64>,
    },
}

fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

impl SharingStarted {
    /// Stop 5 seconds after the last observer leaves.
    pub fn while_subscribed() -> Self {
        Self::while_subscribed_for(Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS))
    }

    /// Stop `stop_timeout` after the last observer leaves.
    pub fn while_subscribed_for(stop_timeout: Duration) -> Self {
        Self::WhileSubscribed {
            stop_timeout_ms: stop_timeout.as_millis() as u64,
            replay_expiration_ms: None,
        }
    }

    /// Stop as soon as the last observer leaves.
    pub fn while_subscribed_immediately() -> Self {
        Self::while_subscribed_for(Duration::ZERO)
    }

    /// Set the replay expiration of a `WhileSubscribed` policy. Other
    /// policies never stop, so they are returned unchanged.
    pub fn with_replay_expiration(self, expiration: Duration) -> Self {
        match self {
            Self::WhileSubscribed {
                stop_timeout_ms, ..
            } => Self::WhileSubscribed {
                stop_timeout_ms,
                replay_expiration_ms: Some(expiration.as_millis() as u64),
            },
            other => other,
        }
    }

    /// Grace period before stopping, if this policy ever stops.
    pub fn stop_timeout(&self) -> Option<Duration> {
        match self {
            Self::WhileSubscribed {
                stop_timeout_ms, ..
            } => Some(Duration::from_millis(*stop_timeout_ms)),
            _ => None,
        }
    }

    /// How long a stopped holder keeps its last value.
    pub fn replay_expiration(&self) -> Option<Duration> {
        match self {
            Self::WhileSubscribed {
                replay_expiration_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// Whether the pipeline waits for an observer before starting.
    pub fn waits_for_subscriber(&self) -> bool {
        !matches!(self, Self::Eagerly)
    }
}

impl Default for SharingStarted {
    fn default() -> Self {
        Self::while_subscribed()
    }
}

/// What happens when an action arrives at a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest buffered action and keep the new one.
    #[default]
    DropOldest,

    /// Refuse the new action with `HolderError::BufferFull`.
    Reject,
}

/// Configuration for a state holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolderConfig {
    pub started: SharingStarted,
    /// Cap on the pending buffer. Connected delivery is never capped.
    pub action_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for HolderConfig {
    fn default() -> Self {
        Self {
            started: SharingStarted::default(),
            action_capacity: DEFAULT_ACTION_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// A single configuration problem.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Action capacity must be at least 1")]
    ZeroCapacity,

    #[error("Action capacity {capacity} exceeds maximum {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("Stop timeout {timeout_ms}ms exceeds maximum {max_ms}ms")]
    StopTimeoutTooLong { timeout_ms: u64, max_ms: u64 },

    #[error("Replay expiration {expiration_ms}ms exceeds maximum {max_ms}ms")]
    ReplayExpirationTooLong { expiration_ms: u64, max_ms: u64 },
}

impl HolderConfig {
    pub fn with_started(mut self, started: SharingStarted) -> Self {
        self.started = started;
        self
    }

    pub fn with_action_capacity(mut self, capacity: usize) -> Self {
        self.action_capacity = capacity;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Check every rule, accumulating ALL violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<ConfigError>>> = Vec::new();

        let capacity = self.action_capacity;
        checks.push(if capacity == 0 {
            Validation::fail(ConfigError::ZeroCapacity)
        } else if capacity > MAX_ACTION_CAPACITY {
            Validation::fail(ConfigError::CapacityTooLarge {
                capacity,
                max: MAX_ACTION_CAPACITY,
            })
        } else {
            Validation::success(())
        });

        if let SharingStarted::WhileSubscribed {
            stop_timeout_ms,
            replay_expiration_ms,
        } = self.started
        {
            if stop_timeout_ms > MAX_TIMEOUT_MS {
                checks.push(Validation::fail(ConfigError::StopTimeoutTooLong {
                    timeout_ms: stop_timeout_ms,
                    max_ms: MAX_TIMEOUT_MS,
                }));
            }
            if let Some(expiration_ms) = replay_expiration_ms.filter(|ms| *ms > MAX_TIMEOUT_MS) {
                checks.push(Validation::fail(ConfigError::ReplayExpirationTooLong {
                    expiration_ms,
                    max_ms: MAX_TIMEOUT_MS,
                }));
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Validate and collect the violations, for callers that want a `Result`.
    pub fn check(&self) -> Result<(), Vec<ConfigError>> {
        match self.validate() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_while_subscribed_five_seconds() {
        let config = HolderConfig::default();

        assert_eq!(
            config.started.stop_timeout(),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(config.action_capacity, DEFAULT_ACTION_CAPACITY);
        assert_eq!(config.overflow, OverflowPolicy::DropOldest);
        assert!(config.validate().is_success());
    }

    #[test]
    fn eager_policies_never_stop() {
        assert_eq!(SharingStarted::Eagerly.stop_timeout(), None);
        assert_eq!(SharingStarted::Lazily.stop_timeout(), None);
        assert!(!SharingStarted::Eagerly.waits_for_subscriber());
        assert!(SharingStarted::Lazily.waits_for_subscriber());
    }

    #[test]
    fn replay_expiration_only_applies_to_while_subscribed() {
        let expiring = SharingStarted::while_subscribed_immediately()
            .with_replay_expiration(Duration::from_secs(1));
        assert_eq!(expiring.replay_expiration(), Some(Duration::from_secs(1)));
        assert_eq!(expiring.stop_timeout(), Some(Duration::ZERO));

        let eager = SharingStarted::Eagerly.with_replay_expiration(Duration::from_secs(1));
        assert_eq!(eager, SharingStarted::Eagerly);
    }

    #[test]
    fn validation_accumulates_all_violations() {
        let config = HolderConfig {
            started: SharingStarted::WhileSubscribed {
                stop_timeout_ms: MAX_TIMEOUT_MS + 1,
                replay_expiration_ms: Some(MAX_TIMEOUT_MS + 1),
            },
            action_capacity: 0,
            overflow: OverflowPolicy::Reject,
        };

        match config.validate() {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| matches!(e, ConfigError::ZeroCapacity)));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ConfigError::StopTimeoutTooLong { .. })));
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ConfigError::ReplayExpirationTooLong { .. })));
            }
            Validation::Success(_) => panic!("Expected failures, got success"),
        }
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let config = HolderConfig::default().with_action_capacity(MAX_ACTION_CAPACITY + 1);
        let errors = config.check().unwrap_err();

        assert_eq!(
            errors,
            vec![ConfigError::CapacityTooLarge {
                capacity: MAX_ACTION_CAPACITY + 1,
                max: MAX_ACTION_CAPACITY,
            }]
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: HolderConfig =
            serde_json::from_str(r#"{ "started": { "mode": "while_subscribed" } }"#).unwrap();

        assert_eq!(config.started, SharingStarted::while_subscribed());
        assert_eq!(config.action_capacity, DEFAULT_ACTION_CAPACITY);
    }

    #[test]
    fn config_reads_every_field() {
        let json = r#"{
            "started": {
                "mode": "while_subscribed",
                "stop_timeout_ms": 0,
                "replay_expiration_ms": 100
            },
            "action_capacity": 8,
            "overflow": "reject"
        }"#;
        let config: HolderConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.started,
            SharingStarted::while_subscribed_immediately()
                .with_replay_expiration(Duration::from_millis(100))
        );
        assert_eq!(config.action_capacity, 8);
        assert_eq!(config.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn eager_mode_parses_from_tag() {
        let started: SharingStarted = serde_json::from_str(r#"{ "mode": "eagerly" }"#).unwrap();
        assert_eq!(started, SharingStarted::Eagerly);
    }
}
