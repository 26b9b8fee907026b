//! Configuration for board services.

use crate::board::{domain::BlobPath, ports::RecordKey};
use chrono::TimeDelta;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BOARD_KEY: &str = "kanban/board";
const DEFAULT_LABEL_VOCABULARY_KEY: &str = "kanban/labels";
const DEFAULT_ATTACHMENT_PREFIX: &str = "attachments";
const DEFAULT_DUE_WINDOW_HOURS: i64 = 24;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 10;
const DEFAULT_MAX_BACKOFF_MS: u64 = 250;
const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Errors reported by configuration validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Retry settings would never attempt a write.
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    /// The initial backoff exceeds the backoff cap.
    #[error("retry.initial_backoff ({initial:?}) exceeds retry.max_backoff ({max:?})")]
    BackoffOrder {
        /// Configured initial backoff.
        initial: Duration,
        /// Configured cap.
        max: Duration,
    },

    /// The default due window is zero or negative.
    #[error("default_due_window must be positive")]
    NonPositiveDueWindow,

    /// The attachment prefix is not a valid relative blob path.
    #[error("attachment_prefix '{0}' is not a valid storage path")]
    InvalidAttachmentPrefix(String),
}

/// Retry policy for optimistic board transactions.
///
/// A transaction that loses a version race re-reads the board and tries
/// again, sleeping with exponential backoff between attempts.
///
/// # Examples
///
/// ```
/// use boardsync::board::services::ConflictRetryConfig;
///
/// let config = ConflictRetryConfig::default();
/// assert_eq!(config.max_attempts, 5);
///
/// let once = ConflictRetryConfig::single_attempt();
/// assert_eq!(once.max_attempts, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: u32,
}

impl Default for ConflictRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl ConflictRetryConfig {
    /// Never retries; a lost race is reported immediately.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retries longer, for boards with many concurrent editors.
    #[must_use]
    pub const fn patient() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2,
        }
    }

    /// Returns the delay to wait after failed attempt number `attempt`
    /// (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.backoff_multiplier.max(1).saturating_pow(exponent);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Checks the policy for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero attempts or an initial backoff above
    /// the cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::BackoffOrder {
                initial: self.initial_backoff,
                max: self.max_backoff,
            });
        }
        Ok(())
    }
}

/// Settings shared by the board services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Store key of the board record.
    pub board_key: RecordKey,
    /// Store key of the board-wide label vocabulary record.
    pub label_vocabulary_key: RecordKey,
    /// Length of the due window given to tasks created without one.
    pub default_due_window: TimeDelta,
    /// Storage path prefix for uploaded attachments.
    pub attachment_prefix: String,
    /// Conflict retry policy.
    pub retry: ConflictRetryConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            board_key: RecordKey::new(DEFAULT_BOARD_KEY),
            label_vocabulary_key: RecordKey::new(DEFAULT_LABEL_VOCABULARY_KEY),
            default_due_window: TimeDelta::hours(DEFAULT_DUE_WINDOW_HOURS),
            attachment_prefix: DEFAULT_ATTACHMENT_PREFIX.to_owned(),
            retry: ConflictRetryConfig::default(),
        }
    }
}

impl BoardConfig {
    /// Sets the board record key.
    #[must_use]
    pub fn with_board_key(mut self, key: RecordKey) -> Self {
        self.board_key = key;
        self
    }

    /// Sets the label vocabulary record key.
    #[must_use]
    pub fn with_label_vocabulary_key(mut self, key: RecordKey) -> Self {
        self.label_vocabulary_key = key;
        self
    }

    /// Sets the conflict retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: ConflictRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        if self.default_due_window <= TimeDelta::zero() {
            return Err(ConfigError::NonPositiveDueWindow);
        }
        BlobPath::new(self.attachment_prefix.clone())
            .map_err(|_| ConfigError::InvalidAttachmentPrefix(self.attachment_prefix.clone()))?;
        Ok(())
    }
}
