// SPDX-FileCopyrightText: 2026 Chronobot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Chronobot.

use strum::Display;
use thiserror::Error;

/// How a remote platform failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlatformErrorKind {
    /// Rate limiting, timeouts, network hiccups. Worth retrying.
    Transient,
    /// Chat not found, bot blocked, rejected request. Retrying will not help.
    Permanent,
    /// The adapter could not tell.
    Unclassified,
}

/// Coarse error category used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Transient,
    Permanent,
    Malformed,
    Storage,
    Unknown,
}

/// The primary error type used across all Chronobot crates.
#[derive(Debug, Error)]
pub enum ChronobotError {
    /// Configuration errors (missing credential, invalid schedule, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote chat platform errors, classified by the adapter.
    #[error("platform error ({kind}): {message}")]
    Platform {
        kind: PlatformErrorKind,
        message: String,
    },

    /// User-supplied command arguments that could not be parsed.
    #[error("malformed input: {usage}")]
    MalformedInput { usage: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChronobotError {
    /// Shorthand for a platform error of the given kind.
    pub fn platform(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self::Platform {
            kind,
            message: message.into(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Platform { kind, .. } => match kind {
                PlatformErrorKind::Transient => ErrorCategory::Transient,
                PlatformErrorKind::Permanent => ErrorCategory::Permanent,
                PlatformErrorKind::Unclassified => ErrorCategory::Unknown,
            },
            Self::MalformedInput { .. } => ErrorCategory::Malformed,
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Config(_) | Self::Internal(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether a caller with its own retry policy should try again.
    ///
    /// Unclassified platform failures are retried as well; only errors known
    /// to be permanent are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Platform {
                kind: PlatformErrorKind::Transient | PlatformErrorKind::Unclassified,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_errors_map_to_categories() {
        let transient = ChronobotError::platform(PlatformErrorKind::Transient, "retry after 3s");
        let permanent = ChronobotError::platform(PlatformErrorKind::Permanent, "chat not found");
        let unknown = ChronobotError::platform(PlatformErrorKind::Unclassified, "io");

        assert_eq!(transient.category(), ErrorCategory::Transient);
        assert_eq!(permanent.category(), ErrorCategory::Permanent);
        assert_eq!(unknown.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn only_permanent_platform_errors_are_not_retryable() {
        assert!(ChronobotError::platform(PlatformErrorKind::Transient, "x").is_retryable());
        assert!(ChronobotError::platform(PlatformErrorKind::Unclassified, "x").is_retryable());
        assert!(!ChronobotError::platform(PlatformErrorKind::Permanent, "x").is_retryable());
        assert!(!ChronobotError::Internal("x".into()).is_retryable());
        assert!(!ChronobotError::storage(std::io::Error::other("disk")).is_retryable());
    }

    #[test]
    fn display_includes_kind() {
        let err = ChronobotError::platform(PlatformErrorKind::Permanent, "Forbidden: bot was blocked");
        assert_eq!(
            err.to_string(),
            "platform error (permanent): Forbidden: bot was blocked"
        );
    }

    #[test]
    fn malformed_input_is_categorised() {
        let err = ChronobotError::MalformedInput {
            usage: "Usage: /remove_chat <chat_id>".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Malformed);
        assert!(err.to_string().contains("/remove_chat"));
    }
}
