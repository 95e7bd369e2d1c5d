//! Unified error handling for slircd-operserv.
//!
//! Matching itself never fails. Errors only arise when rules are built,
//! added or removed, or when enforcers are registered.

use crate::xline::XLineKind;
use thiserror::Error;

// ============================================================================
// X-line Errors (rule construction and rule set management)
// ============================================================================

/// Errors that can occur while building or managing X-lines.
#[derive(Debug, Error)]
pub enum XLineError {
    #[error("mask must not be empty")]
    EmptyMask,

    #[error("invalid regex in mask {mask}: {source}")]
    InvalidRegex {
        mask: String,
        #[source]
        source: regex::Error,
    },

    #[error("{mask} already exists")]
    AlreadyExists { mask: String },

    #[error("{mask} is already covered by {by}")]
    AlreadyCovered { mask: String, by: String },

    #[error("no {kind} found for {mask}")]
    NotFound { kind: XLineKind, mask: String },

    #[error("no manager registered for {0}")]
    NoManager(XLineKind),

    #[error("a manager for {0} is already registered")]
    DuplicateManager(XLineKind),
}

impl XLineError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMask => "empty_mask",
            Self::InvalidRegex { .. } => "invalid_regex",
            Self::AlreadyExists { .. } => "already_exists",
            Self::AlreadyCovered { .. } => "already_covered",
            Self::NotFound { .. } => "not_found",
            Self::NoManager(_) => "no_manager",
            Self::DuplicateManager(_) => "duplicate_manager",
        }
    }
}

/// Result type for X-line management operations.
pub type XLineResult<T> = Result<T, XLineError>;

// ConfigError and ValidationError live in config/types.rs and
// config/validation.rs, next to the types they describe.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(XLineError::EmptyMask.error_code(), "empty_mask");
        assert_eq!(
            XLineError::NoManager(XLineKind::Qline).error_code(),
            "no_manager"
        );
    }

    #[test]
    fn test_error_display() {
        let err = XLineError::AlreadyCovered {
            mask: "*@node1.evil.example".into(),
            by: "*@*.evil.example".into(),
        };
        assert_eq!(
            err.to_string(),
            "*@node1.evil.example is already covered by *@*.evil.example"
        );

        let err = XLineError::NotFound {
            kind: XLineKind::Nline,
            mask: "*bot*".into(),
        };
        assert_eq!(err.to_string(), "no SNLINE found for *bot*");
    }
}
