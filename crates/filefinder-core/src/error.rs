//! Error types for filefinder.
//!
//! This module provides the crate-wide error type (`FinderError`) that every
//! fallible operation returns. Errors raised by the format-spec machinery
//! (`FormatError`) are bridged into it with a `From` impl.
//!
//! ## Error Kinds
//!
//! - `MalformedPattern`: unbalanced group, unknown property, bad format spec.
//!   Raised while compiling, never retried.
//! - `DangerousFormat`: a format spec whose padding cannot be stripped
//!   unambiguously.
//! - `GroupNotFound`: a selector resolved to no usable group.
//! - `ParseValue`: a matched substring could not be converted to a value.
//!
//! Zero matching files is not an error anywhere in this crate.
//!
//! ## Exit Codes
//!
//! `OutputErrorCode` maps every error onto a stable code for front ends:
//! - `2`: invalid pattern or format spec
//! - `3`: resolution errors (unknown group, no match, unusable value)
//! - `10`: internal errors (I/O, directory walk)

use std::fmt;

use thiserror::Error;

use crate::format::FormatError;

/// Convenience alias for results carrying a [`FinderError`].
pub type FinderResult<T> = Result<T, FinderError>;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes, used as process exit codes by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// The pattern or one of its format specs is invalid.
    InvalidArguments = 2,
    /// A group, a match or a value could not be resolved.
    ResolutionError = 3,
    /// I/O and directory walking failures.
    InternalError = 10,
}

impl OutputErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Error type for pattern compilation, value conversion, and scanning.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The pattern (or one of its group definitions) cannot be compiled.
    #[error("malformed pattern '{pattern}': {message}")]
    MalformedPattern { pattern: String, message: String },

    /// A format spec pads with a character that cannot be told apart from the value.
    #[error("dangerous format '{spec}': {reason}")]
    DangerousFormat { spec: String, reason: String },

    /// No (non-discarded) group corresponds to the selector.
    #[error("no group found for key '{key}'")]
    GroupNotFound { key: String },

    /// A matched string could not be parsed by its group.
    #[error("failed to parse '{value}' for group '{group}': {message}")]
    ParseValue {
        group: String,
        value: String,
        message: String,
    },

    /// A fixed value is not usable for the group.
    #[error("cannot fix group '{group}': {message}")]
    InvalidFix { group: String, message: String },

    /// Filename generation requires every group to be fixed.
    #[error("not all groups were fixed: {}", groups.join(", "))]
    NotAllFixed { groups: Vec<String> },

    /// The filename does not match the pattern.
    #[error("filename '{filename}' does not match the pattern")]
    NoMatch { filename: String },

    /// No date could be assembled from the matches.
    #[error("cannot build a date: {message}")]
    DateUnavailable { message: String },

    /// Filenames cannot be generated when literal text is raw regex.
    #[error("cannot generate a filename when text outside groups is a regex")]
    RegexMode,

    /// Error while walking the directory tree.
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&FinderError> for OutputErrorCode {
    fn from(err: &FinderError) -> Self {
        match err {
            FinderError::MalformedPattern { .. } => OutputErrorCode::InvalidArguments,
            FinderError::DangerousFormat { .. } => OutputErrorCode::InvalidArguments,
            FinderError::RegexMode => OutputErrorCode::InvalidArguments,
            FinderError::GroupNotFound { .. } => OutputErrorCode::ResolutionError,
            FinderError::ParseValue { .. } => OutputErrorCode::ResolutionError,
            FinderError::InvalidFix { .. } => OutputErrorCode::ResolutionError,
            FinderError::NotAllFixed { .. } => OutputErrorCode::ResolutionError,
            FinderError::NoMatch { .. } => OutputErrorCode::ResolutionError,
            FinderError::DateUnavailable { .. } => OutputErrorCode::ResolutionError,
            FinderError::Walk(_) => OutputErrorCode::InternalError,
            FinderError::Io(_) => OutputErrorCode::InternalError,
        }
    }
}

impl From<FinderError> for OutputErrorCode {
    fn from(err: FinderError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: FormatError -> FinderError
// ============================================================================

impl From<FormatError> for FinderError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Dangerous { spec, reason } => FinderError::DangerousFormat { spec, reason },
            FormatError::Malformed { spec, message } => FinderError::MalformedPattern {
                pattern: spec,
                message,
            },
            FormatError::UnsupportedType { spec, kind } => FinderError::MalformedPattern {
                pattern: spec,
                message: format!("unsupported format type '{}', expected one of 'sdfeE'", kind),
            },
            FormatError::Value { spec, message } => FinderError::InvalidFix {
                group: spec,
                message,
            },
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl FinderError {
    /// Create a malformed pattern error.
    pub fn malformed(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        FinderError::MalformedPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a group not found error.
    pub fn group_not_found(key: impl ToString) -> Self {
        FinderError::GroupNotFound {
            key: key.to_string(),
        }
    }

    /// Create an invalid fix error.
    pub fn invalid_fix(group: impl Into<String>, message: impl Into<String>) -> Self {
        FinderError::InvalidFix {
            group: group.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
