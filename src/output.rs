//! JSON output types for CLI responses.
//!
//! Every response starts with `status` and `schema_version`. Errors use
//! [`ErrorResponse`] and carry the numeric code that is also the process
//! exit code.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{FinderError, OutputErrorCode};
use crate::matches::{Match, Matches};
use crate::value::Value;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

/// Error details in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the exit code.
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &FinderError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            FinderError::MalformedPattern { pattern, .. } => {
                Some(serde_json::json!({ "pattern": pattern }))
            }
            FinderError::DangerousFormat { spec, .. } => Some(serde_json::json!({ "spec": spec })),
            FinderError::GroupNotFound { key } => Some(serde_json::json!({ "key": key })),
            FinderError::ParseValue { group, value, .. } => {
                Some(serde_json::json!({ "group": group, "value": value }))
            }
            FinderError::InvalidFix { group, .. } => Some(serde_json::json!({ "group": group })),
            FinderError::NotAllFixed { groups } => Some(serde_json::json!({ "groups": groups })),
            FinderError::NoMatch { filename } => Some(serde_json::json!({ "filename": filename })),
            FinderError::Walk(e) => e
                .path()
                .map(|p| serde_json::json!({ "path": p.display().to_string() })),
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Response for any failed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(err: &FinderError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Matches
// ============================================================================

/// One group match of a filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    pub index: usize,
    pub group: String,
    pub raw: String,
    pub start: usize,
    pub end: usize,
    /// Parsed value; absent when not requested or unparsable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl MatchInfo {
    pub fn from_match(m: &Match, parse: bool) -> Self {
        let value = if parse {
            m.value().ok().map(|v| value_to_json(&v))
        } else {
            None
        };
        MatchInfo {
            index: m.index(),
            group: m.group().name().to_string(),
            raw: m.raw().to_string(),
            start: m.start(),
            end: m.end(),
            value,
        }
    }

    /// Every match of a filename, in group order. Discarded groups are included.
    pub fn from_matches(matches: &Matches, parse: bool) -> Vec<Self> {
        matches
            .iter()
            .map(|m| MatchInfo::from_match(m, parse))
            .collect()
    }
}

/// JSON rendering of a parsed value. Dates use `YYYY-MM-DD HH:MM:SS`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(v) => serde_json::json!(v),
        Value::Float(v) => serde_json::json!(v),
        Value::Str(s) => serde_json::json!(s),
        Value::Bool(b) => serde_json::json!(b),
        Value::Date(_) => serde_json::json!(value.to_string()),
    }
}

// ============================================================================
// Command Responses
// ============================================================================

/// Response for `ff regex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexResponse {
    pub status: String,
    pub schema_version: String,
    pub pattern: String,
    pub regex: String,
}

/// A file found by `ff find`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub matches: Vec<MatchInfo>,
}

/// Response for `ff find`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse {
    pub status: String,
    pub schema_version: String,
    pub root: String,
    pub pattern: String,
    pub count: usize,
    pub files: Vec<FileEntry>,
}

/// Response for `ff make`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeResponse {
    pub status: String,
    pub schema_version: String,
    pub filename: String,
}

/// Response for `ff parse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResponse {
    pub status: String,
    pub schema_version: String,
    pub filename: String,
    pub matches: Vec<MatchInfo>,
    /// Date assembled from the date elements, if there are any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
