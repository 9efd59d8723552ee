use crate::document::DocumentKind;
use crate::version::{VersionError, VersionTriplet};

/// Why a single `<...>` line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("line does not start with '<'")]
    MissingOpen,
    #[error("line does not end with '>'")]
    MissingClose,
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' is not an integer: '{value}'")]
    NotAnInteger { field: &'static str, value: String },
    #[error("'{0}' is out of range")]
    OutOfRange(&'static str),
    #[error("invalid colour '{0}'")]
    InvalidColor(String),
    #[error("{0}")]
    Grammar(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("not a Qucs {expected} document")]
    FormatMismatch { expected: DocumentKind },

    #[error("document version {declared} is newer than the supported version {running}")]
    VersionTooNew {
        declared: VersionTriplet,
        running: VersionTriplet,
    },

    #[error(transparent)]
    MalformedVersion(#[from] VersionError),

    #[error("line {line}: {reason}: {content}")]
    MalformedLine {
        line: usize,
        content: String,
        reason: LineError,
    },

    #[error("section <{name}> is never closed")]
    UnterminatedSection { name: String },

    #[error("section <{name}> not found")]
    SectionNotFound { name: String },

    #[error("component '{name}' not found in library")]
    ComponentNotFound { name: String },
}

impl FormatError {
    pub(crate) fn malformed_line(line: usize, content: &str, reason: LineError) -> Self {
        FormatError::MalformedLine {
            line,
            content: content.to_string(),
            reason,
        }
    }
}
