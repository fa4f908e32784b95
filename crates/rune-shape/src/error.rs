//! Error and warning types shared by every stage of the shape pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for shape pipeline operations.
pub type Result<T> = std::result::Result<T, ShapeError>;

/// A malformed shape field. Always names the field and the offending value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid `{field}` value `{value}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Whole-input failures that abort a call.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Extraction input was empty or whitespace only.
    #[error("document is empty")]
    EmptyDocument,

    /// Extraction input parsed but has no element to walk.
    #[error("document has no root element")]
    MissingRoot,

    /// A shape list file was not valid JSON.
    #[error("shape list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A shape list file was valid JSON but not an array.
    #[error("shape list must be a JSON array, found {found}")]
    NotAnArray { found: &'static str },

    /// The viewport used for classification or extraction is unusable.
    #[error("viewport must be positive, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    /// Box layout of an extraction document failed.
    #[error("layout failed: {0}")]
    Layout(#[from] taffy::TaffyError),
}

/// Top-level error surfaced by the crate.
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A shape failed validation and was left out.
    SkippedShape,
    /// A shape repeated an id already seen in the same list.
    DuplicateId,
    /// A shape record did not match the shape-list schema.
    SchemaViolation,
    /// A structural node qualified but could not become a shape.
    SkippedNode,
    /// An interactive node carried no recognizable behavior.
    FunctionUninferred,
    /// A function binding has no generated handler.
    UnknownFunction,
}

/// A non-fatal problem collected during a call instead of being thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationWarning {
    /// Shape id, node description or record index the warning is about.
    pub subject: String,
    pub kind: WarningKind,
    pub message: String,
}

impl ClassificationWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ClassificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} [{}]: {}", self.kind, self.subject, self.message)
    }
}

/// A complete result plus the warnings collected while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<ClassificationWarning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<ClassificationWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_parts(self) -> (T, Vec<ClassificationWarning>) {
        (self.value, self.warnings)
    }
}
