//! Error types for the search-and-index engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Type mismatch on field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item already exists: {0}")]
    DuplicateItem(String),

    #[error("Index {index} is full (max {max_items} items)")]
    CapacityExceeded { index: String, max_items: usize },

    #[error("Index {index} is {state}; cannot {operation}")]
    InvalidState {
        index: String,
        state: String,
        operation: String,
    },

    #[error("Index already exists: {0}")]
    DuplicateIndex(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownField(_) => "unknown_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ItemNotFound(_) => "item_not_found",
            Self::DuplicateItem(_) => "duplicate_item",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::InvalidState { .. } => "invalid_state",
            Self::DuplicateIndex(_) => "duplicate_index",
            Self::IndexNotFound(_) => "index_not_found",
            Self::Codec(_) => "codec",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Whether the error was raised before any record was touched.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnknownField(_) | Self::TypeMismatch { .. }
        )
    }

    pub(crate) fn type_mismatch(
        field: &str,
        expected: impl std::fmt::Display,
        found: impl std::fmt::Display,
    ) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
