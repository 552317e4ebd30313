//! Item-level error taxonomy.
//!
//! Frame- and pair-level job failures are absorbed inside stages by
//! substitution and never appear here; these are the errors that terminate
//! one item. A batch is never terminated by an item error.

use std::io;

use thiserror::Error;

/// Terminal failure of one media item.
#[derive(Error, Debug)]
pub enum ItemError {
    /// External processing yielded zero usable outputs for a whole
    /// segment or item.
    #[error("External processing produced no usable output for {unit}: {message}")]
    ExternalProcess { unit: String, message: String },

    /// The input could not be decoded at all; no jobs were attempted.
    #[error("Input cannot be read: {path}: {message}")]
    InputUnreadable { path: String, message: String },

    /// Scratch storage could not be created or written.
    #[error("Storage failure during {operation}: {source}")]
    Storage {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The batch was cancelled before this item reached a terminal phase.
    #[error("Cancelled")]
    Cancelled,
}

impl ItemError {
    /// Create an external-process escalation error.
    pub fn external_process(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalProcess {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Create an unreadable-input error.
    pub fn input_unreadable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a storage error with operation context.
    pub fn storage(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Storage {
            operation: operation.into(),
            source,
        }
    }

    /// Whether this failure is a cancellation (distinct for reporting).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ItemError::Cancelled)
    }

    /// Stable short tag for front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::ExternalProcess { .. } => "external_process",
            ItemError::InputUnreadable { .. } => "input_unreadable",
            ItemError::Storage { .. } => "storage",
            ItemError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_context() {
        let err = ItemError::input_unreadable("/in/clip.mkv", "no video stream");
        assert!(err.to_string().contains("/in/clip.mkv"));
        assert!(err.to_string().contains("no video stream"));

        let err = ItemError::storage(
            "creating item scratch",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("creating item scratch"));
    }

    #[test]
    fn cancelled_is_distinct() {
        assert!(ItemError::Cancelled.is_cancelled());
        assert!(!ItemError::external_process("segment 0", "all jobs failed").is_cancelled());
        assert_eq!(ItemError::Cancelled.kind(), "cancelled");
    }
}
