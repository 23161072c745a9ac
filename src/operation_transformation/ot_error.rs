use thiserror::Error;

/// Errors raised by the text operation algebra.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    /// A component on the wire is malformed.
    #[error("Invalid component: {reason}")]
    InvalidComponent { reason: String },

    /// An operation contains a malformed component.
    #[error("Invalid operation: component {index} is malformed ({source})")]
    InvalidOperation {
        /// Index of the first malformed component
        index: usize,
        #[source]
        source: Box<OtError>,
    },

    /// A delete's text differs from what the snapshot holds at its position.
    #[error(
        "Delete component '{expected}' at position {position} does not match deleted text \
         '{actual}'"
    )]
    ContentMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    /// An insert points beyond the end of the snapshot.
    #[error("Cannot insert at position {position} of a snapshot with {length} characters")]
    PositionOutOfBounds { position: usize, length: usize },

    /// Two concurrent deletes overlap but disagree on the overlapping text.
    #[error(
        "Delete operations delete different text in the same region of the document: '{left}' \
         vs '{right}' starting at position {position}"
    )]
    ConflictingDelete {
        position: usize,
        left: String,
        right: String,
    },
}

impl OtError {
    pub(crate) fn invalid_component(reason: impl Into<String>) -> Self {
        OtError::InvalidComponent {
            reason: reason.into(),
        }
    }
}
