use thiserror::Error;

use crate::OtError;

/// Errors raised while synchronizing a document with the sequencer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Ot(#[from] OtError),

    /// Rebasing needs history that is no longer retained. The caller has to
    /// refetch the latest snapshot and resubmit.
    #[error(
        "Cannot rebase from revision {base_revision}: revision {missing_revision} is no longer \
         retained"
    )]
    StaleBase {
        base_revision: u64,
        missing_revision: u64,
    },

    #[error("Base revision {base_revision} is ahead of the document's revision {revision}")]
    InvalidBaseRevision { base_revision: u64, revision: u64 },

    /// The message stream from the sequencer cannot be trusted anymore; the
    /// document has to be reopened.
    #[error("Protocol error on document '{document}': {reason}")]
    ProtocolError { document: String, reason: String },

    #[error("Document '{document}' is closed")]
    ClosedError { document: String },

    /// The sequencer refused a submission or an open request.
    #[error("Document '{document}' rejected by the server: {reason}")]
    Rejected { document: String, reason: String },

    #[error("Document '{document}' is not open")]
    UnknownDocument { document: String },

    #[error("Document '{document}' is already being opened")]
    OpenInProgress { document: String },

    /// The receiving end of the transport is gone.
    #[error("Transport is closed")]
    TransportClosed,

    #[error("Document '{document}' has type '{actual}' but '{expected}' was expected")]
    TypeMismatch {
        document: String,
        expected: String,
        actual: String,
    },
}

impl SyncError {
    pub(crate) fn protocol(document: &str, reason: impl Into<String>) -> Self {
        let error = SyncError::ProtocolError {
            document: document.to_owned(),
            reason: reason.into(),
        };
        log::warn!("{error}");
        error
    }

    pub(crate) fn closed(document: &str) -> Self {
        SyncError::ClosedError {
            document: document.to_owned(),
        }
    }
}
