//! Operational transformation of plain text, with the client side of a
//! sequencer-based synchronization protocol.
//!
//! [`Operation`]s are sequences of insert and delete [`Component`]s that can
//! be applied, composed, inverted and transformed against concurrent
//! operations. A [`Doc`] keeps a replica of one document in sync with the
//! sequencer, and a [`Session`] routes messages between many documents and a
//! [`Transport`].

mod config;
mod consts;
mod operation_transformation;
mod session;
mod sync;
mod utils;

pub use config::SyncConfig;
pub use operation_transformation::{
    Component, Operation, OperationType, OtError, RawComponent, RawOperation, TextType,
    check_component, check_operation, transform, transform_both, transform_component,
};
pub use session::{
    ClientEnvelope, ClientMessage, OpenReceiver, OpenResult, ServerEnvelope, ServerMessage,
    Session, Transport,
};
pub use sync::{
    AckReceiver, AckResult, Doc, DocEvent, DocState, RevisionHistory, Submission, SyncError,
};
pub use utils::side::Side;
