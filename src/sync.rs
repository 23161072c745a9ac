mod doc;
mod events;
mod history;
mod sync_error;

pub use doc::{AckReceiver, AckResult, Doc, DocState, Submission};
pub use events::DocEvent;
pub use history::RevisionHistory;
pub use sync_error::SyncError;
