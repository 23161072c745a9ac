mod messages;
mod router;
mod transport;

pub use messages::{ClientEnvelope, ClientMessage, ServerEnvelope, ServerMessage};
pub use router::{OpenReceiver, OpenResult, Session};
pub use transport::Transport;
