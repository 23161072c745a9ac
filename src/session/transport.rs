use tokio::sync::mpsc;

use super::ClientEnvelope;
use crate::SyncError;

/// The outbound half of the connection to the sequencer. Responses are fed
/// back through `Session::handle_message`.
pub trait Transport<O> {
    /// # Errors
    ///
    /// Returns `SyncError::TransportClosed` if the message cannot be
    /// delivered anymore.
    fn send(&mut self, envelope: ClientEnvelope<O>) -> Result<(), SyncError>;
}

impl<O> Transport<O> for mpsc::UnboundedSender<ClientEnvelope<O>> {
    fn send(&mut self, envelope: ClientEnvelope<O>) -> Result<(), SyncError> {
        mpsc::UnboundedSender::send(self, envelope).map_err(|_| SyncError::TransportClosed)
    }
}
