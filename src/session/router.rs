use std::collections::BTreeMap;

use log::{debug, info, warn};
use tokio::sync::oneshot;

use super::{ClientEnvelope, ClientMessage, ServerEnvelope, ServerMessage, Transport};
use crate::{AckReceiver, Doc, OperationType, SyncConfig, SyncError, TextType};

pub type OpenResult = Result<(), SyncError>;

/// Resolves once the sequencer has answered an open request.
pub type OpenReceiver = oneshot::Receiver<OpenResult>;

/// Outbound side of the session, remembering the last document name sent so
/// that it can be elided.
struct Outbound<Tr> {
    transport: Tr,
    elide_document_names: bool,
    last_document: Option<String>,
}

impl<Tr> Outbound<Tr> {
    fn send<O>(&mut self, document: &str, message: ClientMessage<O>) -> Result<(), SyncError>
    where
        Tr: Transport<O>,
    {
        let elide =
            self.elide_document_names && self.last_document.as_deref() == Some(document);

        self.transport.send(ClientEnvelope {
            doc: (!elide).then(|| document.to_owned()),
            message,
        })?;

        // Only a delivered name can be elided later.
        if !elide {
            self.last_document = Some(document.to_owned());
        }

        Ok(())
    }
}

/// Owns the open documents of one connection and routes messages between
/// them and the sequencer.
///
/// Every document has at most one operation in flight, so responses are
/// matched to requests by document name alone.
pub struct Session<T: OperationType, Tr> {
    config: SyncConfig,
    outbound: Outbound<Tr>,
    docs: BTreeMap<String, Doc<T>>,
    opening: BTreeMap<String, oneshot::Sender<OpenResult>>,
    last_received_document: Option<String>,
}

impl<Tr: Transport<<TextType as OperationType>::Op>> Session<TextType, Tr> {
    /// A session for plain text documents.
    #[must_use]
    pub fn text(transport: Tr, config: SyncConfig) -> Self { Self::new(transport, config) }
}

impl<T, Tr> Session<T, Tr>
where
    T: OperationType,
    Tr: Transport<T::Op>,
{
    #[must_use]
    pub fn new(transport: Tr, config: SyncConfig) -> Self {
        Self {
            outbound: Outbound {
                transport,
                elide_document_names: config.elide_document_names,
                last_document: None,
            },
            config,
            docs: BTreeMap::new(),
            opening: BTreeMap::new(),
            last_received_document: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig { &self.config }

    #[must_use]
    pub fn transport(&self) -> &Tr { &self.outbound.transport }

    pub fn transport_mut(&mut self) -> &mut Tr { &mut self.outbound.transport }

    #[must_use]
    pub fn doc(&self, name: &str) -> Option<&Doc<T>> { self.docs.get(name) }

    pub fn doc_mut(&mut self, name: &str) -> Option<&mut Doc<T>> { self.docs.get_mut(name) }

    /// Names of the documents currently held, including closed ones waiting
    /// for the sequencer's confirmation.
    pub fn documents(&self) -> impl Iterator<Item = &str> { self.docs.keys().map(String::as_str) }

    /// Asks the sequencer for the document, creating it if `create` is set.
    /// Opening a document that is already open resolves immediately.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::OpenInProgress` if the document is already being
    /// opened, or a transport error.
    pub fn open(&mut self, name: &str, create: bool) -> Result<OpenReceiver, SyncError> {
        let (responder, receiver) = oneshot::channel();

        if self.docs.get(name).is_some_and(|doc| !doc.is_closed()) {
            let _ = responder.send(Ok(()));
            return Ok(receiver);
        }

        if self.opening.contains_key(name) {
            return Err(SyncError::OpenInProgress {
                document: name.to_owned(),
            });
        }

        self.outbound.send(
            name,
            ClientMessage::<T::Op>::Open {
                create,
                type_name: T::NAME.to_owned(),
            },
        )?;

        debug!("Opening document '{name}' (create: {create})");
        self.opening.insert(name.to_owned(), responder);

        Ok(receiver)
    }

    /// Submits a local edit to an open document. Call [`Session::flush`] to
    /// send it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnknownDocument` if the document is not open;
    /// otherwise see [`Doc::submit_local_op`].
    pub fn submit(&mut self, name: &str, op: T::Op) -> Result<AckReceiver<T::Op>, SyncError> {
        self.known_doc_mut(name)?.submit(op)
    }

    /// # Errors
    ///
    /// See [`Session::submit`].
    pub fn submit_local_op(
        &mut self,
        name: &str,
        op: T::Op,
        base_revision: u64,
    ) -> Result<AckReceiver<T::Op>, SyncError> {
        self.known_doc_mut(name)?.submit_local_op(op, base_revision)
    }

    /// Sends the pending operation of every document with a scheduled flush
    /// and nothing in flight. Returns the number of submissions sent.
    ///
    /// # Errors
    ///
    /// Returns a transport error; documents flushed before it stay in flight.
    pub fn flush(&mut self) -> Result<usize, SyncError> {
        let mut sent = 0;

        for (name, doc) in &mut self.docs {
            if !doc.flush_scheduled() {
                continue;
            }

            if let Some(submission) = doc.flush() {
                self.outbound.send(
                    name,
                    ClientMessage::Submit {
                        op: submission.op,
                        base_revision: submission.base_revision,
                    },
                )?;
                sent += 1;
            }
        }

        Ok(sent)
    }

    /// Closes the document and tells the sequencer. The document is dropped
    /// once the sequencer confirms.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UnknownDocument` if the document is not open, or a
    /// transport error.
    pub fn close(&mut self, name: &str) -> Result<(), SyncError> {
        if self.known_doc_mut(name)?.close() {
            self.outbound.send(name, ClientMessage::<T::Op>::Close)?;
        }

        Ok(())
    }

    /// Routes a message from the sequencer to its document. Messages about
    /// documents that are not open are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ProtocolError` if the message cannot be attributed
    /// or arrives out of order, an algebra error if a remote operation
    /// conflicts with local edits, or a transport error from re-flushing.
    pub fn handle_message(
        &mut self,
        envelope: ServerEnvelope<T::Op, T::Snapshot>,
    ) -> Result<(), SyncError> {
        let name = match envelope.doc {
            Some(name) => {
                self.last_received_document = Some(name.clone());
                name
            }
            None if self.config.elide_document_names => {
                self.last_received_document.clone().ok_or_else(|| {
                    SyncError::protocol("", "elided document name with no previous document")
                })?
            }
            None => return Err(SyncError::protocol("", "message without a document name")),
        };

        match envelope.message {
            ServerMessage::Opened {
                revision,
                snapshot,
                type_name,
                created,
            } => {
                self.on_opened(name, revision, snapshot, &type_name, created);
                Ok(())
            }
            ServerMessage::OpenFailed { error } => {
                match self.opening.remove(&name) {
                    Some(responder) => {
                        let error = SyncError::Rejected {
                            document: name,
                            reason: error,
                        };
                        warn!("{error}");
                        let _ = responder.send(Err(error));
                    }
                    None => warn!("Ignoring open failure for '{name}' which is not being opened"),
                }
                Ok(())
            }
            ServerMessage::Ack { revision } => {
                let Some(doc) = Self::live_doc(&mut self.docs, &name) else {
                    return Ok(());
                };

                doc.on_ack(revision)?;

                if let Some(submission) = doc.flush() {
                    self.outbound.send(
                        &name,
                        ClientMessage::Submit {
                            op: submission.op,
                            base_revision: submission.base_revision,
                        },
                    )?;
                }
                Ok(())
            }
            ServerMessage::Rejected { error } => match Self::live_doc(&mut self.docs, &name) {
                Some(doc) => doc.on_rejected(error),
                None => Ok(()),
            },
            ServerMessage::RemoteOp { revision, op } => {
                match Self::live_doc(&mut self.docs, &name) {
                    Some(doc) => doc.on_remote_op(revision, op),
                    None => Ok(()),
                }
            }
            ServerMessage::Closed => {
                match self.docs.remove(&name) {
                    Some(mut doc) => {
                        doc.close();
                        info!("Document '{name}' closed by the server");
                    }
                    None => debug!("Ignoring close of '{name}' which is not open"),
                }
                Ok(())
            }
        }
    }

    fn on_opened(
        &mut self,
        name: String,
        revision: u64,
        snapshot: Option<T::Snapshot>,
        type_name: &str,
        created: bool,
    ) {
        let Some(responder) = self.opening.remove(&name) else {
            warn!("Ignoring open response for '{name}' which is not being opened");
            return;
        };

        if type_name != T::NAME {
            let error = SyncError::TypeMismatch {
                document: name,
                expected: T::NAME.to_owned(),
                actual: type_name.to_owned(),
            };
            warn!("{error}");
            let _ = responder.send(Err(error));
            return;
        }

        let snapshot = snapshot.unwrap_or_else(T::create);
        let doc = Doc::new(name.clone(), revision, snapshot, &self.config)
            .mark_created(created);

        info!("Opened document '{name}' at revision {revision}");
        self.docs.insert(name, doc);

        let _ = responder.send(Ok(()));
    }

    fn known_doc_mut(&mut self, name: &str) -> Result<&mut Doc<T>, SyncError> {
        self.docs.get_mut(name).ok_or_else(|| SyncError::UnknownDocument {
            document: name.to_owned(),
        })
    }

    fn live_doc<'a>(docs: &'a mut BTreeMap<String, Doc<T>>, name: &str) -> Option<&'a mut Doc<T>> {
        match docs.get_mut(name) {
            Some(doc) if doc.is_closed() => {
                debug!("Ignoring message for closed document '{name}'");
                None
            }
            Some(doc) => Some(doc),
            None => {
                warn!("Ignoring message for unknown document '{name}'");
                None
            }
        }
    }
}

impl<T: OperationType, Tr> std::fmt::Debug for Session<T, Tr> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("docs", &self.docs)
            .field("opening", &self.opening.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
