use std::fmt::Debug;

use log::{debug, info, warn};
use tokio::sync::{broadcast, oneshot};

use super::{DocEvent, RevisionHistory, SyncError};
use crate::{
    Component, Operation, OperationType, OtError, Side, TextType, config::SyncConfig,
    utils::char_index::{char_len, char_slice},
};

/// Outcome of a submitted operation: the operation as the sequencer accepted
/// it, or the reason it was rejected.
pub type AckResult<O> = Result<O, SyncError>;

/// Resolves once the sequencer acknowledges or rejects the submission.
/// Dropping it is fine; the operation is still synchronized.
pub type AckReceiver<O> = oneshot::Receiver<AckResult<O>>;

type AckSender<O> = oneshot::Sender<AckResult<O>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocState {
    /// Nothing is waiting for the sequencer.
    Idle,

    /// An operation has been handed to the transport and is waiting for its
    /// acknowledgement.
    AwaitingAck,

    Closed,
}

/// An operation ready to be handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission<O> {
    pub op: O,
    pub base_revision: u64,
}

struct Pending<O> {
    op: O,
    acks: Vec<AckSender<O>>,
}

struct Inflight<O> {
    op: O,
    base_revision: u64,
    acks: Vec<AckSender<O>>,
}

/// A replica of a single document.
///
/// Local edits are applied to the snapshot immediately and collected into a
/// pending operation. At most one operation is in flight to the sequencer at
/// a time; edits made meanwhile keep being composed into the pending one.
/// Operations arriving from the sequencer are transformed against both the
/// inflight and the pending operation before being applied, so the local
/// edits stay valid against the new revision.
///
/// Remote operations are always the left side of a transformation and local
/// operations the right side: when both insert at the same position, the
/// remote text comes first.
pub struct Doc<T: OperationType = TextType> {
    name: String,
    snapshot: T::Snapshot,
    revision: u64,
    inflight: Option<Inflight<T::Op>>,
    pending: Option<Pending<T::Op>>,
    history: RevisionHistory<T::Op>,
    flush_scheduled: bool,
    closed: bool,
    created: bool,
    events: broadcast::Sender<DocEvent<T::Op, T::Snapshot>>,
}

impl<T: OperationType> Doc<T> {
    /// Creates a replica from the snapshot and revision the sequencer sent
    /// when the document was opened.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        revision: u64,
        snapshot: T::Snapshot,
        config: &SyncConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            name: name.into(),
            snapshot,
            revision,
            inflight: None,
            pending: None,
            history: RevisionHistory::new(config.history_retention),
            flush_scheduled: false,
            closed: false,
            created: false,
            events,
        }
    }

    pub(crate) fn mark_created(mut self, created: bool) -> Self {
        self.created = created;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn snapshot(&self) -> &T::Snapshot { &self.snapshot }

    #[must_use]
    pub fn revision(&self) -> u64 { self.revision }

    /// Whether the sequencer created the document when it was opened.
    #[must_use]
    pub fn created(&self) -> bool { self.created }

    #[must_use]
    pub fn state(&self) -> DocState {
        if self.closed {
            DocState::Closed
        } else if self.inflight.is_some() {
            DocState::AwaitingAck
        } else {
            DocState::Idle
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed }

    /// The operation waiting for acknowledgement, expressed against the
    /// current revision.
    #[must_use]
    pub fn inflight(&self) -> Option<&T::Op> { self.inflight.as_ref().map(|inflight| &inflight.op) }

    /// The revision the inflight operation was submitted against.
    #[must_use]
    pub fn inflight_base_revision(&self) -> Option<u64> {
        self.inflight.as_ref().map(|inflight| inflight.base_revision)
    }

    /// Local edits not yet handed to the transport.
    #[must_use]
    pub fn pending(&self) -> Option<&T::Op> { self.pending.as_ref().map(|pending| &pending.op) }

    /// Whether [`Doc::flush`] has work to do.
    #[must_use]
    pub fn flush_scheduled(&self) -> bool { self.flush_scheduled }

    #[must_use]
    pub fn history(&self) -> &RevisionHistory<T::Op> { &self.history }

    /// Forgets the operations older than `revision`. Submissions based on
    /// those revisions will fail with `SyncError::StaleBase`.
    pub fn prune_history_before(&mut self, revision: u64) { self.history.prune_before(revision); }

    /// Subscribes to the document's change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent<T::Op, T::Snapshot>> {
        self.events.subscribe()
    }

    /// Submits a local edit made against the current revision.
    ///
    /// # Errors
    ///
    /// See [`Doc::submit_local_op`].
    pub fn submit(&mut self, op: T::Op) -> Result<AckReceiver<T::Op>, SyncError> {
        self.submit_local_op(op, self.revision)
    }

    /// Submits a local edit made against `base_revision`. An edit based on
    /// an older revision is first transformed over every operation accepted
    /// since. The edit is applied to the snapshot immediately and queued for
    /// the next flush.
    ///
    /// # Errors
    ///
    /// Fails without changing the document if it is closed, if the history
    /// needed for rebasing is gone (`StaleBase`), if the base is ahead of the
    /// document, or if the operation does not apply to the snapshot.
    pub fn submit_local_op(
        &mut self,
        op: T::Op,
        base_revision: u64,
    ) -> Result<AckReceiver<T::Op>, SyncError> {
        if self.closed {
            return Err(SyncError::closed(&self.name));
        }

        if base_revision > self.revision {
            return Err(SyncError::InvalidBaseRevision {
                base_revision,
                revision: self.revision,
            });
        }

        let mut op = T::normalize(op);
        for revision in base_revision..self.revision {
            let accepted = self.history.get(revision).ok_or(SyncError::StaleBase {
                base_revision,
                missing_revision: revision,
            })?;

            op = T::transform(&op, accepted, Side::Right)?;
        }

        let snapshot = T::apply(&self.snapshot, &op)?;
        let pending_op = match &self.pending {
            Some(pending) => T::compose(&pending.op, &op)?,
            None => op.clone(),
        };

        let (ack_sender, ack_receiver) = oneshot::channel();
        let mut acks = self.pending.take().map(|pending| pending.acks).unwrap_or_default();
        acks.push(ack_sender);
        self.pending = Some(Pending {
            op: pending_op,
            acks,
        });

        let previous_snapshot = std::mem::replace(&mut self.snapshot, snapshot);
        self.flush_scheduled = true;

        debug!(
            "Applied local operation {op:?} to document '{}' at revision {}",
            self.name, self.revision
        );
        self.emit(DocEvent::Change {
            op,
            previous_snapshot,
        });

        Ok(ack_receiver)
    }

    /// Moves the pending operation in flight and returns it for the
    /// transport, unless an operation is already in flight or there is
    /// nothing to send.
    pub fn flush(&mut self) -> Option<Submission<T::Op>> {
        self.flush_scheduled = false;

        if self.closed || self.inflight.is_some() {
            return None;
        }

        let pending = self.pending.take()?;
        let submission = Submission {
            op: pending.op.clone(),
            base_revision: self.revision,
        };

        debug!(
            "Sending operation {:?} of document '{}' against revision {}",
            submission.op, self.name, self.revision
        );

        self.inflight = Some(Inflight {
            op: pending.op,
            base_revision: self.revision,
            acks: pending.acks,
        });

        Some(submission)
    }

    /// Handles the sequencer accepting the inflight operation at `revision`.
    /// Schedules another flush if edits were queued in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ProtocolError` if nothing is in flight or the
    /// revision is not the current one.
    pub fn on_ack(&mut self, revision: u64) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::closed(&self.name));
        }

        let inflight = match self.inflight.take() {
            Some(inflight) if revision == self.revision => inflight,
            Some(inflight) => {
                self.inflight = Some(inflight);
                return Err(SyncError::protocol(
                    &self.name,
                    format!(
                        "expected acknowledgement at revision {}, got {revision}",
                        self.revision
                    ),
                ));
            }
            None => {
                return Err(SyncError::protocol(
                    &self.name,
                    "acknowledgement received without an operation in flight",
                ));
            }
        };

        self.history.record(self.revision, inflight.op.clone());
        self.revision += 1;

        debug!(
            "Operation of document '{}' accepted, now at revision {}",
            self.name, self.revision
        );

        for ack in inflight.acks {
            // The submitter may have dropped the receiver.
            let _ = ack.send(Ok(inflight.op.clone()));
        }

        self.flush_scheduled = self.pending.is_some();

        Ok(())
    }

    /// Handles the sequencer rejecting the inflight operation. The optimistic
    /// local changes are kept; resynchronizing is up to the caller. No new
    /// flush is scheduled until the next local edit.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ProtocolError` if nothing is in flight.
    pub fn on_rejected(&mut self, reason: impl Into<String>) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::closed(&self.name));
        }

        let Some(inflight) = self.inflight.take() else {
            return Err(SyncError::protocol(
                &self.name,
                "rejection received without an operation in flight",
            ));
        };

        let error = SyncError::Rejected {
            document: self.name.clone(),
            reason: reason.into(),
        };
        warn!("{error}");

        for ack in inflight.acks {
            let _ = ack.send(Err(error.clone()));
        }

        Ok(())
    }

    /// Applies an operation the sequencer accepted from another replica at
    /// `revision`. Redelivered operations (older revisions) are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::ProtocolError` if `revision` skips ahead, meaning
    /// a message was lost, and an algebra error if the operation conflicts
    /// with local edits. The document is unchanged in both cases.
    pub fn on_remote_op(&mut self, revision: u64, op: T::Op) -> Result<(), SyncError> {
        if self.closed {
            return Err(SyncError::closed(&self.name));
        }

        if revision < self.revision {
            debug!(
                "Ignoring already applied revision {revision} of document '{}'",
                self.name
            );
            return Ok(());
        }

        if revision != self.revision {
            return Err(SyncError::protocol(
                &self.name,
                format!("expected revision {}, got {revision}", self.revision),
            ));
        }

        let mut remote = op.clone();

        let inflight_op = match &self.inflight {
            Some(inflight) => {
                let (transformed_remote, transformed_inflight) =
                    T::transform_both(&remote, &inflight.op)?;
                remote = transformed_remote;
                Some(transformed_inflight)
            }
            None => None,
        };

        let pending_op = match &self.pending {
            Some(pending) => {
                let (transformed_remote, transformed_pending) =
                    T::transform_both(&remote, &pending.op)?;
                remote = transformed_remote;
                Some(transformed_pending)
            }
            None => None,
        };

        let snapshot = T::apply(&self.snapshot, &remote)?;

        self.history.record(self.revision, op);
        if let (Some(inflight), Some(op)) = (&mut self.inflight, inflight_op) {
            inflight.op = op;
        }
        if let (Some(pending), Some(op)) = (&mut self.pending, pending_op) {
            pending.op = op;
        }

        let previous_snapshot = std::mem::replace(&mut self.snapshot, snapshot);
        self.revision += 1;

        debug!(
            "Applied remote operation {remote:?} to document '{}', now at revision {}",
            self.name, self.revision
        );

        self.emit(DocEvent::RemoteOp {
            op: remote.clone(),
            previous_snapshot: previous_snapshot.clone(),
        });
        for component in T::text_components(&remote) {
            self.emit(match component {
                Component::Insert { position, text } => DocEvent::Insert { position, text },
                Component::Delete { position, text } => DocEvent::Delete { position, text },
            });
        }
        self.emit(DocEvent::Change {
            op: remote,
            previous_snapshot,
        });

        Ok(())
    }

    /// Closes the document. Further submissions fail with
    /// `SyncError::ClosedError`; the outcome of an operation still in flight
    /// is not reported. Returns false if the document was already closed.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }

        self.closed = true;
        self.flush_scheduled = false;

        info!("Closed document '{}' at revision {}", self.name, self.revision);
        self.emit(DocEvent::Closed);

        true
    }

    fn emit(&self, event: DocEvent<T::Op, T::Snapshot>) {
        // Sending only fails when nobody is subscribed.
        if self.events.send(event).is_err() {
            debug!("No subscribers for events of document '{}'", self.name);
        }
    }
}

impl Doc<TextType> {
    #[must_use]
    pub fn text(&self) -> &str { &self.snapshot }

    /// Number of characters in the document.
    #[must_use]
    pub fn len(&self) -> usize { char_len(&self.snapshot) }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.snapshot.is_empty() }

    /// Inserts `text` before the `position`-th character.
    ///
    /// # Errors
    ///
    /// See [`Doc::submit_local_op`].
    pub fn insert(
        &mut self,
        position: usize,
        text: impl Into<String>,
    ) -> Result<AckReceiver<Operation>, SyncError> {
        self.submit(Operation::insert(position, text))
    }

    /// Deletes `length` characters starting at `position`.
    ///
    /// # Errors
    ///
    /// Returns `OtError::PositionOutOfBounds` if the range extends past the
    /// end of the document; otherwise see [`Doc::submit_local_op`].
    pub fn delete(
        &mut self,
        position: usize,
        length: usize,
    ) -> Result<AckReceiver<Operation>, SyncError> {
        let document_length = self.len();
        let end = position
            .checked_add(length)
            .filter(|end| *end <= document_length)
            .ok_or(OtError::PositionOutOfBounds {
                position: position.saturating_add(length),
                length: document_length,
            })?;

        let deleted = char_slice(&self.snapshot, position, end).to_owned();
        self.submit(Operation::delete(position, deleted))
    }
}

impl<T: OperationType> Debug for Doc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Doc")
            .field("name", &self.name)
            .field("revision", &self.revision)
            .field("state", &self.state())
            .field("snapshot", &self.snapshot)
            .field("inflight", &self.inflight())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
