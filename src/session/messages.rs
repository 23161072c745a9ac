#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Requests sent to the sequencer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage<O> {
    /// Fetch the latest snapshot, creating the document first if `create` is
    /// set and it does not exist yet.
    Open { create: bool, type_name: String },

    Submit { op: O, base_revision: u64 },

    Close,
}

/// Responses and notifications from the sequencer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage<O, S> {
    /// The document is open at `revision`. A missing snapshot stands for a
    /// freshly created, empty document.
    Opened {
        revision: u64,
        #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
        snapshot: Option<S>,
        type_name: String,
        #[cfg_attr(feature = "serde", serde(default))]
        created: bool,
    },

    OpenFailed { error: String },

    /// The inflight operation was accepted at `revision`.
    Ack { revision: u64 },

    /// The inflight operation was refused.
    Rejected { error: String },

    /// Another replica's operation, accepted at `revision`.
    RemoteOp { revision: u64, op: O },

    Closed,
}

/// A client message addressed to a document. `doc` is `None` when the name
/// is elided because it matches the previous envelope's.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEnvelope<O> {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub doc: Option<String>,

    #[cfg_attr(feature = "serde", serde(flatten))]
    pub message: ClientMessage<O>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEnvelope<O, S> {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub doc: Option<String>,

    #[cfg_attr(feature = "serde", serde(flatten))]
    pub message: ServerMessage<O, S>,
}

impl<O, S> ServerEnvelope<O, S> {
    #[must_use]
    pub fn new(doc: impl Into<String>, message: ServerMessage<O, S>) -> Self {
        Self {
            doc: Some(doc.into()),
            message,
        }
    }

    /// An envelope relying on the receiver remembering the previous
    /// document name.
    #[must_use]
    pub fn elided(message: ServerMessage<O, S>) -> Self { Self { doc: None, message } }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::Operation;

    type TextEnvelope = ServerEnvelope<Operation, String>;

    #[test]
    fn test_submit_wire_shape() {
        let envelope = ClientEnvelope {
            doc: Some("notes".to_owned()),
            message: ClientMessage::Submit {
                op: Operation::insert(0, "x"),
                base_revision: 3,
            },
        };

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "doc": "notes",
                "type": "submit",
                "op": [{ "p": 0, "i": "x" }],
                "baseRevision": 3,
            })
        );
    }

    #[test]
    fn test_elided_close_wire_shape() {
        let envelope: ClientEnvelope<Operation> = ClientEnvelope {
            doc: None,
            message: ClientMessage::Close,
        };

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "type": "close" })
        );
    }

    #[test]
    fn test_parse_remote_op() {
        let envelope: TextEnvelope = serde_json::from_value(json!({
            "doc": "notes",
            "type": "remoteOp",
            "revision": 4,
            "op": [{ "p": 1, "d": "b" }],
        }))
        .unwrap();

        assert_eq!(
            envelope,
            ServerEnvelope::new(
                "notes",
                ServerMessage::RemoteOp {
                    revision: 4,
                    op: Operation::delete(1, "b"),
                }
            )
        );
    }

    #[test]
    fn test_parse_opened_without_snapshot() {
        let envelope: TextEnvelope = serde_json::from_value(json!({
            "type": "opened",
            "revision": 0,
            "typeName": "text",
        }))
        .unwrap();

        assert_eq!(
            envelope,
            ServerEnvelope::elided(ServerMessage::Opened {
                revision: 0,
                snapshot: None,
                type_name: "text".to_owned(),
                created: false,
            })
        );
    }

    #[test]
    fn test_parse_snapshot_without_default() {
        #[derive(Debug, Clone, PartialEq, Deserialize)]
        struct Lines(Vec<String>);

        let envelope: ServerEnvelope<Operation, Lines> = serde_json::from_value(json!({
            "doc": "notes",
            "type": "opened",
            "revision": 2,
            "snapshot": ["a", "b"],
            "typeName": "lines",
        }))
        .unwrap();

        assert_eq!(
            envelope.message,
            ServerMessage::Opened {
                revision: 2,
                snapshot: Some(Lines(vec!["a".to_owned(), "b".to_owned()])),
                type_name: "lines".to_owned(),
                created: false,
            }
        );
    }

    #[test]
    fn test_reject_malformed_operation() {
        let result = serde_json::from_value::<TextEnvelope>(json!({
            "doc": "notes",
            "type": "remoteOp",
            "revision": 4,
            "op": [{ "p": 1, "d": "b", "i": "c" }],
        }));

        assert!(result.is_err());
    }
}
