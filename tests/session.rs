use std::collections::HashMap;

use pretty_assertions::assert_eq;
use reconcile_sync::{
    ClientEnvelope, ClientMessage, Doc, Operation, ServerEnvelope, ServerMessage, Session, Side,
    SyncConfig, SyncError, TextType, transform,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type Client = Session<TextType, UnboundedSender<ClientEnvelope<Operation>>>;
type Outbox = UnboundedReceiver<ClientEnvelope<Operation>>;
type Reply = (usize, ServerEnvelope<Operation, String>);

#[derive(Debug, Default)]
struct SequencedDocument {
    text: String,
    history: Vec<Operation>,
    subscribers: Vec<usize>,
}

/// A minimal in-memory sequencer: it orders submissions, rebases stale ones
/// over the accepted history and fans the result out to every subscriber.
#[derive(Debug, Default)]
struct Sequencer {
    documents: HashMap<String, SequencedDocument>,
}

impl Sequencer {
    fn handle(&mut self, client: usize, envelope: ClientEnvelope<Operation>) -> Vec<Reply> {
        let name = envelope.doc.expect("Document names are not elided in these tests");

        match envelope.message {
            ClientMessage::Open { create, type_name } => {
                let created = !self.documents.contains_key(&name);
                if created && !create {
                    return vec![(
                        client,
                        ServerEnvelope::new(
                            name,
                            ServerMessage::OpenFailed {
                                error: "no such document".to_owned(),
                            },
                        ),
                    )];
                }

                let document = self.documents.entry(name.clone()).or_default();
                document.subscribers.push(client);

                vec![(
                    client,
                    ServerEnvelope::new(
                        name,
                        ServerMessage::Opened {
                            revision: document.history.len() as u64,
                            snapshot: (!created).then(|| document.text.clone()),
                            type_name,
                            created,
                        },
                    ),
                )]
            }
            ClientMessage::Submit { op, base_revision } => {
                let document = self.documents.get_mut(&name).expect("Document is open");

                let base = usize::try_from(base_revision).unwrap();
                let mut op = op;
                for accepted in &document.history[base..] {
                    op = transform(&op, accepted, Side::Right).unwrap();
                }

                document.text = op.apply(&document.text).unwrap();
                let revision = document.history.len() as u64;
                document.history.push(op.clone());

                document
                    .subscribers
                    .iter()
                    .map(|&subscriber| {
                        let message = if subscriber == client {
                            ServerMessage::Ack { revision }
                        } else {
                            ServerMessage::RemoteOp {
                                revision,
                                op: op.clone(),
                            }
                        };
                        (subscriber, ServerEnvelope::new(name.clone(), message))
                    })
                    .collect()
            }
            ClientMessage::Close => {
                if let Some(document) = self.documents.get_mut(&name) {
                    document.subscribers.retain(|&subscriber| subscriber != client);
                }
                vec![(client, ServerEnvelope::new(name, ServerMessage::Closed))]
            }
        }
    }

    fn text(&self, name: &str) -> &str { &self.documents[name].text }
}

struct Network {
    sequencer: Sequencer,
    clients: Vec<(Client, Outbox)>,
}

impl Network {
    fn new(client_count: usize) -> Self {
        let clients = (0..client_count)
            .map(|_| {
                let (sender, receiver) = mpsc::unbounded_channel();
                (Session::text(sender, SyncConfig::default()), receiver)
            })
            .collect();

        Self {
            sequencer: Sequencer::default(),
            clients,
        }
    }

    fn client(&mut self, index: usize) -> &mut Client { &mut self.clients[index].0 }

    fn doc(&self, index: usize, name: &str) -> &Doc {
        self.clients[index].0.doc(name).expect("Document is open")
    }

    /// Flushes every client first so that their submissions race, then
    /// delivers messages until the network is quiet.
    fn settle(&mut self) {
        loop {
            for (client, _) in &mut self.clients {
                client.flush().unwrap();
            }

            let mut delivered = false;
            for index in 0..self.clients.len() {
                while let Ok(envelope) = self.clients[index].1.try_recv() {
                    for (target, reply) in self.sequencer.handle(index, envelope) {
                        self.clients[target].0.handle_message(reply).unwrap();
                    }
                    delivered = true;
                }
            }

            if !delivered {
                break;
            }
        }
    }

    fn assert_converged(&self, name: &str) {
        let expected = self.sequencer.text(name);
        for index in 0..self.clients.len() {
            assert_eq!(self.doc(index, name).text(), expected, "Client {index}");
        }
    }
}

#[test]
fn test_concurrent_edits_converge() {
    let mut network = Network::new(2);

    let _ = network.client(0).open("notes", true).unwrap();
    network.settle();
    assert!(network.doc(0, "notes").created());

    network.client(0).submit("notes", Operation::insert(0, "hello world")).unwrap();
    network.settle();

    let _ = network.client(1).open("notes", false).unwrap();
    network.settle();
    assert_eq!(network.doc(1, "notes").text(), "hello world");
    assert_eq!(network.doc(1, "notes").revision(), 1);

    network.client(0).submit("notes", Operation::insert(5, ",")).unwrap();
    let doc = network.client(1).doc_mut("notes").unwrap();
    doc.delete(6, 5).unwrap();
    doc.insert(6, "there").unwrap();
    network.settle();

    network.assert_converged("notes");
    assert_eq!(network.sequencer.text("notes"), "hello, there");
    assert_eq!(network.doc(0, "notes").revision(), 3);
    assert_eq!(network.doc(1, "notes").revision(), 3);
}

#[test]
fn test_same_position_inserts() {
    let mut network = Network::new(2);
    let _ = network.client(0).open("notes", true).unwrap();
    network.settle();
    let _ = network.client(1).open("notes", false).unwrap();
    network.settle();

    let mut first = network.client(0).submit("notes", Operation::insert(0, "A")).unwrap();
    let mut second = network.client(1).submit("notes", Operation::insert(0, "B")).unwrap();
    network.settle();

    network.assert_converged("notes");
    assert_eq!(network.sequencer.text("notes"), "AB");
    assert_eq!(first.try_recv(), Ok(Ok(Operation::insert(0, "A"))));
    assert_eq!(second.try_recv(), Ok(Ok(Operation::insert(1, "B"))));
}

#[test]
fn test_many_rounds_converge() {
    let mut network = Network::new(3);
    let _ = network.client(0).open("log", true).unwrap();
    network.settle();
    for index in 1..3 {
        let _ = network.client(index).open("log", false).unwrap();
    }
    network.settle();

    for round in 0..30_usize {
        for index in 0..3 {
            let doc = network.client(index).doc_mut("log").unwrap();
            let length = doc.len();

            doc.insert((round * 7 + index * 3) % (length + 1), format!("{index}{round}"))
                .unwrap();

            if round % 3 == index && doc.len() > 4 {
                doc.delete(round % (doc.len() - 2), 2).unwrap();
            }
        }

        // Deliver only every other round so that edits pile up in flight
        // and in pending.
        if round % 2 == 1 {
            network.settle();
        }
    }
    network.settle();

    network.assert_converged("log");
    assert_eq!(network.doc(0, "log").revision(), network.doc(2, "log").revision());
}

#[test]
fn test_open_missing_document() {
    let mut network = Network::new(1);

    let mut receiver = network.client(0).open("missing", false).unwrap();
    network.settle();

    assert_eq!(
        receiver.try_recv(),
        Ok(Err(SyncError::Rejected {
            document: "missing".to_owned(),
            reason: "no such document".to_owned(),
        }))
    );
    assert!(network.client(0).doc("missing").is_none());
}

#[test]
fn test_close_stops_updates() {
    let mut network = Network::new(2);
    let _ = network.client(0).open("notes", true).unwrap();
    network.settle();
    let _ = network.client(1).open("notes", false).unwrap();
    network.settle();

    network.client(1).close("notes").unwrap();
    network.settle();
    assert!(network.client(1).doc("notes").is_none());

    network.client(0).submit("notes", Operation::insert(0, "solo")).unwrap();
    network.settle();

    assert_eq!(network.doc(0, "notes").text(), "solo");
    assert_eq!(network.sequencer.text("notes"), "solo");
}
