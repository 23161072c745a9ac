/// Notifications published by a `Doc` to its consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum DocEvent<O, S> {
    /// An operation, local or remote, was applied to the snapshot.
    Change { op: O, previous_snapshot: S },

    /// An operation from another replica was applied to the snapshot. Always
    /// followed by a `Change` for the same operation.
    RemoteOp { op: O, previous_snapshot: S },

    /// One inserted span of a remote text operation, published between its
    /// `RemoteOp` and `Change`. Positions are sequential like the
    /// operation's components.
    Insert { position: usize, text: String },

    /// One deleted span of a remote text operation.
    Delete { position: usize, text: String },

    Closed,
}
