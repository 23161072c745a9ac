use std::fmt::Debug;

use super::{Component, Operation, OtError, transform};
use crate::Side;

/// The capabilities a document type has to provide to be synchronized. The
/// type is chosen once, when a session is created, instead of being looked up
/// per call.
pub trait OperationType: 'static {
    type Snapshot: Clone + Debug + PartialEq + Send + Sync + 'static;
    type Op: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Name announced to the sequencer when opening a document.
    const NAME: &'static str;

    /// Snapshot of a freshly created document.
    fn create() -> Self::Snapshot;

    /// Canonicalizes an operation before it enters the algebra.
    fn normalize(op: Self::Op) -> Self::Op;

    /// # Errors
    ///
    /// Returns an error if the operation does not fit the snapshot.
    fn apply(snapshot: &Self::Snapshot, op: &Self::Op) -> Result<Self::Snapshot, OtError>;

    /// # Errors
    ///
    /// Returns an error if the operations cannot be combined.
    fn compose(first: &Self::Op, second: &Self::Op) -> Result<Self::Op, OtError>;

    fn invert(op: &Self::Op) -> Self::Op;

    /// The plain text edits making up `op`, published to subscribers as
    /// `DocEvent::Insert` and `DocEvent::Delete` for remote operations.
    /// Types that are not plain text have none.
    fn text_components(_op: &Self::Op) -> Vec<Component> { Vec::new() }

    /// # Errors
    ///
    /// Returns an error if the operations conflict.
    fn transform(op: &Self::Op, other: &Self::Op, side: Side) -> Result<Self::Op, OtError>;

    /// Transforms two concurrent operations against each other; `left` wins
    /// insert ties.
    ///
    /// # Errors
    ///
    /// Returns an error if the operations conflict.
    fn transform_both(left: &Self::Op, right: &Self::Op) -> Result<(Self::Op, Self::Op), OtError> {
        Ok((
            Self::transform(left, right, Side::Left)?,
            Self::transform(right, left, Side::Right)?,
        ))
    }
}

/// Plain text documents edited with insert and delete components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextType;

impl OperationType for TextType {
    type Snapshot = String;
    type Op = Operation;

    const NAME: &'static str = "text";

    fn create() -> String { String::new() }

    fn normalize(op: Operation) -> Operation { op.compress() }

    fn apply(snapshot: &String, op: &Operation) -> Result<String, OtError> { op.apply(snapshot) }

    fn compose(first: &Operation, second: &Operation) -> Result<Operation, OtError> {
        Ok(first.compose(second))
    }

    fn invert(op: &Operation) -> Operation { op.invert() }

    fn text_components(op: &Operation) -> Vec<Component> { op.components().to_vec() }

    fn transform(op: &Operation, other: &Operation, side: Side) -> Result<Operation, OtError> {
        transform::transform(op, other, side)
    }

    fn transform_both(
        left: &Operation,
        right: &Operation,
    ) -> Result<(Operation, Operation), OtError> {
        transform::transform_both(left, right)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A type that only overrides `transform`, to check the default
    /// `transform_both`.
    struct PlainText;

    impl OperationType for PlainText {
        type Snapshot = String;
        type Op = Operation;

        const NAME: &'static str = "plain";

        fn create() -> String { TextType::create() }

        fn normalize(op: Operation) -> Operation { TextType::normalize(op) }

        fn apply(snapshot: &String, op: &Operation) -> Result<String, OtError> {
            TextType::apply(snapshot, op)
        }

        fn compose(first: &Operation, second: &Operation) -> Result<Operation, OtError> {
            TextType::compose(first, second)
        }

        fn invert(op: &Operation) -> Operation { TextType::invert(op) }

        fn transform(op: &Operation, other: &Operation, side: Side) -> Result<Operation, OtError> {
            TextType::transform(op, other, side)
        }
    }

    #[test]
    fn test_default_transform_both_matches_text_type() {
        let left = Operation::new(vec![Component::insert(0, "ab"), Component::delete(4, "d")]);
        let right = Operation::new(vec![Component::delete(1, "bc"), Component::insert(1, "Z")]);

        assert_eq!(
            PlainText::transform_both(&left, &right),
            TextType::transform_both(&left, &right)
        );
    }

    #[test]
    fn test_text_type() {
        assert_eq!(TextType::NAME, "text");
        assert_eq!(TextType::create(), "");

        let op = Operation::new(vec![Component::insert(0, "a"), Component::insert(1, "b")]);
        assert_eq!(TextType::normalize(op), Operation::insert(0, "ab"));
    }
}
