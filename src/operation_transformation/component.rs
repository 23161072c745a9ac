use core::fmt::{Debug, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use super::RawComponent;
use crate::utils::char_index::char_len;

/// An atomic edit: inserting or deleting `text` at the character index
/// `position`. The deleted text is carried along so that applying the
/// component can verify that the replica agrees on what is being removed.
///
/// An empty `text` makes the component a no-op; such components are dropped
/// whenever they are appended to an operation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RawComponent", into = "RawComponent")
)]
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Component {
    Insert { position: usize, text: String },
    Delete { position: usize, text: String },
}

impl Component {
    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Component::Insert {
            position,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn delete(position: usize, text: impl Into<String>) -> Self {
        Component::Delete {
            position,
            text: text.into(),
        }
    }

    /// Returns the index of the first character that the component affects.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Component::Insert { position, .. } | Component::Delete { position, .. } => *position,
        }
    }

    /// Returns the inserted or deleted text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Component::Insert { text, .. } | Component::Delete { text, .. } => text,
        }
    }

    /// Returns the number of inserted or deleted characters.
    #[must_use]
    pub fn len(&self) -> usize { char_len(self.text()) }

    /// Returns true if the component would not change any text.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.text().is_empty() }

    /// Returns the first index after the last affected character.
    #[must_use]
    pub fn end(&self) -> usize { self.position() + self.len() }

    /// Swaps insert and delete while keeping the position, which undoes the
    /// component.
    #[must_use]
    pub fn inverted(&self) -> Self {
        match self {
            Component::Insert { position, text } => Component::delete(*position, text.clone()),
            Component::Delete { position, text } => Component::insert(*position, text.clone()),
        }
    }

    /// Moves a cursor at `position` so that it points at the same place
    /// after this component has been applied.
    ///
    /// A cursor sitting exactly where text gets inserted only moves forward
    /// if `insert_after` is set. A cursor inside a deleted span collapses to
    /// the start of the span.
    #[must_use]
    pub fn transform_position(&self, position: usize, insert_after: bool) -> usize {
        match self {
            Component::Insert { position: at, .. } => {
                if *at < position || (*at == position && insert_after) {
                    position + self.len()
                } else {
                    position
                }
            }
            Component::Delete { position: at, .. } => {
                if position <= *at {
                    position
                } else if position <= self.end() {
                    *at
                } else {
                    position - self.len()
                }
            }
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (kind, position, text) = match self {
            Component::Insert { position, text } => ("insert", position, text),
            Component::Delete { position, text } => ("delete", position, text),
        };

        write!(
            f,
            "<{kind} '{}' at index {position}>",
            text.replace('\n', "\\n")
        )
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { write!(f, "{self}") }
}
