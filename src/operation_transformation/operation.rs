use core::fmt::{Debug, Display};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Component, OtError, RawOperation};
use crate::utils::char_index::{byte_offset, char_len, char_slice, inject};

/// An ordered sequence of components. Each component's position refers to
/// the text left behind by the components before it, not to the original
/// snapshot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Operation {
    components: Vec<Component>,
}

impl Operation {
    /// Creates an operation from components exactly as given, without
    /// merging neighbours or dropping no-ops.
    #[must_use]
    pub fn new(components: Vec<Component>) -> Self { Self { components } }

    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::new(vec![Component::insert(position, text)])
    }

    #[must_use]
    pub fn delete(position: usize, text: impl Into<String>) -> Self {
        Self::new(vec![Component::delete(position, text)])
    }

    /// Builds an operation from untyped wire components: validates every
    /// component, defaults a missing position to 0, and merges neighbours
    /// through [`Operation::append`].
    ///
    /// # Errors
    ///
    /// Returns `OtError::InvalidOperation` if any component is malformed.
    pub fn normalize(raw: impl Into<RawOperation>) -> Result<Self, OtError> {
        let mut operation = Operation::default();

        for (index, mut component) in raw.into().into_iter().enumerate() {
            component.p.get_or_insert(0);

            let component = Component::try_from(component).map_err(|error| {
                OtError::InvalidOperation {
                    index,
                    source: Box::new(error),
                }
            })?;

            operation.append(component);
        }

        Ok(operation)
    }

    #[must_use]
    pub fn components(&self) -> &[Component] { &self.components }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> { self.components.iter() }

    #[must_use]
    pub fn len(&self) -> usize { self.components.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.components.is_empty() }

    /// Appends a component, merging it into the last one when both are
    /// inserts (or both deletes) that touch or overlap. Only the last
    /// component is ever inspected, so the result is compact but not a full
    /// canonical form. Components with empty text are dropped.
    pub fn append(&mut self, component: Component) {
        if component.is_empty() {
            return;
        }

        let Some(last) = self.components.last_mut() else {
            self.components.push(component);
            return;
        };

        match (last, &component) {
            (
                Component::Insert {
                    position: last_position,
                    text: last_text,
                },
                Component::Insert { position, text },
            ) if *last_position <= *position
                && *position <= *last_position + char_len(last_text) =>
            {
                *last_text = inject(last_text, *position - *last_position, text);
                return;
            }

            (
                Component::Delete {
                    position: last_position,
                    text: last_text,
                },
                Component::Delete { position, text },
            ) if *position <= *last_position && *last_position <= *position + char_len(text) => {
                *last_text = inject(text, *last_position - *position, last_text);
                *last_position = *position;
                return;
            }

            _ => {}
        }

        self.components.push(component);
    }

    /// Applies the operation to `snapshot` and returns the new text. The
    /// input is left untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns `OtError::ContentMismatch` if a delete's text differs from
    /// the text found at its position, and `OtError::PositionOutOfBounds` if
    /// an insert points past the end of the text.
    pub fn apply(&self, snapshot: &str) -> Result<String, OtError> {
        let mut result = snapshot.to_owned();

        for component in &self.components {
            match component {
                Component::Insert { position, text } => {
                    let offset = byte_offset(&result, *position).ok_or_else(|| {
                        OtError::PositionOutOfBounds {
                            position: *position,
                            length: char_len(&result),
                        }
                    })?;

                    result.insert_str(offset, text);
                }
                Component::Delete { position, text } => {
                    let deleted = char_slice(&result, *position, component.end());
                    if deleted != text {
                        return Err(OtError::ContentMismatch {
                            position: *position,
                            expected: text.clone(),
                            actual: deleted.to_owned(),
                        });
                    }

                    // `deleted` matched, so both offsets are in range
                    let start = byte_offset(&result, *position).unwrap_or(result.len());
                    result.replace_range(start..start + text.len(), "");
                }
            }
        }

        Ok(result)
    }

    /// Returns an operation equivalent to applying `self` and then `other`.
    /// `other` must already be expressed against the text produced by
    /// `self`.
    #[must_use]
    pub fn compose(&self, other: &Operation) -> Operation {
        let mut result = self.clone();

        for component in other {
            result.append(component.clone());
        }

        result
    }

    /// Re-canonicalizes the operation by appending its components one by
    /// one onto an empty operation.
    #[must_use]
    pub fn compress(&self) -> Operation { Operation::default().compose(self) }

    /// Returns the operation that undoes `self`. The components are reversed
    /// because each one is positioned relative to the text left by its
    /// predecessors.
    #[must_use]
    pub fn invert(&self) -> Operation {
        Operation::new(self.components.iter().rev().map(Component::inverted).collect())
    }

    /// Moves a cursor so that it points at the same place after the whole
    /// operation has been applied.
    #[must_use]
    pub fn transform_cursor(&self, position: usize, insert_after: bool) -> usize {
        self.components.iter().fold(position, |position, component| {
            component.transform_position(position, insert_after)
        })
    }
}

impl From<Vec<Component>> for Operation {
    fn from(components: Vec<Component>) -> Self { Operation::new(components) }
}

impl From<Component> for Operation {
    fn from(component: Component) -> Self { Operation::new(vec![component]) }
}

impl FromIterator<Component> for Operation {
    /// Collects the components through [`Operation::append`].
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        let mut operation = Operation::default();
        for component in iter {
            operation.append(component);
        }
        operation
    }
}

impl IntoIterator for Operation {
    type Item = Component;
    type IntoIter = std::vec::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter { self.components.into_iter() }
}

impl<'a> IntoIterator for &'a Operation {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter { self.components.iter() }
}

impl Index<usize> for Operation {
    type Output = Component;

    fn index(&self, index: usize) -> &Self::Output { &self.components[index] }
}

impl Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{component}")?;
        }
        write!(f, "]")
    }
}

impl Debug for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { write!(f, "{self}") }
}
