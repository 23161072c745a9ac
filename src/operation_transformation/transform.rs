use std::collections::VecDeque;

use super::{Component, Operation, OtError};
use crate::{
    Side,
    utils::char_index::{char_slice, split_at_char},
};

/// Appends to `dest` the component(s) equivalent to `component` once
/// `other` has already been applied. `side` decides which of two inserts at
/// the same position goes first: the `Right` side's insert ends up after the
/// other one.
///
/// A delete that straddles the position of a concurrent insert is split in
/// two so that the inserted text survives.
///
/// # Errors
///
/// Returns `OtError::ConflictingDelete` if both components are deletes that
/// overlap but disagree on the overlapping text.
pub fn transform_component(
    dest: &mut Operation,
    component: &Component,
    other: &Component,
    side: Side,
) -> Result<(), OtError> {
    match (component, other) {
        (Component::Insert { position, text }, _) => {
            dest.append(Component::insert(
                other.transform_position(*position, side.inserts_after()),
                text.clone(),
            ));
        }

        (
            Component::Delete { position, text },
            Component::Insert {
                position: other_position,
                ..
            },
        ) => {
            let mut remaining = text.as_str();

            if position < other_position {
                let (before, after) = split_at_char(remaining, other_position - position);
                dest.append(Component::delete(*position, before));
                remaining = after;
            }

            if !remaining.is_empty() {
                dest.append(Component::delete(*position + other.len(), remaining));
            }
        }

        (
            Component::Delete { position, text },
            Component::Delete {
                position: other_position,
                text: other_text,
            },
        ) => {
            if *position >= other.end() {
                dest.append(Component::delete(*position - other.len(), text.clone()));
            } else if component.end() <= *other_position {
                dest.append(component.clone());
            } else {
                let intersection_start = (*position).max(*other_position);
                let intersection_end = component.end().min(other.end());

                let intersection = char_slice(
                    text,
                    intersection_start - position,
                    intersection_end - position,
                );
                let other_intersection = char_slice(
                    other_text,
                    intersection_start - other_position,
                    intersection_end - other_position,
                );

                if intersection != other_intersection {
                    return Err(OtError::ConflictingDelete {
                        position: intersection_start,
                        left: intersection.to_owned(),
                        right: other_intersection.to_owned(),
                    });
                }

                let mut surviving = String::new();
                if position < other_position {
                    surviving.push_str(char_slice(text, 0, other_position - position));
                }
                if component.end() > other.end() {
                    surviving.push_str(char_slice(
                        text,
                        other.end() - position,
                        component.end() - position,
                    ));
                }

                if !surviving.is_empty() {
                    dest.append(Component::delete(
                        other.transform_position(*position, false),
                        surviving,
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Transforms `operation` so that it can be applied after `other`.
///
/// # Errors
///
/// Returns `OtError::ConflictingDelete` if the two operations delete
/// different text in an overlapping region.
pub fn transform(
    operation: &Operation,
    other: &Operation,
    side: Side,
) -> Result<Operation, OtError> {
    if other.is_empty() {
        return Ok(operation.clone());
    }

    if operation.len() == 1 && other.len() == 1 {
        let mut result = Operation::default();
        transform_component(&mut result, &operation[0], &other[0], side)?;
        return Ok(result);
    }

    match side {
        Side::Left => Ok(transform_both(operation, other)?.0),
        Side::Right => Ok(transform_both(other, operation)?.1),
    }
}

/// Transforms two concurrent operations against each other, returning
/// `(left', right')` such that `right'` applies after `left` and `left'`
/// applies after `right`, and both orders produce the same text. Ties between
/// inserts at the same position go to `left`.
///
/// # Errors
///
/// Returns `OtError::ConflictingDelete` if the two operations delete
/// different text in an overlapping region.
pub fn transform_both(
    left: &Operation,
    right: &Operation,
) -> Result<(Operation, Operation), OtError> {
    let mut stack = vec![Frame::new(left.clone(), right.iter().cloned().collect())];

    loop {
        let Some(top) = stack.last_mut() else {
            unreachable!("the root frame is only popped when returning");
        };

        if let Some(right_component) = top.right.pop_front() {
            match step(&top.left, right_component)? {
                Step::Done {
                    left,
                    right_component,
                } => {
                    top.left = left;
                    if let Some(right_component) = right_component {
                        top.transformed_right.append(right_component);
                    }
                }
                Step::Split {
                    transformed_left,
                    remaining_left,
                    pieces,
                } => {
                    top.transformed_left = Some(transformed_left);
                    stack.push(Frame::new(remaining_left, pieces));
                }
            }

            continue;
        }

        let Some(finished) = stack.pop() else {
            unreachable!("the stack cannot be empty here");
        };

        let Some(parent) = stack.last_mut() else {
            return Ok((finished.left, finished.transformed_right));
        };

        let mut left = parent.transformed_left.take().unwrap_or_default();
        for component in finished.left {
            left.append(component);
        }
        parent.left = left;

        for component in finished.transformed_right {
            parent.transformed_right.append(component);
        }
    }
}

/// Transforms a left operation against a queue of right components, one
/// component at a time. When a right component splits, the pieces are
/// transformed against the rest of the left operation in a child frame.
struct Frame {
    left: Operation,
    right: VecDeque<Component>,
    transformed_right: Operation,

    /// The part of `left` already transformed against the component whose
    /// split created the child frame above this one.
    transformed_left: Option<Operation>,
}

impl Frame {
    fn new(left: Operation, right: VecDeque<Component>) -> Self {
        Self {
            left,
            right,
            transformed_right: Operation::default(),
            transformed_left: None,
        }
    }
}

enum Step {
    /// Every left component was transformed against the right component,
    /// which either survived (possibly moved) or got eliminated.
    Done {
        left: Operation,
        right_component: Option<Component>,
    },

    /// The right component split into `pieces` against one of the left
    /// components; `remaining_left` still needs to see all the pieces.
    Split {
        transformed_left: Operation,
        remaining_left: Operation,
        pieces: VecDeque<Component>,
    },
}

fn step(left: &Operation, mut right_component: Component) -> Result<Step, OtError> {
    let mut transformed_left = Operation::default();

    for (index, left_component) in left.iter().enumerate() {
        transform_component(
            &mut transformed_left,
            left_component,
            &right_component,
            Side::Left,
        )?;

        let mut pieces = Operation::default();
        transform_component(&mut pieces, &right_component, left_component, Side::Right)?;

        let remaining_left = &left.components()[index + 1..];

        if pieces.len() > 1 {
            return Ok(Step::Split {
                transformed_left,
                remaining_left: Operation::new(remaining_left.to_vec()),
                pieces: pieces.into_iter().collect(),
            });
        }

        match pieces.into_iter().next() {
            Some(piece) => right_component = piece,
            None => {
                for component in remaining_left {
                    transformed_left.append(component.clone());
                }

                return Ok(Step::Done {
                    left: transformed_left,
                    right_component: None,
                });
            }
        }
    }

    Ok(Step::Done {
        left: transformed_left,
        right_component: Some(right_component),
    })
}
