#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Component, OtError};

/// The untyped wire form of a component: a position and an insert (`i`) or
/// delete (`d`) payload. Nothing about it is trusted until it passes
/// [`check_component`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawComponent {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub p: Option<i64>,

    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub i: Option<String>,

    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub d: Option<String>,
}

impl RawComponent {
    #[must_use]
    pub fn insert(p: i64, text: impl Into<String>) -> Self {
        Self {
            p: Some(p),
            i: Some(text.into()),
            d: None,
        }
    }

    #[must_use]
    pub fn delete(p: i64, text: impl Into<String>) -> Self {
        Self {
            p: Some(p),
            i: None,
            d: Some(text.into()),
        }
    }
}

/// Either a single bare component or a list of them, as accepted by
/// `Operation::normalize`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOperation {
    Many(Vec<RawComponent>),
    Single(RawComponent),
}

impl From<RawComponent> for RawOperation {
    fn from(component: RawComponent) -> Self { RawOperation::Single(component) }
}

impl From<Vec<RawComponent>> for RawOperation {
    fn from(components: Vec<RawComponent>) -> Self { RawOperation::Many(components) }
}

impl IntoIterator for RawOperation {
    type Item = RawComponent;
    type IntoIter = std::vec::IntoIter<RawComponent>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            RawOperation::Single(component) => vec![component].into_iter(),
            RawOperation::Many(components) => components.into_iter(),
        }
    }
}

/// Checks that the component has a non-negative position and exactly one
/// of an insert or a delete payload.
///
/// # Errors
///
/// Returns `OtError::InvalidComponent` describing the first problem found.
pub fn check_component(component: &RawComponent) -> Result<(), OtError> {
    let Some(position) = component.p else {
        return Err(OtError::invalid_component("component missing position field"));
    };

    if component.i.is_some() == component.d.is_some() {
        return Err(OtError::invalid_component("component needs an i or d field"));
    }

    if position < 0 {
        return Err(OtError::invalid_component(format!(
            "position cannot be negative (got {position})"
        )));
    }

    Ok(())
}

/// Checks every component of an operation.
///
/// # Errors
///
/// Returns `OtError::InvalidOperation` pointing at the first malformed
/// component.
pub fn check_operation(components: &[RawComponent]) -> Result<(), OtError> {
    for (index, component) in components.iter().enumerate() {
        check_component(component).map_err(|error| OtError::InvalidOperation {
            index,
            source: Box::new(error),
        })?;
    }

    Ok(())
}

impl TryFrom<RawComponent> for Component {
    type Error = OtError;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        check_component(&raw)?;

        let position = raw
            .p
            .and_then(|p| usize::try_from(p).ok())
            .ok_or_else(|| OtError::invalid_component("position does not fit in usize"))?;

        match (raw.i, raw.d) {
            (Some(text), None) => Ok(Component::insert(position, text)),
            (None, Some(text)) => Ok(Component::delete(position, text)),
            _ => Err(OtError::invalid_component("component needs an i or d field")),
        }
    }
}

impl From<Component> for RawComponent {
    fn from(component: Component) -> Self {
        let p = i64::try_from(component.position()).unwrap_or(i64::MAX);

        match component {
            Component::Insert { text, .. } => RawComponent::insert(p, text),
            Component::Delete { text, .. } => RawComponent::delete(p, text),
        }
    }
}
