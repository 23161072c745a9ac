mod component;
mod operation;
mod operation_type;
mod ot_error;
mod raw_component;
mod transform;

pub use component::Component;
pub use operation::Operation;
pub use operation_type::{OperationType, TextType};
pub use ot_error::OtError;
pub use raw_component::{RawComponent, RawOperation, check_component, check_operation};
pub use transform::{transform, transform_both, transform_component};
