pub mod char_index;
pub mod side;
