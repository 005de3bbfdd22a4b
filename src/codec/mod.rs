//! Wire formats built on top of the descriptor and dynamic-message model.
pub mod binary;
pub mod json;
