//! Common utility functions

pub mod validation;

pub use validation::{validators, Validate, ValidationError, ValidationErrors};
