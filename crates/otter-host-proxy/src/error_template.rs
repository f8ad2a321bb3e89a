//! User-visible error message templates.
//!
//! Scripts observe these strings verbatim, so they must not be reworded.

use std::fmt::Display;

use crate::error::ProxyError;

/// `Invalid index : {index}`
pub fn range_error_invalid_index(index: i32) -> ProxyError {
    ProxyError::range_error(format!("Invalid index : {index}"))
}

/// `Start {start} is out of range`
pub fn range_error_start_is_out_of_range(start: i64) -> ProxyError {
    ProxyError::range_error(format!("Start {start} is out of range"))
}

/// `Reduce of empty array with no initial value`
pub fn type_error_reduce_of_empty_array_with_no_initial_value() -> ProxyError {
    ProxyError::type_error("Reduce of empty array with no initial value")
}

/// `{value} is not a function`
pub fn type_error_value_is_not_a_function(value: impl Display) -> ProxyError {
    ProxyError::type_error(format!("{value} is not a function"))
}
