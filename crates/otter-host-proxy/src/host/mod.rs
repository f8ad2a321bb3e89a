//! Host object model
//!
//! Host objects are reached reflectively: every value has a runtime
//! [`HostClass`] that lists the fields and methods a script may use.

mod builtins;
pub mod class;
pub mod object;
pub mod value;

pub use class::{ComponentType, HostClass, HostClassBuilder, HostField, HostMethod, PrimitiveType};
pub use object::{HostData, HostObject};
pub use value::HostValue;
