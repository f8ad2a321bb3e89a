//! # Otter Host Proxy
//!
//! Exposes host objects to an embedded script engine through proxy traps.
//!
//! ## Pieces
//!
//! - **Trap dispatcher**: [`ProxyHandler`] answers `get`, `has`, `set`,
//!   `deleteProperty` and `ownKeys` for one host target
//! - **Class metadata cache**: [`ClassDescriptorCache`] builds one
//!   [`ClassDescriptor`] per class and shares it across threads
//! - **Polyfills**: `Array.prototype` / `Set.prototype` behavior for host
//!   lists and sets, `toJSON` / `valueOf` for primitive wrappers
//! - **Converters**: iterator objects and `Symbol.toPrimitive` for host values
//!
//! The engine itself is abstracted behind [`ScriptEngine`]; [`DirectEngine`]
//! runs native callables in-process.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod convert;
pub mod converter;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod error_template;
pub mod handler;
pub mod host;
pub mod polyfill;
pub mod value;

pub use config::ProxyConfig;
pub use converter::{IterationKind, SymbolIterableConverter, SymbolToPrimitiveConverter};
pub use descriptor::{ClassDescriptor, ClassDescriptorCache, CollectionKind};
pub use engine::{DirectEngine, ScopedValue, ScriptEngine};
pub use error::{ProxyError, ProxyResult};
pub use handler::{ProxyHandler, TrapBinding};
pub use host::{
    ComponentType, HostClass, HostClassBuilder, HostData, HostField, HostMethod, HostObject,
    HostValue, PrimitiveType,
};
pub use polyfill::{PolyfillFunction, PolyfillRegistry};
pub use value::{NativeFunction, PropertyKey, ScriptArray, ScriptObject, ScriptValue, Symbol};
