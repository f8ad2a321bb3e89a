//! Default `toJSON` / `valueOf` for primitive wrapper targets

use std::sync::LazyLock;

use crate::convert::primitive_to_script;
use crate::engine::ScriptEngine;
use crate::error::{ProxyError, ProxyResult};
use crate::host::{HostValue, PrimitiveType};
use crate::polyfill::{PolyfillFunction, PolyfillRegistry, bind};
use crate::value::ScriptValue;

static REGISTRIES: LazyLock<[PolyfillRegistry; 10]> = LazyLock::new(|| {
    PrimitiveType::ALL.map(|primitive| {
        PolyfillRegistry::new(
            primitive.class_name(),
            &[("toJSON", to_json), ("valueOf", value_of)],
        )
    })
});

/// Registry for one wrapper type
pub fn registry(primitive: PrimitiveType) -> &'static PolyfillRegistry {
    &REGISTRIES[primitive as usize]
}

/// Polyfill for `name` on a `primitive` wrapper, if any
pub fn get_function(primitive: PrimitiveType, name: &str) -> Option<PolyfillFunction> {
    registry(primitive).get_function(name)
}

fn narrowest(target: &HostValue) -> ProxyResult<ScriptValue> {
    let value = primitive_to_script(target);
    debug_assert!(value.is_some(), "primitive polyfill bound to {target}");
    value.ok_or_else(|| ProxyError::internal(format!("Target {target} must be a primitive")))
}

fn to_json(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toJSON", |_engine, target, _this, _args| narrowest(target))
}

fn value_of(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "valueOf", |engine, target, _this, _args| {
        engine.to_script_value(target)
    })
}
