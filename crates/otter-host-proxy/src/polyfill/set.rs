//! `Set.prototype` polyfills for set-shaped host objects

use std::sync::LazyLock;

use crate::convert::{arg_as_function_with_error, arg_as_object, arg_or_undefined, index_value};
use crate::converter::{IterationKind, SymbolIterableConverter};
use crate::engine::{ScopedValue, ScriptEngine};
use crate::error::ProxyResult;
use crate::host::HostValue;
use crate::polyfill::{PolyfillFunction, PolyfillRegistry, bind, set_values};
use crate::value::{ScriptObject, ScriptValue};

static REGISTRY: LazyLock<PolyfillRegistry> = LazyLock::new(|| {
    PolyfillRegistry::new(
        "Set",
        &[
            ("add", add),
            ("clear", clear),
            ("delete", delete),
            ("entries", entries),
            ("forEach", for_each),
            ("has", has),
            ("keys", values),
            ("size", size),
            ("toJSON", to_json),
            ("toString", to_string),
            ("values", values),
        ],
    )
});

/// The set registry
pub fn registry() -> &'static PolyfillRegistry {
    &REGISTRY
}

/// Polyfill for `name`, if any
pub fn get_function(name: &str) -> Option<PolyfillFunction> {
    REGISTRY.get_function(name)
}

fn add(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "add", |engine, target, this, args| {
        let value = engine.to_host_value(&arg_or_undefined(args, 0))?;
        set_values(target)?.write().insert(value);
        Ok(this.clone())
    })
}

fn clear(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "clear", |_engine, target, _this, _args| {
        set_values(target)?.write().clear();
        Ok(ScriptValue::Undefined)
    })
}

fn delete(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "delete", |engine, target, _this, args| {
        let value = engine.to_host_value(&arg_or_undefined(args, 0))?;
        let removed = set_values(target)?.write().shift_remove(&value);
        Ok(ScriptValue::Boolean(removed))
    })
}

fn entries(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "entries", |engine, target, _this, _args| {
        SymbolIterableConverter::with_kind(target.clone(), IterationKind::Entries).to_iterator(engine)
    })
}

fn for_each(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "forEach", |engine, target, this, args| {
        let callback = arg_as_function_with_error(args, 0)?;
        let this_arg = arg_as_object(args, 1);
        let values: Vec<HostValue> = set_values(target)?.read().iter().cloned().collect();
        for value in &values {
            let value = engine.to_script_value(value)?;
            let result =
                engine.call_function(callback, &this_arg, &[value.clone(), value, this.clone()])?;
            drop(ScopedValue::new(engine, result));
        }
        Ok(ScriptValue::Undefined)
    })
}

fn has(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "has", |engine, target, _this, args| {
        let value = engine.to_host_value(&arg_or_undefined(args, 0))?;
        Ok(ScriptValue::Boolean(set_values(target)?.read().contains(&value)))
    })
}

fn size(_engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    Ok(index_value(set_values(target)?.read().len()))
}

fn to_json(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toJSON", |_engine, _target, _this, _args| {
        Ok(ScriptValue::Object(ScriptObject::new()))
    })
}

fn to_string(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toString", |_engine, _target, _this, _args| {
        Ok(ScriptValue::from("[object Set]"))
    })
}

fn values(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "values", |engine, target, _this, _args| {
        SymbolIterableConverter::with_kind(target.clone(), IterationKind::Values).to_iterator(engine)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DirectEngine;
    use crate::host::HostObject;

    fn call(engine: &DirectEngine, set: &HostValue, name: &str, args: &[ScriptValue]) -> ScriptValue {
        let function = get_function(name).unwrap()(engine, set).unwrap();
        engine
            .call_function(&function, &ScriptValue::Undefined, args)
            .unwrap()
    }

    #[test]
    fn test_add_delete_has() {
        let engine = DirectEngine::new();
        let set = HostValue::from(HostObject::set([HostValue::Integer(1)]));
        call(&engine, &set, "add", &["a".into()]);
        call(&engine, &set, "add", &["a".into()]);
        assert_eq!(size(&engine, &set).unwrap(), ScriptValue::Integer(2));
        assert_eq!(call(&engine, &set, "has", &["a".into()]), ScriptValue::Boolean(true));
        assert_eq!(call(&engine, &set, "delete", &[1.into()]), ScriptValue::Boolean(true));
        assert_eq!(call(&engine, &set, "delete", &[1.into()]), ScriptValue::Boolean(false));
        assert_eq!(size(&engine, &set).unwrap(), ScriptValue::Integer(1));
    }

    #[test]
    fn test_to_string_and_to_json() {
        let engine = DirectEngine::new();
        let set = HostValue::from(HostObject::set([HostValue::Integer(1)]));
        assert_eq!(call(&engine, &set, "toString", &[]), ScriptValue::from("[object Set]"));
        let json = call(&engine, &set, "toJSON", &[]);
        assert!(json.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_keys_alias_values() {
        assert_eq!(
            registry().get_function("keys").map(|f| f as usize),
            registry().get_function("values").map(|f| f as usize)
        );
    }
}
