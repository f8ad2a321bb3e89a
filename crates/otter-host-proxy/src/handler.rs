//! Proxy trap dispatcher
//!
//! A [`ProxyHandler`] answers the `get`, `has`, `set`, `deleteProperty` and
//! `ownKeys` traps for one host target. Each trap walks an ordered list of
//! resolvers; the first one that produces an answer wins.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexSet;
use tracing::trace;

use crate::convert::{arg_or_undefined, index_value};
use crate::converter::{SymbolIterableConverter, SymbolToPrimitiveConverter};
use crate::descriptor::{ClassDescriptor, ClassDescriptorCache, CollectionKind};
use crate::engine::ScriptEngine;
use crate::error::{ProxyError, ProxyResult};
use crate::host::{ComponentType, HostData, HostValue};
use crate::polyfill::{self, PolyfillFunction};
use crate::value::{NativeFunction, ScriptObject, ScriptValue};

type GetResolver =
    fn(&ProxyHandler, &dyn ScriptEngine, &ScriptValue) -> ProxyResult<Option<ScriptValue>>;

const GET_RESOLVERS: [(&str, GetResolver); 6] = [
    ("collection", ProxyHandler::get_from_collection),
    ("field", ProxyHandler::get_from_field),
    ("method", ProxyHandler::get_from_method),
    ("symbol", ProxyHandler::get_from_symbol),
    ("getter", ProxyHandler::get_from_getter),
    ("polyfill", ProxyHandler::get_from_polyfill),
];

/// A trap name and the engine callable implementing it
#[derive(Debug, Clone)]
pub struct TrapBinding {
    name: &'static str,
    function: ScriptValue,
}

impl TrapBinding {
    /// Trap name as the engine's Proxy API spells it
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The callable
    pub fn function(&self) -> &ScriptValue {
        &self.function
    }
}

/// Trap handler for one proxied host value
pub struct ProxyHandler {
    target: HostValue,
    descriptor: Arc<ClassDescriptor>,
    unique_keys: OnceLock<IndexSet<String>>,
    trap_functions: OnceLock<Vec<TrapBinding>>,
}

impl ProxyHandler {
    /// Handler for `target`, described through `cache`
    pub fn new(cache: &ClassDescriptorCache, target: HostValue) -> ProxyResult<Arc<Self>> {
        if target.is_null() {
            return Err(ProxyError::internal("Proxy target must not be null"));
        }
        let descriptor = cache.descriptor_for(&target)?;
        Ok(Arc::new(Self {
            target,
            descriptor,
            unique_keys: OnceLock::new(),
            trap_functions: OnceLock::new(),
        }))
    }

    /// Handler using the engine's descriptor cache
    pub fn for_engine(engine: &dyn ScriptEngine, target: HostValue) -> ProxyResult<Arc<Self>> {
        Self::new(engine.descriptor_cache(), target)
    }

    /// Proxied value
    pub fn target(&self) -> &HostValue {
        &self.target
    }

    /// Capability record of the target's class
    pub fn descriptor(&self) -> &Arc<ClassDescriptor> {
        &self.descriptor
    }

    // ========================================================================
    // get
    // ========================================================================

    /// The `get` trap
    pub fn get(&self, engine: &dyn ScriptEngine, property: &ScriptValue) -> ProxyResult<ScriptValue> {
        for (resolver, resolve) in GET_RESOLVERS {
            if let Some(value) = resolve(self, engine, property)? {
                trace!(resolver, %property, "get resolved");
                return Ok(value);
            }
        }
        trace!(%property, target = %self.target, "get found nothing");
        Ok(ScriptValue::Undefined)
    }

    fn get_from_collection(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let (Some(object), Some(name)) = (self.target.as_object(), property_name(property)) else {
            return Ok(None);
        };
        let element = match object.data() {
            HostData::Array(items) => {
                if name == "length" {
                    return Ok(Some(index_value(items.read().len())));
                }
                parse_index(&name).and_then(|index| items.read().get(index).cloned())
            }
            HostData::List(items) => parse_index(&name).and_then(|index| items.read().get(index).cloned()),
            HostData::Map(entries) => entries
                .read()
                .get(&HostValue::String(name.into_owned()))
                .cloned(),
            _ => None,
        };
        element.map(|element| engine.to_script_value(&element)).transpose()
    }

    fn get_from_field(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let Some(field) = property_name(property).and_then(|name| self.descriptor.field(&name)) else {
            return Ok(None);
        };
        engine.to_script_value(&field.read(&self.target)).map(Some)
    }

    fn get_from_method(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let Some(name) = property_name(property) else {
            return Ok(None);
        };
        if self.descriptor.is_override(&name) {
            return Ok(None);
        }
        let Some(group) = self.descriptor.method(&name) else {
            return Ok(None);
        };
        let group = group.clone();
        let receiver = self.target.clone();
        let function = NativeFunction::new(&name, move |engine, _this, args| {
            let args = args
                .iter()
                .map(|arg| engine.to_host_value(arg))
                .collect::<ProxyResult<Vec<_>>>()?;
            let method = group.select(args.len()).ok_or_else(|| {
                ProxyError::type_error(format!(
                    "No overload of {}() accepts {} arguments",
                    group.name(),
                    args.len()
                ))
            })?;
            let result = if method.is_static() {
                method.invoke(&HostValue::Null, &args)?
            } else {
                method.invoke(&receiver, &args)?
            };
            engine.to_script_value(&result)
        });
        engine.create_function(function).map(Some)
    }

    fn get_from_symbol(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let ScriptValue::Symbol(symbol) = property else {
            return Ok(None);
        };
        if symbol.is_to_primitive() {
            return SymbolToPrimitiveConverter::new(self.target.clone())
                .to_function(engine)
                .map(Some);
        }
        if symbol.is_iterator() && SymbolIterableConverter::supports(&self.target) {
            return SymbolIterableConverter::new(self.target.clone())
                .to_function(engine)
                .map(Some);
        }
        Ok(None)
    }

    fn get_from_getter(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let Some(getter) = property_name(property).and_then(|name| self.descriptor.getter(&name)) else {
            return Ok(None);
        };
        let value = getter.invoke(&self.target, &[])?;
        engine.to_script_value(&value).map(Some)
    }

    fn get_from_polyfill(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
    ) -> ProxyResult<Option<ScriptValue>> {
        let Some(function) = property_name(property).and_then(|name| self.polyfill(&name)) else {
            return Ok(None);
        };
        function(engine, &self.target).map(Some)
    }

    fn polyfill(&self, name: &str) -> Option<PolyfillFunction> {
        match self.descriptor.collection_kind() {
            CollectionKind::List => polyfill::list::get_function(name),
            CollectionKind::Set => polyfill::set::get_function(name),
            CollectionKind::None => self
                .descriptor
                .primitive_type()
                .and_then(|primitive| polyfill::primitive::get_function(primitive, name)),
            CollectionKind::Map | CollectionKind::Array => None,
        }
    }

    // ========================================================================
    // has
    // ========================================================================

    /// The `has` trap
    pub fn has(&self, engine: &dyn ScriptEngine, property: &ScriptValue) -> ProxyResult<bool> {
        Ok(self.has_from_collection(engine, property)?
            || self.has_from_regular(property)
            || self.has_from_generic(property))
    }

    fn has_from_collection(&self, engine: &dyn ScriptEngine, property: &ScriptValue) -> ProxyResult<bool> {
        let Some(object) = self.target.as_object() else {
            return Ok(false);
        };
        let index = property_name(property).and_then(|name| parse_index(&name));
        match object.data() {
            HostData::Map(entries) => {
                let key = engine.to_host_value(property)?;
                Ok(entries.read().contains_key(&key))
            }
            HostData::Set(values) => {
                let value = engine.to_host_value(property)?;
                Ok(values.read().contains(&value))
            }
            HostData::List(items) => {
                let value = engine.to_host_value(property)?;
                let items = items.read();
                Ok(items.contains(&value) || index.is_some_and(|index| index < items.len()))
            }
            HostData::Array(items) => Ok(index.is_some_and(|index| index < items.read().len())),
            HostData::Plain | HostData::Class(_) => Ok(false),
        }
    }

    fn has_from_regular(&self, property: &ScriptValue) -> bool {
        property_name(property).is_some_and(|name| {
            self.descriptor.field(&name).is_some()
                || self.descriptor.method(&name).is_some()
                || self.descriptor.getter(&name).is_some()
        })
    }

    fn has_from_generic(&self, property: &ScriptValue) -> bool {
        property_name(property).is_some_and(|name| self.polyfill(&name).is_some())
    }

    // ========================================================================
    // set
    // ========================================================================

    /// The `set` trap; `false` means the write was not accepted
    pub fn set(
        &self,
        engine: &dyn ScriptEngine,
        property: &ScriptValue,
        value: &ScriptValue,
    ) -> ProxyResult<bool> {
        let Some(name) = property_name(property) else {
            return Ok(false);
        };
        let value = engine.to_host_value(value)?;
        Ok(self.set_to_collection(&name, &value)
            || self.set_to_field(&name, &value)
            || self.set_to_setter(&name, &value)?)
    }

    fn set_to_collection(&self, name: &str, value: &HostValue) -> bool {
        let Some(object) = self.target.as_object() else {
            return false;
        };
        match object.data() {
            HostData::Array(items) => {
                let coerced = match object.component_type() {
                    Some(component) => component.coerce(value.clone()),
                    None => Some(value.clone()),
                };
                match (parse_index(name), coerced) {
                    (Some(index), Some(coerced)) => match items.write().get_mut(index) {
                        Some(slot) => {
                            *slot = coerced;
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
            HostData::List(items) => {
                let Some(index) = parse_index(name) else {
                    return false;
                };
                match items.write().get_mut(index) {
                    Some(slot) => {
                        *slot = value.clone();
                        true
                    }
                    None => false,
                }
            }
            HostData::Map(entries) => {
                entries
                    .write()
                    .insert(HostValue::String(name.to_string()), value.clone());
                true
            }
            HostData::Plain | HostData::Set(_) | HostData::Class(_) => false,
        }
    }

    fn set_to_field(&self, name: &str, value: &HostValue) -> bool {
        self.descriptor
            .field(name)
            .is_some_and(|field| field.write(&self.target, value.clone()))
    }

    fn set_to_setter(&self, name: &str, value: &HostValue) -> ProxyResult<bool> {
        let Some(setter) = self.descriptor.setter(name) else {
            return Ok(false);
        };
        setter.invoke(&self.target, std::slice::from_ref(value))?;
        Ok(true)
    }

    // ========================================================================
    // deleteProperty / ownKeys
    // ========================================================================

    /// The `deleteProperty` trap
    pub fn delete_property(&self, property: &ScriptValue) -> bool {
        let (Some(object), Some(name)) = (self.target.as_object(), property_name(property)) else {
            return false;
        };
        match object.data() {
            HostData::Array(items) => {
                if object.component_type().is_some_and(ComponentType::is_primitive) {
                    return false;
                }
                let Some(index) = parse_index(&name) else {
                    return false;
                };
                match items.write().get_mut(index) {
                    Some(slot) => {
                        *slot = HostValue::Null;
                        true
                    }
                    None => false,
                }
            }
            HostData::List(items) => {
                let Some(index) = parse_index(&name) else {
                    return false;
                };
                let mut items = items.write();
                if index < items.len() {
                    items.remove(index);
                    true
                } else {
                    false
                }
            }
            HostData::Map(entries) => {
                entries
                    .write()
                    .shift_remove(&HostValue::String(name.into_owned()));
                true
            }
            HostData::Plain | HostData::Set(_) | HostData::Class(_) => false,
        }
    }

    /// The `ownKeys` trap, as strings
    pub fn own_keys(&self) -> Vec<String> {
        let keys = self.target.as_object().and_then(|object| match object.data() {
            HostData::Map(entries) => Some(stringify_keys(entries.read().keys())),
            HostData::Set(values) => Some(stringify_keys(values.read().iter())),
            HostData::List(items) | HostData::Array(items) => {
                Some((0..items.read().len()).map(|index| index.to_string()).collect())
            }
            HostData::Plain | HostData::Class(_) => None,
        });
        keys.unwrap_or_else(|| self.unique_keys().iter().cloned().collect())
    }

    /// [`Self::own_keys`] as a script array
    pub fn own_keys_value(&self) -> ScriptValue {
        ScriptValue::array(self.own_keys().into_iter().map(ScriptValue::String).collect())
    }

    /// Snapshot of the target's key set, captured on first use and never refreshed.
    ///
    /// Maps contribute their keys and sets their values; other targets expose
    /// their public fields and getter-backed properties. [`Self::own_keys`]
    /// reads collection contents live and only falls back to this set for
    /// plain objects and class references.
    pub fn unique_keys(&self) -> &IndexSet<String> {
        self.unique_keys.get_or_init(|| {
            let captured = self.target.as_object().and_then(|object| match object.data() {
                HostData::Map(entries) => Some(stringify_keys(entries.read().keys())),
                HostData::Set(values) => Some(stringify_keys(values.read().iter())),
                _ => None,
            });
            match captured {
                Some(keys) => keys.into_iter().collect(),
                None => self
                    .descriptor
                    .fields()
                    .keys()
                    .cloned()
                    .chain(self.descriptor.getter_properties())
                    .collect(),
            }
        })
    }

    // ========================================================================
    // Trap bindings
    // ========================================================================

    /// The five trap callables, built on first use.
    ///
    /// Bindings hold the handler weakly; calling one after the handler has
    /// been dropped fails with an internal error.
    pub fn trap_functions(self: &Arc<Self>, engine: &dyn ScriptEngine) -> ProxyResult<&[TrapBinding]> {
        if let Some(bindings) = self.trap_functions.get() {
            return Ok(bindings.as_slice());
        }
        let bindings = self.build_trap_functions(engine)?;
        Ok(self.trap_functions.get_or_init(|| bindings).as_slice())
    }

    fn build_trap_functions(self: &Arc<Self>, engine: &dyn ScriptEngine) -> ProxyResult<Vec<TrapBinding>> {
        let weak = Arc::downgrade(self);
        Ok(vec![
            bind_trap(engine, &weak, "get", |handler, engine, args| {
                handler.get(engine, &arg_or_undefined(args, 1))
            })?,
            bind_trap(engine, &weak, "deleteProperty", |handler, _engine, args| {
                Ok(ScriptValue::Boolean(handler.delete_property(&arg_or_undefined(args, 1))))
            })?,
            bind_trap(engine, &weak, "has", |handler, engine, args| {
                handler
                    .has(engine, &arg_or_undefined(args, 1))
                    .map(ScriptValue::Boolean)
            })?,
            bind_trap(engine, &weak, "ownKeys", |handler, _engine, _args| {
                Ok(handler.own_keys_value())
            })?,
            bind_trap(engine, &weak, "set", |handler, engine, args| {
                handler
                    .set(engine, &arg_or_undefined(args, 1), &arg_or_undefined(args, 2))
                    .map(ScriptValue::Boolean)
            })?,
        ])
    }

    /// A script object carrying the trap bindings, ready to be used as the
    /// handler of a script-level Proxy
    pub fn to_handler_object(self: &Arc<Self>, engine: &dyn ScriptEngine) -> ProxyResult<ScriptValue> {
        let handler = ScriptObject::new();
        for binding in self.trap_functions(engine)? {
            handler.set(binding.name, binding.function.clone());
        }
        Ok(ScriptValue::Object(handler))
    }
}

impl fmt::Debug for ProxyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandler")
            .field("target", &self.target)
            .field("class", &self.descriptor.target_class().name())
            .field("static", &self.descriptor.is_static())
            .finish()
    }
}

fn bind_trap<F>(
    engine: &dyn ScriptEngine,
    handler: &Weak<ProxyHandler>,
    name: &'static str,
    body: F,
) -> ProxyResult<TrapBinding>
where
    F: Fn(&ProxyHandler, &dyn ScriptEngine, &[ScriptValue]) -> ProxyResult<ScriptValue>
        + Send
        + Sync
        + 'static,
{
    let handler = handler.clone();
    let function = engine.create_function(NativeFunction::new(name, move |engine, _this, args| {
        let handler = handler
            .upgrade()
            .ok_or_else(|| ProxyError::internal("Proxy handler has been released"))?;
        body(&*handler, engine, args)
    }))?;
    Ok(TrapBinding { name, function })
}

/// String form of a property key; symbols have none
fn property_name(property: &ScriptValue) -> Option<Cow<'_, str>> {
    match property {
        ScriptValue::String(name) => Some(Cow::Borrowed(name)),
        ScriptValue::Integer(_) | ScriptValue::Long(_) | ScriptValue::Double(_) => {
            Some(Cow::Owned(property.to_string()))
        }
        _ => None,
    }
}

/// Digit-only key as an index; keys that do not fit an `i32` are no match
fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<i32>().ok().and_then(|index| usize::try_from(index).ok())
}

fn stringify_keys<'a>(keys: impl Iterator<Item = &'a HostValue>) -> Vec<String> {
    keys.filter(|key| !key.is_null()).map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::engine::DirectEngine;
    use crate::host::HostObject;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("042"), Some(42));
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("1e3"), None);
        assert_eq!(parse_index("99999999999"), None);
    }

    #[test]
    fn test_null_target_is_rejected() {
        let cache = ClassDescriptorCache::new(ProxyConfig::default());
        assert!(ProxyHandler::new(&cache, HostValue::Null).is_err());
    }

    #[test]
    fn test_trap_functions_are_built_once() {
        let engine = DirectEngine::new();
        let handler =
            ProxyHandler::for_engine(&engine, HostObject::list(vec![1.into()]).into()).unwrap();
        let first = handler.trap_functions(&engine).unwrap().as_ptr();
        let second = handler.trap_functions(&engine).unwrap().as_ptr();
        assert_eq!(first, second);
        let names: Vec<&str> = handler
            .trap_functions(&engine)
            .unwrap()
            .iter()
            .map(TrapBinding::name)
            .collect();
        assert_eq!(names, vec!["get", "deleteProperty", "has", "ownKeys", "set"]);
    }

    #[test]
    fn test_released_handler_traps_fail() {
        let engine = DirectEngine::new();
        let handler =
            ProxyHandler::for_engine(&engine, HostObject::list(Vec::new()).into()).unwrap();
        let get = handler.trap_functions(&engine).unwrap()[0].function().clone();
        drop(handler);
        let err = engine
            .call_function(&get, &ScriptValue::Undefined, &[ScriptValue::Undefined, "length".into()])
            .unwrap_err();
        assert_eq!(err, ProxyError::internal("Proxy handler has been released"));
    }
}
