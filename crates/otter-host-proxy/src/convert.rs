//! Default host ↔ script marshalling and argument helpers
//!
//! Primitive wrappers map to the narrowest script primitive; host objects
//! cross as proxies and proxies unwrap back to their target. Script arrays
//! become host lists; other script objects are carried opaquely.

use crate::descriptor::ClassDescriptorCache;
use crate::error::ProxyResult;
use crate::error_template;
use crate::handler::ProxyHandler;
use crate::host::{HostObject, HostValue};
use crate::value::ScriptValue;

/// Narrowest script primitive for a host primitive; `None` for anything else
pub fn primitive_to_script(value: &HostValue) -> Option<ScriptValue> {
    Some(match value {
        HostValue::Null => ScriptValue::Null,
        HostValue::Boolean(b) => ScriptValue::Boolean(*b),
        HostValue::Byte(v) => ScriptValue::Integer(i32::from(*v)),
        HostValue::Short(v) => ScriptValue::Integer(i32::from(*v)),
        HostValue::Integer(v) => ScriptValue::Integer(*v),
        HostValue::Long(v) => ScriptValue::Long(*v),
        HostValue::Float(v) => ScriptValue::Double(f64::from(*v)),
        HostValue::Double(v) => ScriptValue::Double(*v),
        HostValue::Character(c) => ScriptValue::String(c.to_string()),
        HostValue::BigInteger(v) => ScriptValue::BigInt(v.clone()),
        HostValue::String(s) => ScriptValue::String(s.clone()),
        HostValue::Object(_) | HostValue::Script(_) => return None,
    })
}

/// Host → script: primitives by value, objects as proxies
pub fn to_script_value(cache: &ClassDescriptorCache, value: &HostValue) -> ProxyResult<ScriptValue> {
    if let Some(primitive) = primitive_to_script(value) {
        return Ok(primitive);
    }
    match value {
        HostValue::Script(script) => Ok(script.clone()),
        other => Ok(ScriptValue::Proxy(ProxyHandler::new(cache, other.clone())?)),
    }
}

/// Script → host: primitives by value, proxies unwrap, arrays copy into a list
pub fn to_host_value(value: &ScriptValue) -> HostValue {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
        ScriptValue::Boolean(b) => HostValue::Boolean(*b),
        ScriptValue::Integer(v) => HostValue::Integer(*v),
        ScriptValue::Long(v) => HostValue::Long(*v),
        ScriptValue::Double(v) => HostValue::Double(*v),
        ScriptValue::BigInt(v) => HostValue::BigInteger(v.clone()),
        ScriptValue::String(s) => HostValue::String(s.clone()),
        ScriptValue::Proxy(handler) => handler.target().clone(),
        ScriptValue::Array(array) => HostValue::Object(HostObject::list(
            array.to_vec().iter().map(to_host_value).collect(),
        )),
        ScriptValue::Symbol(_) | ScriptValue::Object(_) | ScriptValue::Function(_) => {
            HostValue::Script(value.clone())
        }
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Argument at `index`, or `undefined` when missing
pub fn arg_or_undefined(args: &[ScriptValue], index: usize) -> ScriptValue {
    args.get(index).cloned().unwrap_or(ScriptValue::Undefined)
}

/// Argument narrowed to `i32`; missing or `undefined` yields `default`
pub fn arg_as_int(args: &[ScriptValue], index: usize, default: i32) -> i32 {
    match args.get(index) {
        None | Some(ScriptValue::Undefined) => default,
        Some(value) => value.as_int(),
    }
}

/// Argument if it is callable
pub fn arg_as_function(args: &[ScriptValue], index: usize) -> Option<&ScriptValue> {
    args.get(index).filter(|value| value.is_function())
}

/// Argument if it is callable, otherwise `{value} is not a function`
pub fn arg_as_function_with_error(args: &[ScriptValue], index: usize) -> ProxyResult<&ScriptValue> {
    match args.get(index) {
        Some(value) if value.is_function() => Ok(value),
        Some(value) => Err(error_template::type_error_value_is_not_a_function(value)),
        None => Err(error_template::type_error_value_is_not_a_function(
            ScriptValue::Undefined,
        )),
    }
}

/// Argument if it is object-like, otherwise `undefined`; used for `thisArg`
pub fn arg_as_object(args: &[ScriptValue], index: usize) -> ScriptValue {
    match args.get(index) {
        Some(value) if value.is_object() => value.clone(),
        _ => ScriptValue::Undefined,
    }
}

/// Script number for a length or index
pub fn index_value(index: usize) -> ScriptValue {
    ScriptValue::Integer(i32::try_from(index).unwrap_or(i32::MAX))
}
