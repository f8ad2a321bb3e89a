//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use otter_host_proxy::{
    DirectEngine, HostObject, HostValue, ProxyHandler, ProxyResult, ScriptEngine, ScriptValue,
};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> DirectEngine {
    init_tracing();
    DirectEngine::new()
}

pub fn ints(values: &[i32]) -> Vec<HostValue> {
    values.iter().copied().map(HostValue::Integer).collect()
}

pub fn script_ints(values: &[i32]) -> Vec<ScriptValue> {
    values.iter().copied().map(ScriptValue::Integer).collect()
}

/// A host list and a proxy over it
pub fn list_proxy(engine: &DirectEngine, items: Vec<HostValue>) -> (HostObject, ScriptValue) {
    let list = HostObject::list(items);
    let proxy = engine.to_script_value(&list.clone().into()).unwrap();
    (list, proxy)
}

pub fn handler(proxy: &ScriptValue) -> &Arc<ProxyHandler> {
    proxy.as_proxy().expect("proxy value")
}

/// `proxy[name](...args)` as the engine would run it
pub fn call(
    engine: &DirectEngine,
    proxy: &ScriptValue,
    name: &str,
    args: &[ScriptValue],
) -> ProxyResult<ScriptValue> {
    let function = handler(proxy).get(engine, &ScriptValue::from(name))?;
    engine.call_function(&function, proxy, args)
}

pub fn get(engine: &DirectEngine, proxy: &ScriptValue, property: &str) -> ScriptValue {
    handler(proxy)
        .get(engine, &ScriptValue::from(property))
        .unwrap()
}

pub fn list_contents(list: &HostObject) -> Vec<HostValue> {
    list.as_list().expect("list").read().clone()
}

/// Elements of a script array
pub fn array_contents(value: &ScriptValue) -> Vec<ScriptValue> {
    value.as_array().expect("array").to_vec()
}

pub fn callback<F>(body: F) -> ScriptValue
where
    F: Fn(&[ScriptValue]) -> ScriptValue + Send + Sync + 'static,
{
    ScriptValue::function("callback", move |_engine, _this, args| Ok(body(args)))
}

/// Drain a script iterator object
pub fn drain(engine: &DirectEngine, iterator: &ScriptValue) -> Vec<ScriptValue> {
    let next = iterator.as_object().expect("iterator").get("next").expect("next");
    let mut values = Vec::new();
    loop {
        let result = engine.call_function(&next, iterator, &[]).unwrap();
        let result = result.as_object().expect("iterator result");
        if result.get("done").expect("done").is_truthy() {
            break;
        }
        values.push(result.get("value").expect("value"));
    }
    values
}
