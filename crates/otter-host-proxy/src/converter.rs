//! Iterable and symbol converters
//!
//! [`SymbolIterableConverter`] turns a host collection into a script iterator
//! over a snapshot of its contents; [`SymbolToPrimitiveConverter`] answers
//! `Symbol.toPrimitive`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::convert::primitive_to_script;
use crate::engine::ScriptEngine;
use crate::error::ProxyResult;
use crate::host::{HostData, HostValue};
use crate::value::{NativeFunction, ScriptObject, ScriptValue, Symbol};

/// What an iterator yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    /// Indices for sequences, keys for maps, values for sets
    Keys,
    /// Elements
    Values,
    /// `[key, value]` pairs (`[v, v]` for sets)
    Entries,
}

#[derive(Debug)]
enum IteratorItem {
    Value(HostValue),
    Pair(HostValue, HostValue),
}

/// Builds single-pass iterators over host collections.
///
/// Contents are captured when the iterator is created; later mutation of the
/// collection is not observed.
#[derive(Debug, Clone)]
pub struct SymbolIterableConverter {
    target: HostValue,
    kind: IterationKind,
}

impl SymbolIterableConverter {
    /// Default iteration: entries for maps, values otherwise
    pub fn new(target: HostValue) -> Self {
        let kind = match target.as_object().map(|object| object.data()) {
            Some(HostData::Map(_)) => IterationKind::Entries,
            _ => IterationKind::Values,
        };
        Self { target, kind }
    }

    /// Explicit iteration kind
    pub fn with_kind(target: HostValue, kind: IterationKind) -> Self {
        Self { target, kind }
    }

    /// Can `target` be iterated?
    pub fn supports(target: &HostValue) -> bool {
        target.as_object().is_some_and(|object| {
            matches!(
                object.data(),
                HostData::List(_) | HostData::Set(_) | HostData::Map(_) | HostData::Array(_)
            )
        })
    }

    fn snapshot(&self) -> Vec<IteratorItem> {
        let Some(object) = self.target.as_object() else {
            return Vec::new();
        };
        match object.data() {
            HostData::List(items) | HostData::Array(items) => {
                let items = items.read();
                match self.kind {
                    IterationKind::Keys => (0..items.len())
                        .map(|index| IteratorItem::Value(index_key(index)))
                        .collect(),
                    IterationKind::Values => {
                        items.iter().cloned().map(IteratorItem::Value).collect()
                    }
                    IterationKind::Entries => items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| IteratorItem::Pair(index_key(index), item.clone()))
                        .collect(),
                }
            }
            HostData::Set(values) => {
                let values = values.read();
                match self.kind {
                    IterationKind::Keys | IterationKind::Values => {
                        values.iter().cloned().map(IteratorItem::Value).collect()
                    }
                    IterationKind::Entries => values
                        .iter()
                        .map(|value| IteratorItem::Pair(value.clone(), value.clone()))
                        .collect(),
                }
            }
            HostData::Map(entries) => {
                let entries = entries.read();
                match self.kind {
                    IterationKind::Keys => entries.keys().cloned().map(IteratorItem::Value).collect(),
                    IterationKind::Values => {
                        entries.values().cloned().map(IteratorItem::Value).collect()
                    }
                    IterationKind::Entries => entries
                        .iter()
                        .map(|(key, value)| IteratorItem::Pair(key.clone(), value.clone()))
                        .collect(),
                }
            }
            HostData::Plain | HostData::Class(_) => Vec::new(),
        }
    }

    /// Snapshot the target now and return an iterator object over it
    pub fn to_iterator(&self, engine: &dyn ScriptEngine) -> ProxyResult<ScriptValue> {
        let state = Arc::new(Mutex::new(self.snapshot().into_iter()));
        let iterator = ScriptObject::new();
        let next = NativeFunction::new("next", move |engine, _this, _args| {
            let item = state.lock().next();
            iterator_result(engine, item)
        });
        iterator.set("next", engine.create_function(next)?);
        let itself = NativeFunction::new("[Symbol.iterator]", |_engine, this, _args| Ok(this.clone()));
        iterator.set(Symbol::iterator(), engine.create_function(itself)?);
        Ok(ScriptValue::Object(iterator))
    }

    /// A function that creates a fresh iterator each time it is called,
    /// suitable as the value of `[Symbol.iterator]`
    pub fn to_function(&self, engine: &dyn ScriptEngine) -> ProxyResult<ScriptValue> {
        let converter = self.clone();
        engine.create_function(NativeFunction::new(
            "[Symbol.iterator]",
            move |engine, _this, _args| converter.to_iterator(engine),
        ))
    }
}

fn index_key(index: usize) -> HostValue {
    HostValue::Integer(i32::try_from(index).unwrap_or(i32::MAX))
}

fn iterator_result(engine: &dyn ScriptEngine, item: Option<IteratorItem>) -> ProxyResult<ScriptValue> {
    let (value, done) = match item {
        None => (ScriptValue::Undefined, true),
        Some(IteratorItem::Value(value)) => (engine.to_script_value(&value)?, false),
        Some(IteratorItem::Pair(key, value)) => (
            ScriptValue::array(vec![
                engine.to_script_value(&key)?,
                engine.to_script_value(&value)?,
            ]),
            false,
        ),
    };
    let result = ScriptObject::new();
    result.set("value", value);
    result.set("done", ScriptValue::Boolean(done));
    Ok(ScriptValue::Object(result))
}

/// Answers `Symbol.toPrimitive` for a host value
#[derive(Debug, Clone)]
pub struct SymbolToPrimitiveConverter {
    target: HostValue,
}

impl SymbolToPrimitiveConverter {
    /// Converter for `target`
    pub fn new(target: HostValue) -> Self {
        Self { target }
    }

    /// Primitive value of a wrapper, string form of anything else
    pub fn to_primitive(&self) -> ScriptValue {
        primitive_to_script(&self.target)
            .unwrap_or_else(|| ScriptValue::String(self.target.to_string()))
    }

    /// The `[Symbol.toPrimitive](hint)` function
    pub fn to_function(&self, engine: &dyn ScriptEngine) -> ProxyResult<ScriptValue> {
        let converter = self.clone();
        engine.create_function(NativeFunction::new(
            "[Symbol.toPrimitive]",
            move |_engine, _this, _args| Ok(converter.to_primitive()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DirectEngine;
    use crate::host::HostObject;

    fn drain(engine: &DirectEngine, iterator: &ScriptValue) -> Vec<ScriptValue> {
        let next = iterator.as_object().unwrap().get("next").unwrap();
        let mut values = Vec::new();
        loop {
            let result = engine.call_function(&next, iterator, &[]).unwrap();
            let result = result.as_object().unwrap();
            if result.get("done").unwrap().is_truthy() {
                assert!(result.get("value").unwrap().is_undefined());
                break;
            }
            values.push(result.get("value").unwrap());
        }
        values
    }

    #[test]
    fn test_iterator_is_snapshot_and_single_pass() {
        let engine = DirectEngine::new();
        let list = HostObject::list(vec![1.into(), 2.into()]);
        let iterator = SymbolIterableConverter::new(list.clone().into())
            .to_iterator(&engine)
            .unwrap();
        list.as_list().unwrap().write().push(3.into());
        assert_eq!(
            drain(&engine, &iterator),
            vec![ScriptValue::Integer(1), ScriptValue::Integer(2)]
        );
        assert!(drain(&engine, &iterator).is_empty());
    }

    #[test]
    fn test_iterator_returns_itself() {
        let engine = DirectEngine::new();
        let iterator = SymbolIterableConverter::new(HostObject::set([HostValue::Integer(1)]).into())
            .to_iterator(&engine)
            .unwrap();
        let itself = iterator.as_object().unwrap().get(Symbol::iterator()).unwrap();
        let result = engine.call_function(&itself, &iterator, &[]).unwrap();
        assert_eq!(result, iterator);
    }

    #[test]
    fn test_map_iterates_entries() {
        let engine = DirectEngine::new();
        let map = HostObject::map([(HostValue::from("a"), HostValue::Integer(1))]);
        let function = SymbolIterableConverter::new(map.into()).to_function(&engine).unwrap();
        let iterator = engine
            .call_function(&function, &ScriptValue::Undefined, &[])
            .unwrap();
        let values = drain(&engine, &iterator);
        let pair = values[0].as_array().unwrap().to_vec();
        assert_eq!(pair, vec![ScriptValue::from("a"), ScriptValue::Integer(1)]);
    }

    #[test]
    fn test_keys_of_list_are_indices() {
        let engine = DirectEngine::new();
        let list = HostObject::list(vec!["a".into(), "b".into()]);
        let iterator = SymbolIterableConverter::with_kind(list.into(), IterationKind::Keys)
            .to_iterator(&engine)
            .unwrap();
        assert_eq!(
            drain(&engine, &iterator),
            vec![ScriptValue::Integer(0), ScriptValue::Integer(1)]
        );
    }

    #[test]
    fn test_to_primitive() {
        assert_eq!(
            SymbolToPrimitiveConverter::new(HostValue::Short(4)).to_primitive(),
            ScriptValue::Integer(4)
        );
        let list = HostObject::list(vec![1.into()]);
        assert_eq!(
            SymbolToPrimitiveConverter::new(list.into()).to_primitive(),
            ScriptValue::from("[1]")
        );
    }
}
