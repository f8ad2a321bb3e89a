//! `Array.prototype` polyfills for list-shaped host objects
//!
//! Every function re-reads the list at each step and never holds the list
//! lock while a user callback runs. Intermediate callback results are
//! released as soon as they are consumed.

use std::sync::LazyLock;

use crate::convert::{
    arg_as_function_with_error, arg_as_int, arg_as_object, arg_or_undefined, index_value,
};
use crate::converter::{IterationKind, SymbolIterableConverter};
use crate::engine::{ScopedValue, ScriptEngine};
use crate::error::{ProxyError, ProxyResult};
use crate::error_template;
use crate::host::{HostData, HostObject, HostValue};
use crate::polyfill::{
    PolyfillFunction, PolyfillRegistry, bind, list_items, relative_index, try_sort_by,
};
use crate::value::ScriptValue;

static REGISTRY: LazyLock<PolyfillRegistry> = LazyLock::new(|| {
    PolyfillRegistry::new(
        "List",
        &[
            ("at", at),
            ("concat", concat),
            ("copyWithin", copy_within),
            ("entries", entries),
            ("every", every),
            ("fill", fill),
            ("filter", filter),
            ("find", find),
            ("findIndex", find_index),
            ("findLast", find_last),
            ("findLastIndex", find_last_index),
            ("forEach", for_each),
            ("includes", includes),
            ("indexOf", index_of),
            ("join", join),
            ("keys", keys),
            ("lastIndexOf", last_index_of),
            ("length", length),
            ("map", map),
            ("pop", pop),
            ("push", push),
            ("reduce", reduce),
            ("reduceRight", reduce_right),
            ("reverse", reverse),
            ("shift", shift),
            ("size", length),
            ("slice", slice),
            ("some", some),
            ("sort", sort),
            ("splice", splice),
            ("toJSON", to_json),
            ("toReversed", to_reversed),
            ("toSorted", to_sorted),
            ("toSpliced", to_spliced),
            ("unshift", unshift),
            ("values", values),
            ("with", with),
        ],
    )
});

/// The list registry
pub fn registry() -> &'static PolyfillRegistry {
    &REGISTRY
}

/// Polyfill for `name`, if any
pub fn get_function(name: &str) -> Option<PolyfillFunction> {
    REGISTRY.get_function(name)
}

// ============================================================================
// Helpers
// ============================================================================

fn snapshot(target: &HostValue) -> ProxyResult<Vec<HostValue>> {
    Ok(list_items(target)?.read().clone())
}

fn element_at(target: &HostValue, index: usize) -> ProxyResult<Option<HostValue>> {
    Ok(list_items(target)?.read().get(index).cloned())
}

fn length_of(target: &HostValue) -> ProxyResult<usize> {
    Ok(list_items(target)?.read().len())
}

fn to_script_array(engine: &dyn ScriptEngine, items: &[HostValue]) -> ProxyResult<ScriptValue> {
    let values = items
        .iter()
        .map(|item| engine.to_script_value(item))
        .collect::<ProxyResult<Vec<_>>>()?;
    Ok(ScriptValue::array(values))
}

fn to_host_values(engine: &dyn ScriptEngine, args: &[ScriptValue]) -> ProxyResult<Vec<HostValue>> {
    args.iter().map(|arg| engine.to_host_value(arg)).collect()
}

fn length_as_int(length: usize) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}

/// `callback.call(thisArg, element, index, list)` with a scoped result
struct CallbackWalk<'a> {
    engine: &'a dyn ScriptEngine,
    callback: ScriptValue,
    this_arg: ScriptValue,
    this: ScriptValue,
}

impl<'a> CallbackWalk<'a> {
    fn new(engine: &'a dyn ScriptEngine, this: &ScriptValue, args: &[ScriptValue]) -> ProxyResult<Self> {
        Ok(Self {
            engine,
            callback: arg_as_function_with_error(args, 0)?.clone(),
            this_arg: arg_as_object(args, 1),
            this: this.clone(),
        })
    }

    fn call(&self, element: &HostValue, index: usize) -> ProxyResult<ScopedValue<'a>> {
        let element = self.engine.to_script_value(element)?;
        let result = self.engine.call_function(
            &self.callback,
            &self.this_arg,
            &[element, index_value(index), self.this.clone()],
        )?;
        Ok(ScopedValue::new(self.engine, result))
    }

    fn test(&self, element: &HostValue, index: usize) -> ProxyResult<bool> {
        Ok(self.call(element, index)?.is_truthy())
    }
}

/// First index at or after `fromIndex` holding `args[0]`
fn search_forward(
    engine: &dyn ScriptEngine,
    target: &HostValue,
    args: &[ScriptValue],
) -> ProxyResult<Option<usize>> {
    let Some(value) = args.first() else {
        return Ok(None);
    };
    let needle = engine.to_host_value(value)?;
    let items = list_items(target)?.read();
    let from = relative_index(arg_as_int(args, 1, 0), items.len());
    Ok(items[from..]
        .iter()
        .position(|item| *item == needle)
        .map(|position| position + from))
}

fn sort_elements(
    engine: &dyn ScriptEngine,
    items: Vec<HostValue>,
    comparator: Option<&ScriptValue>,
) -> ProxyResult<Vec<HostValue>> {
    let Some(comparator) = comparator.filter(|value| value.is_function()) else {
        // Natural order of the string forms, by UTF-16 code units.
        let mut keyed: Vec<(Vec<u16>, HostValue)> = items
            .into_iter()
            .map(|item| (item.to_string().encode_utf16().collect(), item))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        return Ok(keyed.into_iter().map(|(_, item)| item).collect());
    };
    try_sort_by(items, |left, right| {
        let left = engine.to_script_value(left)?;
        let right = engine.to_script_value(right)?;
        let result = engine.call_function(comparator, &ScriptValue::Undefined, &[left, right])?;
        let result = ScopedValue::new(engine, result);
        Ok(result.as_int().cmp(&0))
    })
    .map_err(|err| ProxyError::error(err.message()))
}

/// Remove and insert in place; returns the removed elements
fn splice_items(
    items: &mut Vec<HostValue>,
    args: &[ScriptValue],
    inserted: Vec<HostValue>,
) -> ProxyResult<Vec<HostValue>> {
    if args.is_empty() {
        return Ok(Vec::new());
    }
    let length = items.len() as i64;
    let mut start = i64::from(arg_as_int(args, 0, 0));
    if start < 0 {
        start = (start + length).max(0);
    }
    if start >= length {
        return Err(error_template::range_error_start_is_out_of_range(start));
    }
    let remaining = length - start;
    let delete_count = match args.get(1) {
        None => remaining,
        Some(value) => i64::from(value.as_int()).clamp(0, remaining),
    };
    let start = start as usize;
    let end = start + delete_count as usize;
    Ok(items.splice(start..end, inserted).collect())
}

fn reduce_with(
    engine: &dyn ScriptEngine,
    target: &HostValue,
    this: &ScriptValue,
    args: &[ScriptValue],
    from_right: bool,
) -> ProxyResult<ScriptValue> {
    let callback = arg_as_function_with_error(args, 0)?;
    let length = length_of(target)?;
    let mut order: Box<dyn Iterator<Item = usize>> = if from_right {
        Box::new((0..length).rev())
    } else {
        Box::new(0..length)
    };
    let mut accumulator = match args.get(1) {
        Some(initial) => ScopedValue::new(engine, initial.clone()),
        None => {
            let first = order
                .next()
                .and_then(|index| element_at(target, index).transpose())
                .transpose()?
                .ok_or_else(error_template::type_error_reduce_of_empty_array_with_no_initial_value)?;
            let first = engine.to_script_value(&first)?;
            if length == 1 {
                return Ok(first);
            }
            ScopedValue::new(engine, first)
        }
    };
    for index in order {
        let Some(element) = element_at(target, index)? else {
            continue;
        };
        let current = engine.to_script_value(&element)?;
        let next = engine.call_function(
            callback,
            &ScriptValue::Undefined,
            &[accumulator.get().clone(), current, index_value(index), this.clone()],
        )?;
        accumulator = ScopedValue::new(engine, next);
    }
    Ok(accumulator.escape())
}

// ============================================================================
// Polyfills
// ============================================================================

fn at(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "at", |engine, target, _this, args| {
        let element = {
            let items = list_items(target)?.read();
            let length = items.len() as i64;
            let mut index = i64::from(arg_as_int(args, 0, 0));
            if index < 0 {
                index += length;
            }
            if index < 0 || index >= length {
                None
            } else {
                items.get(index as usize).cloned()
            }
        };
        match element {
            Some(element) => engine.to_script_value(&element),
            None => Ok(ScriptValue::Undefined),
        }
    })
}

fn concat(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "concat", |engine, target, _this, args| {
        let mut values = Vec::new();
        for item in snapshot(target)? {
            values.push(engine.to_script_value(&item)?);
        }
        for arg in args {
            if let ScriptValue::Array(array) = arg {
                values.extend(array.to_vec());
                continue;
            }
            let host = engine.to_host_value(arg)?;
            let flattened: Option<Vec<HostValue>> = match host.as_object().map(HostObject::data) {
                Some(HostData::List(items)) => Some(items.read().clone()),
                Some(HostData::Set(set)) => Some(set.read().iter().cloned().collect()),
                _ => None,
            };
            match flattened {
                Some(items) => {
                    for item in items {
                        values.push(engine.to_script_value(&item)?);
                    }
                }
                None => values.push(arg.clone()),
            }
        }
        Ok(ScriptValue::array(values))
    })
}

fn copy_within(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "copyWithin", |_engine, target, this, args| {
        let items = list_items(target)?;
        let original = items.read().clone();
        let length = original.len();
        if length > 0 && !args.is_empty() {
            let target_index = relative_index(arg_as_int(args, 0, 0), length);
            let start = relative_index(arg_as_int(args, 1, 0), length);
            let mut end = relative_index(arg_as_int(args, 2, 0), length);
            if end == 0 {
                end = length;
            }
            if target_index < length && start < length && end > start {
                if target_index + end - start > length {
                    end = length + start - target_index;
                }
                let mut live = items.write();
                for (offset, item) in original[start..end].iter().enumerate() {
                    if let Some(slot) = live.get_mut(target_index + offset) {
                        *slot = item.clone();
                    }
                }
            }
        }
        Ok(this.clone())
    })
}

fn entries(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "entries", |engine, target, _this, _args| {
        SymbolIterableConverter::with_kind(target.clone(), IterationKind::Entries).to_iterator(engine)
    })
}

fn every(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "every", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            if !walk.test(&element, index)? {
                return Ok(ScriptValue::Boolean(false));
            }
            index += 1;
        }
        Ok(ScriptValue::Boolean(true))
    })
}

fn fill(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "fill", |engine, target, this, args| {
        let items = list_items(target)?;
        let length = items.read().len();
        if length > 0 && !args.is_empty() {
            let value = engine.to_host_value(&arg_or_undefined(args, 0))?;
            let start = relative_index(arg_as_int(args, 1, 0), length);
            let mut end = relative_index(arg_as_int(args, 2, 0), length);
            if end == 0 {
                end = length;
            }
            if start < length && end > start {
                if let Some(range) = items.write().get_mut(start..end) {
                    range.fill(value);
                }
            }
        }
        Ok(this.clone())
    })
}

fn filter(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "filter", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut kept = Vec::new();
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            if walk.test(&element, index)? {
                kept.push(element);
            }
            index += 1;
        }
        to_script_array(engine, &kept)
    })
}

fn find(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "find", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            if walk.test(&element, index)? {
                return engine.to_script_value(&element);
            }
            index += 1;
        }
        Ok(ScriptValue::Undefined)
    })
}

fn find_index(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "findIndex", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            if walk.test(&element, index)? {
                return Ok(index_value(index));
            }
            index += 1;
        }
        Ok(ScriptValue::Integer(-1))
    })
}

fn find_last(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "findLast", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = length_of(target)?;
        while index > 0 {
            index -= 1;
            let Some(element) = element_at(target, index)? else {
                continue;
            };
            if walk.test(&element, index)? {
                return engine.to_script_value(&element);
            }
        }
        Ok(ScriptValue::Undefined)
    })
}

fn find_last_index(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "findLastIndex", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = length_of(target)?;
        while index > 0 {
            index -= 1;
            let Some(element) = element_at(target, index)? else {
                continue;
            };
            if walk.test(&element, index)? {
                return Ok(index_value(index));
            }
        }
        Ok(ScriptValue::Integer(-1))
    })
}

fn for_each(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "forEach", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            walk.call(&element, index)?;
            index += 1;
        }
        Ok(ScriptValue::Undefined)
    })
}

fn includes(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "includes", |engine, target, _this, args| {
        Ok(ScriptValue::Boolean(search_forward(engine, target, args)?.is_some()))
    })
}

fn index_of(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "indexOf", |engine, target, _this, args| {
        Ok(search_forward(engine, target, args)?.map_or(ScriptValue::Integer(-1), index_value))
    })
}

fn join(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "join", |_engine, target, _this, args| {
        let separator = match args.first() {
            None | Some(ScriptValue::Undefined) => ",".to_string(),
            Some(value) => value.to_string(),
        };
        let joined = snapshot(target)?
            .iter()
            .map(|item| if item.is_null() { String::new() } else { item.to_string() })
            .collect::<Vec<_>>()
            .join(&separator);
        Ok(ScriptValue::String(joined))
    })
}

fn keys(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "keys", |engine, target, _this, _args| {
        SymbolIterableConverter::with_kind(target.clone(), IterationKind::Keys).to_iterator(engine)
    })
}

fn last_index_of(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "lastIndexOf", |engine, target, _this, args| {
        let Some(value) = args.first() else {
            return Ok(ScriptValue::Integer(-1));
        };
        let needle = engine.to_host_value(value)?;
        let items = list_items(target)?.read();
        let length = items.len() as i64;
        if length == 0 {
            return Ok(ScriptValue::Integer(-1));
        }
        let mut from = i64::from(arg_as_int(args, 1, length_as_int(items.len() - 1)));
        if from < 0 {
            from += length;
        }
        if from < 0 {
            return Ok(ScriptValue::Integer(-1));
        }
        let from = from.min(length - 1) as usize;
        Ok(items[..=from]
            .iter()
            .rposition(|item| *item == needle)
            .map_or(ScriptValue::Integer(-1), index_value))
    })
}

fn length(_engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    Ok(index_value(length_of(target)?))
}

fn map(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "map", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut results = Vec::new();
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            results.push(walk.call(&element, index)?);
            index += 1;
        }
        Ok(ScriptValue::array(
            results.into_iter().map(ScopedValue::escape).collect(),
        ))
    })
}

fn pop(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "pop", |engine, target, _this, _args| {
        let element = list_items(target)?.write().pop();
        match element {
            Some(element) => engine.to_script_value(&element),
            None => Ok(ScriptValue::Undefined),
        }
    })
}

fn push(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "push", |engine, target, _this, args| {
        let pushed = to_host_values(engine, args)?;
        let mut items = list_items(target)?.write();
        items.extend(pushed);
        Ok(index_value(items.len()))
    })
}

fn reduce(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "reduce", |engine, target, this, args| {
        reduce_with(engine, target, this, args, false)
    })
}

fn reduce_right(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "reduceRight", |engine, target, this, args| {
        reduce_with(engine, target, this, args, true)
    })
}

fn reverse(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "reverse", |_engine, target, this, _args| {
        list_items(target)?.write().reverse();
        Ok(this.clone())
    })
}

fn shift(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "shift", |engine, target, _this, _args| {
        let element = {
            let mut items = list_items(target)?.write();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        match element {
            Some(element) => engine.to_script_value(&element),
            None => Ok(ScriptValue::Undefined),
        }
    })
}

fn slice(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "slice", |engine, target, _this, args| {
        let items = snapshot(target)?;
        let length = items.len();
        let start = relative_index(arg_as_int(args, 0, 0), length);
        let end = relative_index(arg_as_int(args, 1, length_as_int(length)), length);
        if start < end {
            to_script_array(engine, &items[start..end])
        } else {
            Ok(ScriptValue::array(Vec::new()))
        }
    })
}

fn some(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "some", |engine, target, this, args| {
        let walk = CallbackWalk::new(engine, this, args)?;
        let mut index = 0;
        while let Some(element) = element_at(target, index)? {
            if walk.test(&element, index)? {
                return Ok(ScriptValue::Boolean(true));
            }
            index += 1;
        }
        Ok(ScriptValue::Boolean(false))
    })
}

fn sort(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "sort", |engine, target, this, args| {
        let items = snapshot(target)?;
        if items.len() > 1 {
            let sorted = sort_elements(engine, items, args.first())?;
            *list_items(target)?.write() = sorted;
        }
        Ok(this.clone())
    })
}

fn splice(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "splice", |engine, target, _this, args| {
        let inserted = to_host_values(engine, args.get(2..).unwrap_or_default())?;
        let removed = splice_items(&mut list_items(target)?.write(), args, inserted)?;
        to_script_array(engine, &removed)
    })
}

fn to_json(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toJSON", |engine, target, _this, _args| {
        to_script_array(engine, &snapshot(target)?)
    })
}

fn to_reversed(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toReversed", |engine, target, _this, _args| {
        let mut copy = snapshot(target)?;
        copy.reverse();
        to_script_array(engine, &copy)
    })
}

fn to_sorted(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toSorted", |engine, target, _this, args| {
        let sorted = sort_elements(engine, snapshot(target)?, args.first())?;
        to_script_array(engine, &sorted)
    })
}

fn to_spliced(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "toSpliced", |engine, target, _this, args| {
        let inserted = to_host_values(engine, args.get(2..).unwrap_or_default())?;
        let mut copy = snapshot(target)?;
        splice_items(&mut copy, args, inserted)?;
        to_script_array(engine, &copy)
    })
}

fn unshift(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "unshift", |engine, target, _this, args| {
        let mut front = to_host_values(engine, args)?;
        let mut items = list_items(target)?.write();
        front.append(&mut items);
        *items = front;
        Ok(index_value(items.len()))
    })
}

fn values(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "values", |engine, target, _this, _args| {
        SymbolIterableConverter::with_kind(target.clone(), IterationKind::Values).to_iterator(engine)
    })
}

fn with(engine: &dyn ScriptEngine, target: &HostValue) -> ProxyResult<ScriptValue> {
    bind(engine, target, "with", |engine, target, _this, args| {
        let items = snapshot(target)?;
        let length = items.len() as i64;
        let requested = arg_as_int(args, 0, 0);
        let mut index = i64::from(requested);
        if index < 0 {
            index += length;
        }
        if index < 0 || index >= length {
            return Err(error_template::range_error_invalid_index(requested));
        }
        let mut values = items
            .iter()
            .map(|item| engine.to_script_value(item))
            .collect::<ProxyResult<Vec<_>>>()?;
        values[index as usize] = arg_or_undefined(args, 1);
        Ok(ScriptValue::array(values))
    })
}
