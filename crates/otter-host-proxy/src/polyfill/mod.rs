//! Polyfill function registries
//!
//! Each registry is an immutable name → function table built once per
//! process. A [`PolyfillFunction`], given a target, returns the script value
//! for that property: usually a callable bound to the target, sometimes a
//! plain value such as `length`.

pub mod list;
pub mod primitive;
pub mod set;

use std::cmp::Ordering;

use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::engine::ScriptEngine;
use crate::error::{ProxyError, ProxyResult};
use crate::host::{HostObject, HostValue};
use crate::value::{NativeFunction, ScriptValue};

/// `(engine, target) -> property value`
pub type PolyfillFunction = fn(&dyn ScriptEngine, &HostValue) -> ProxyResult<ScriptValue>;

/// Immutable table of polyfills for one shape
pub struct PolyfillRegistry {
    shape: &'static str,
    functions: FxHashMap<&'static str, PolyfillFunction>,
}

impl PolyfillRegistry {
    pub(crate) fn new(shape: &'static str, entries: &[(&'static str, PolyfillFunction)]) -> Self {
        Self {
            shape,
            functions: entries.iter().copied().collect(),
        }
    }

    /// Shape this registry serves
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// Polyfill registered under `name`
    pub fn get_function(&self, name: &str) -> Option<PolyfillFunction> {
        self.functions.get(name).copied()
    }

    /// Is `name` polyfilled?
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, unordered
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for PolyfillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("PolyfillRegistry")
            .field("shape", &self.shape)
            .field("names", &names)
            .finish()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Bind `body` to `target` as a script callable named `name`
pub(crate) fn bind<F>(
    engine: &dyn ScriptEngine,
    target: &HostValue,
    name: &'static str,
    body: F,
) -> ProxyResult<ScriptValue>
where
    F: Fn(&dyn ScriptEngine, &HostValue, &ScriptValue, &[ScriptValue]) -> ProxyResult<ScriptValue>
        + Send
        + Sync
        + 'static,
{
    let target = target.clone();
    engine.create_function(NativeFunction::new(name, move |engine, this, args| {
        body(engine, &target, this, args)
    }))
}

pub(crate) fn list_items(target: &HostValue) -> ProxyResult<&RwLock<Vec<HostValue>>> {
    let items = target.as_object().and_then(HostObject::as_list);
    debug_assert!(items.is_some(), "list polyfill bound to {target}");
    items.ok_or_else(|| ProxyError::internal(format!("Target {target} must be a List")))
}

pub(crate) fn set_values(target: &HostValue) -> ProxyResult<&RwLock<IndexSet<HostValue>>> {
    let values = target.as_object().and_then(HostObject::as_set);
    debug_assert!(values.is_some(), "set polyfill bound to {target}");
    values.ok_or_else(|| ProxyError::internal(format!("Target {target} must be a Set")))
}

/// Resolve a relative index: negative counts from the end, then clamp to `[0, length]`
pub(crate) fn relative_index(index: i32, length: usize) -> usize {
    let length = length as i64;
    let index = i64::from(index);
    let resolved = if index < 0 { (index + length).max(0) } else { index.min(length) };
    resolved as usize
}

/// Stable merge sort with a fallible comparator.
///
/// The first comparator error aborts the sort and is returned; `items` is
/// consumed either way.
pub(crate) fn try_sort_by<T, F>(items: Vec<T>, mut compare: F) -> ProxyResult<Vec<T>>
where
    T: Clone,
    F: FnMut(&T, &T) -> ProxyResult<Ordering>,
{
    let length = items.len();
    if length < 2 {
        return Ok(items);
    }
    let mut source = items;
    let mut buffer: Vec<T> = Vec::with_capacity(length);
    let mut width = 1;
    while width < length {
        buffer.clear();
        let mut start = 0;
        while start < length {
            let middle = (start + width).min(length);
            let end = (start + 2 * width).min(length);
            let (mut left, mut right) = (start, middle);
            while left < middle && right < end {
                if compare(&source[left], &source[right])? == Ordering::Greater {
                    buffer.push(source[right].clone());
                    right += 1;
                } else {
                    buffer.push(source[left].clone());
                    left += 1;
                }
            }
            buffer.extend_from_slice(&source[left..middle]);
            buffer.extend_from_slice(&source[right..end]);
            start = end;
        }
        std::mem::swap(&mut source, &mut buffer);
        width *= 2;
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(-1, 5), 4);
        assert_eq!(relative_index(-9, 5), 0);
        assert_eq!(relative_index(7, 5), 5);
        assert_eq!(relative_index(i32::MIN, 5), 0);
        assert_eq!(relative_index(2, 0), 0);
    }

    #[test]
    fn test_try_sort_by_is_stable() {
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd'), (0, 'e')];
        let sorted = try_sort_by(items, |a, b| Ok(a.0.cmp(&b.0))).unwrap();
        assert_eq!(sorted, vec![(0, 'e'), (1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_try_sort_by_propagates_errors() {
        let result = try_sort_by(vec![3, 1, 2], |_, _| Err(ProxyError::error("nope")));
        assert_eq!(result.unwrap_err(), ProxyError::error("nope"));
    }

    #[test]
    fn test_registries_are_complete() {
        assert_eq!(list::registry().len(), 37);
        assert_eq!(set::registry().len(), 11);
        assert_eq!(list::registry().shape(), "List");
    }
}
