//! Script engine seam
//!
//! Traps and polyfills only talk to the engine through [`ScriptEngine`]:
//! value marshalling, calling callables, creating callables and releasing
//! engine-side handles. [`DirectEngine`] is a reference adapter that calls
//! native functions directly.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ProxyConfig;
use crate::convert;
use crate::descriptor::ClassDescriptorCache;
use crate::error::ProxyResult;
use crate::error_template;
use crate::host::HostValue;
use crate::value::{NativeFunction, ScriptValue};

/// Operations the proxy layer needs from the embedding engine
pub trait ScriptEngine {
    /// Descriptor cache used to build proxies for host objects
    fn descriptor_cache(&self) -> &ClassDescriptorCache;

    /// Configuration in effect
    fn config(&self) -> &ProxyConfig {
        self.descriptor_cache().config()
    }

    /// Host → script conversion
    fn to_script_value(&self, value: &HostValue) -> ProxyResult<ScriptValue> {
        convert::to_script_value(self.descriptor_cache(), value)
    }

    /// Script → host conversion
    fn to_host_value(&self, value: &ScriptValue) -> ProxyResult<HostValue> {
        Ok(convert::to_host_value(value))
    }

    /// Call `function` with receiver `this`
    fn call_function(
        &self,
        function: &ScriptValue,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ProxyResult<ScriptValue>;

    /// Turn a native function into an engine callable
    fn create_function(&self, function: NativeFunction) -> ProxyResult<ScriptValue> {
        Ok(ScriptValue::Function(function))
    }

    /// Release an engine-side handle
    fn release(&self, _value: &ScriptValue) {}
}

// ============================================================================
// ScopedValue
// ============================================================================

/// Releases an engine value when dropped, unless it escapes.
///
/// Every exit path of a polyfill, including `?` returns, drops its scoped
/// intermediates, so nothing leaks on the engine side.
pub struct ScopedValue<'a> {
    engine: &'a dyn ScriptEngine,
    value: ScriptValue,
    escaped: bool,
}

impl<'a> ScopedValue<'a> {
    /// Take ownership of `value`
    pub fn new(engine: &'a dyn ScriptEngine, value: ScriptValue) -> Self {
        Self {
            engine,
            value,
            escaped: false,
        }
    }

    /// Borrow the value
    pub fn get(&self) -> &ScriptValue {
        &self.value
    }

    /// Hand the value to the caller without releasing it
    pub fn escape(mut self) -> ScriptValue {
        self.escaped = true;
        std::mem::replace(&mut self.value, ScriptValue::Undefined)
    }
}

impl Deref for ScopedValue<'_> {
    type Target = ScriptValue;

    fn deref(&self) -> &ScriptValue {
        &self.value
    }
}

impl Drop for ScopedValue<'_> {
    fn drop(&mut self) {
        if !self.escaped {
            self.engine.release(&self.value);
        }
    }
}

// ============================================================================
// DirectEngine
// ============================================================================

/// Engine adapter that invokes native functions in-process.
///
/// Counts calls and releases so resource discipline can be observed.
pub struct DirectEngine {
    cache: Arc<ClassDescriptorCache>,
    calls: AtomicUsize,
    released: AtomicUsize,
}

impl DirectEngine {
    /// Engine backed by the process-wide descriptor cache
    pub fn new() -> Self {
        Self::with_cache(ClassDescriptorCache::global())
    }

    /// Engine with its own cache built from `config`
    pub fn with_config(config: ProxyConfig) -> Self {
        Self::with_cache(Arc::new(ClassDescriptorCache::new(config)))
    }

    /// Engine backed by `cache`
    pub fn with_cache(cache: Arc<ClassDescriptorCache>) -> Self {
        Self {
            cache,
            calls: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Number of `call_function` invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of released values so far
    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }
}

impl Default for DirectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for DirectEngine {
    fn descriptor_cache(&self) -> &ClassDescriptorCache {
        &self.cache
    }

    fn call_function(
        &self,
        function: &ScriptValue,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ProxyResult<ScriptValue> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match function {
            ScriptValue::Function(native) => native.invoke(self, this, args),
            other => Err(error_template::type_error_value_is_not_a_function(other)),
        }
    }

    fn release(&self, _value: &ScriptValue) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}
