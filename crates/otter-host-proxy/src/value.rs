//! Engine-neutral script values
//!
//! These are the values that cross the engine seam: primitives by value,
//! arrays/objects/functions by shared handle, and proxies wrapping a
//! [`ProxyHandler`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use parking_lot::RwLock;

use crate::engine::ScriptEngine;
use crate::error::ProxyResult;
use crate::handler::ProxyHandler;

// ============================================================================
// Symbol
// ============================================================================

const SYMBOL_ID_ITERATOR: u64 = 1;
const SYMBOL_ID_TO_PRIMITIVE: u64 = 2;

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(64);

/// A script symbol. Identity is the id, not the description.
#[derive(Debug, Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    /// Create a fresh, unique symbol
    pub fn new(description: &str) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: Arc::from(description),
        }
    }

    /// `Symbol.iterator`
    pub fn iterator() -> Self {
        Self {
            id: SYMBOL_ID_ITERATOR,
            description: Arc::from("Symbol.iterator"),
        }
    }

    /// `Symbol.toPrimitive`
    pub fn to_primitive() -> Self {
        Self {
            id: SYMBOL_ID_TO_PRIMITIVE,
            description: Arc::from("Symbol.toPrimitive"),
        }
    }

    /// Symbol description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Is this `Symbol.iterator`?
    pub fn is_iterator(&self) -> bool {
        self.id == SYMBOL_ID_ITERATOR
    }

    /// Is this `Symbol.toPrimitive`?
    pub fn is_to_primitive(&self) -> bool {
        self.id == SYMBOL_ID_TO_PRIMITIVE
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Property key for script objects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String key
    String(String),
    /// Symbol key
    Symbol(Symbol),
}

impl From<&str> for PropertyKey {
    fn from(key: &str) -> Self {
        Self::String(key.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(key: String) -> Self {
        Self::String(key)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

// ============================================================================
// Arrays and objects
// ============================================================================

/// Shared handle to a script array
#[derive(Clone, Default)]
pub struct ScriptArray(Arc<RwLock<Vec<ScriptValue>>>);

impl ScriptArray {
    /// Create an array holding `items`
    pub fn new(items: Vec<ScriptValue>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Is the array empty?
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<ScriptValue> {
        self.0.read().get(index).cloned()
    }

    /// Append an element
    pub fn push(&self, value: ScriptValue) {
        self.0.write().push(value);
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<ScriptValue> {
        self.0.read().clone()
    }

    /// Same underlying array?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ScriptArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.read().iter()).finish()
    }
}

/// Shared handle to a plain script object with ordered properties
#[derive(Clone, Default)]
pub struct ScriptObject(Arc<RwLock<IndexMap<PropertyKey, ScriptValue>>>);

impl ScriptObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a property
    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<ScriptValue> {
        self.0.read().get(&key.into()).cloned()
    }

    /// Write a property
    pub fn set(&self, key: impl Into<PropertyKey>, value: ScriptValue) {
        self.0.write().insert(key.into(), value);
    }

    /// Own property keys in insertion order
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.0.read().keys().cloned().collect()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Has no properties?
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Same underlying object?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.read().iter()).finish()
    }
}

// ============================================================================
// Native functions
// ============================================================================

/// Signature of a native callable: `(engine, this, args) -> result`
pub type NativeCallback = dyn Fn(&dyn ScriptEngine, &ScriptValue, &[ScriptValue]) -> ProxyResult<ScriptValue>
    + Send
    + Sync;

/// A named native callable
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    callback: Arc<NativeCallback>,
}

impl NativeFunction {
    /// Wrap a closure as a callable
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&dyn ScriptEngine, &ScriptValue, &[ScriptValue]) -> ProxyResult<ScriptValue>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: Arc::from(name),
            callback: Arc::new(callback),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with an explicit receiver
    pub fn invoke(
        &self,
        engine: &dyn ScriptEngine,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ProxyResult<ScriptValue> {
        (self.callback)(engine, this, args)
    }

    /// Same underlying callable?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.callback) as *const () as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

// ============================================================================
// ScriptValue
// ============================================================================

/// A value as seen by the script engine
#[derive(Debug, Clone)]
pub enum ScriptValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Boolean(bool),
    /// 32-bit integer number
    Integer(i32),
    /// 64-bit integer number
    Long(i64),
    /// Double number
    Double(f64),
    /// BigInt
    BigInt(BigInt),
    /// String
    String(String),
    /// Symbol
    Symbol(Symbol),
    /// Array
    Array(ScriptArray),
    /// Plain object
    Object(ScriptObject),
    /// Callable
    Function(NativeFunction),
    /// Proxy over a host object
    Proxy(Arc<ProxyHandler>),
}

/// Identity used when script values are stored as host values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ScriptIdentity {
    Reference(u8, usize),
    Symbol(u64),
    Primitive(String),
}

impl ScriptValue {
    /// Create a string value
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create an array value
    pub fn array(items: Vec<ScriptValue>) -> Self {
        Self::Array(ScriptArray::new(items))
    }

    /// Create a native function value
    pub fn function<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&dyn ScriptEngine, &ScriptValue, &[ScriptValue]) -> ProxyResult<ScriptValue>
            + Send
            + Sync
            + 'static,
    {
        Self::Function(NativeFunction::new(name, callback))
    }

    /// Is `undefined`?
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Is `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Is `null` or `undefined`?
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Is callable?
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Is an object-like value (array, object, function, proxy)?
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Object(_) | Self::Function(_) | Self::Proxy(_)
        )
    }

    /// String contents, if a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array handle, if an array
    pub fn as_array(&self) -> Option<&ScriptArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Object handle, if a plain object
    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Proxy handler, if a proxy
    pub fn as_proxy(&self) -> Option<&Arc<ProxyHandler>> {
        match self {
            Self::Proxy(handler) => Some(handler),
            _ => None,
        }
    }

    /// Numeric value of number variants
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Narrow to a host `i32` the way the primitive layer does:
    /// doubles truncate and saturate, longs and bigints keep their low 32 bits.
    pub fn as_int(&self) -> i32 {
        match self {
            Self::Boolean(b) => i32::from(*b),
            Self::Integer(v) => *v,
            Self::Long(v) => *v as i32,
            Self::Double(v) => *v as i32,
            Self::BigInt(v) => bigint_low_bits(v),
            Self::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i32>()
                    .or_else(|_| trimmed.parse::<f64>().map(|d| d as i32))
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Script truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(v) => *v != 0,
            Self::Long(v) => *v != 0,
            Self::Double(v) => *v != 0.0 && !v.is_nan(),
            Self::BigInt(v) => !v.is_zero(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub(crate) fn identity(&self) -> ScriptIdentity {
        match self {
            Self::Array(array) => ScriptIdentity::Reference(0, array.id()),
            Self::Object(object) => ScriptIdentity::Reference(1, object.id()),
            Self::Function(function) => ScriptIdentity::Reference(2, function.id()),
            Self::Proxy(handler) => ScriptIdentity::Reference(3, Arc::as_ptr(handler) as usize),
            Self::Symbol(symbol) => ScriptIdentity::Symbol(symbol.id),
            other => ScriptIdentity::Primitive(format!("{}:{other}", other.type_tag())),
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) | Self::Long(_) | Self::Double(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Function(_) => "function",
            Self::Array(_) | Self::Object(_) | Self::Proxy(_) => "object",
        }
    }
}

fn bigint_low_bits(value: &BigInt) -> i32 {
    let (sign, digits) = value.to_u32_digits();
    let low = digits.first().copied().unwrap_or(0) as i32;
    if sign == Sign::Minus {
        low.wrapping_neg()
    } else {
        low
    }
}

/// Number to string following script formatting for the common cases
fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        (if value > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

impl PartialEq for ScriptValue {
    /// Strict equality, except that `NaN` equals itself
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Proxy(a), Self::Proxy(b)) => Arc::ptr_eq(a, b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
                _ => false,
            },
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => f.write_str(&format_number(*v)),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Symbol(symbol) => write!(f, "{symbol}"),
            Self::Array(array) => {
                let items = array.to_vec();
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(function) => {
                write!(f, "function {}() {{ [native code] }}", function.name())
            }
            Self::Proxy(handler) => write!(f, "{}", handler.target()),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(items: Vec<ScriptValue>) -> Self {
        Self::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_int_narrowing() {
        assert_eq!(ScriptValue::Double(-1.9).as_int(), -1);
        assert_eq!(ScriptValue::Double(f64::NAN).as_int(), 0);
        assert_eq!(ScriptValue::Double(1e20).as_int(), i32::MAX);
        assert_eq!(ScriptValue::Long(0x1_0000_0005).as_int(), 5);
        assert_eq!(ScriptValue::BigInt(BigInt::from(-7)).as_int(), -7);
        assert_eq!(ScriptValue::from(" 42 ").as_int(), 42);
        assert_eq!(ScriptValue::Undefined.as_int(), 0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!ScriptValue::Double(f64::NAN).is_truthy());
        assert!(!ScriptValue::from("").is_truthy());
        assert!(ScriptValue::Long(-1).is_truthy());
        assert!(ScriptValue::array(vec![]).is_truthy());
    }

    #[test]
    fn test_number_equality_crosses_variants() {
        assert_eq!(ScriptValue::Integer(3), ScriptValue::Double(3.0));
        assert_ne!(ScriptValue::Integer(3), ScriptValue::from("3"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ScriptValue::Double(2.0).to_string(), "2");
        assert_eq!(ScriptValue::Double(0.5).to_string(), "0.5");
        let array = ScriptValue::array(vec![1.into(), ScriptValue::Null, "x".into()]);
        assert_eq!(array.to_string(), "1,,x");
        assert_eq!(ScriptValue::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_well_known_symbols() {
        assert!(Symbol::iterator().is_iterator());
        assert_eq!(Symbol::iterator(), Symbol::iterator());
        assert_ne!(Symbol::new("Symbol.iterator"), Symbol::iterator());
        assert_eq!(Symbol::to_primitive().to_string(), "Symbol(Symbol.toPrimitive)");
    }
}
