//! Host values
//!
//! Equality follows host semantics: primitives compare by type and value,
//! objects by identity. Floats compare with SameValueZero bits so they can be
//! used as set members and map keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;
use rustc_hash::FxHasher;

use crate::host::class::{HostClass, PrimitiveType};
use crate::host::object::HostObject;
use crate::value::ScriptValue;

/// A value living on the host side of the seam
#[derive(Debug, Clone)]
pub enum HostValue {
    /// Null reference
    Null,
    /// Boolean wrapper
    Boolean(bool),
    /// Byte wrapper
    Byte(i8),
    /// Character wrapper
    Character(char),
    /// Short wrapper
    Short(i16),
    /// Integer wrapper
    Integer(i32),
    /// Long wrapper
    Long(i64),
    /// Float wrapper
    Float(f32),
    /// Double wrapper
    Double(f64),
    /// Arbitrary precision integer
    BigInteger(BigInt),
    /// String
    String(String),
    /// Reference to a host object
    Object(HostObject),
    /// A script value held opaquely by the host (functions, symbols, plain objects)
    Script(ScriptValue),
}

impl HostValue {
    /// Is null?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Host object, if any
    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// String contents, if a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral value of integral wrappers
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Integer(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            Self::Double(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Some(*v as i64),
            Self::Float(v) if v.fract() == 0.0 && v.abs() < 1.6e7 => Some(*v as i64),
            _ => None,
        }
    }

    /// Numeric value of number wrappers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Short(v) => Some(f64::from(*v)),
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integral value usable as an index
    pub fn as_index(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    /// Primitive wrapper type, if this is a primitive
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        Some(match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::Character(_) => PrimitiveType::Character,
            Self::Short(_) => PrimitiveType::Short,
            Self::Integer(_) => PrimitiveType::Integer,
            Self::Long(_) => PrimitiveType::Long,
            Self::Float(_) => PrimitiveType::Float,
            Self::Double(_) => PrimitiveType::Double,
            Self::BigInteger(_) => PrimitiveType::BigInteger,
            Self::String(_) => PrimitiveType::String,
            Self::Null | Self::Object(_) | Self::Script(_) => return None,
        })
    }

    /// Runtime class of the value; `None` for null and script values
    pub fn class(&self) -> Option<Arc<HostClass>> {
        match self {
            Self::Object(object) => Some(object.class().clone()),
            other => other.primitive_type().map(HostClass::primitive),
        }
    }

    /// Identity-or-value hash narrowed to 32 bits, as `hashCode()` reports it
    pub fn hash_code(&self) -> i32 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish() as i32
    }
}

// Hash tags keep equal payloads of different types apart.
const HASH_TAG_NULL: u8 = 0;
const HASH_TAG_BOOL: u8 = 1;
const HASH_TAG_BYTE: u8 = 2;
const HASH_TAG_CHAR: u8 = 3;
const HASH_TAG_SHORT: u8 = 4;
const HASH_TAG_INT: u8 = 5;
const HASH_TAG_LONG: u8 = 6;
const HASH_TAG_FLOAT: u8 = 7;
const HASH_TAG_DOUBLE: u8 = 8;
const HASH_TAG_BIGINT: u8 = 9;
const HASH_TAG_STRING: u8 = 10;
const HASH_TAG_OBJECT: u8 = 11;
const HASH_TAG_SCRIPT: u8 = 12;

/// Normalize a float for SameValueZero comparison: -0 → +0, NaN → canonical NaN bits.
fn normalize_float_bits(n: f64) -> u64 {
    if n == 0.0 {
        0u64
    } else if n.is_nan() {
        0x7FF8_0000_0000_0000u64
    } else {
        n.to_bits()
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Character(a), Self::Character(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                normalize_float_bits(f64::from(*a)) == normalize_float_bits(f64::from(*b))
            }
            (Self::Double(a), Self::Double(b)) => {
                normalize_float_bits(*a) == normalize_float_bits(*b)
            }
            (Self::BigInteger(a), Self::BigInteger(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Script(a), Self::Script(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl Eq for HostValue {}

impl Hash for HostValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => HASH_TAG_NULL.hash(state),
            Self::Boolean(b) => {
                HASH_TAG_BOOL.hash(state);
                b.hash(state);
            }
            Self::Byte(v) => {
                HASH_TAG_BYTE.hash(state);
                v.hash(state);
            }
            Self::Character(c) => {
                HASH_TAG_CHAR.hash(state);
                c.hash(state);
            }
            Self::Short(v) => {
                HASH_TAG_SHORT.hash(state);
                v.hash(state);
            }
            Self::Integer(v) => {
                HASH_TAG_INT.hash(state);
                v.hash(state);
            }
            Self::Long(v) => {
                HASH_TAG_LONG.hash(state);
                v.hash(state);
            }
            Self::Float(v) => {
                HASH_TAG_FLOAT.hash(state);
                normalize_float_bits(f64::from(*v)).hash(state);
            }
            Self::Double(v) => {
                HASH_TAG_DOUBLE.hash(state);
                normalize_float_bits(*v).hash(state);
            }
            Self::BigInteger(v) => {
                HASH_TAG_BIGINT.hash(state);
                v.hash(state);
            }
            Self::String(s) => {
                HASH_TAG_STRING.hash(state);
                s.hash(state);
            }
            Self::Object(object) => {
                HASH_TAG_OBJECT.hash(state);
                object.id().hash(state);
            }
            Self::Script(value) => {
                HASH_TAG_SCRIPT.hash(state);
                value.identity().hash(state);
            }
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Character(c) => write!(f, "{c}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::BigInteger(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Object(object) => write!(f, "{object}"),
            Self::Script(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<char> for HostValue {
    fn from(value: char) -> Self {
        Self::Character(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<HostObject> for HostValue {
    fn from(object: HostObject) -> Self {
        Self::Object(object)
    }
}
