//! Reflective class model
//!
//! Host classes are described explicitly: a name, a superclass, an optional
//! collection shape and the public/static members a script may reach.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::descriptor::CollectionKind;
use crate::error::ProxyResult;
use crate::host::builtins;
use crate::host::value::HostValue;

// ============================================================================
// Primitive and component types
// ============================================================================

/// Host primitive wrapper types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// boolean
    Boolean,
    /// 8-bit integer
    Byte,
    /// UTF-16 character
    Character,
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Long,
    /// 16-bit integer
    Short,
    /// Arbitrary precision integer
    BigInteger,
    /// String
    String,
}

impl PrimitiveType {
    /// All wrapper types, in discriminant order
    pub const ALL: [PrimitiveType; 10] = [
        Self::Boolean,
        Self::Byte,
        Self::Character,
        Self::Double,
        Self::Float,
        Self::Integer,
        Self::Long,
        Self::Short,
        Self::BigInteger,
        Self::String,
    ];

    /// Wrapper class name
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Character => "Character",
            Self::Double => "Double",
            Self::Float => "Float",
            Self::Integer => "Integer",
            Self::Long => "Long",
            Self::Short => "Short",
            Self::BigInteger => "BigInteger",
            Self::String => "String",
        }
    }
}

/// Element type of a host array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// boolean[]
    Boolean,
    /// byte[]
    Byte,
    /// char[]
    Char,
    /// short[]
    Short,
    /// int[]
    Int,
    /// long[]
    Long,
    /// float[]
    Float,
    /// double[]
    Double,
    /// Object[]
    Object,
}

impl ComponentType {
    /// All component types
    pub const ALL: [ComponentType; 9] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Object,
    ];

    /// Primitive components cannot hold null
    pub fn is_primitive(self) -> bool {
        !matches!(self, Self::Object)
    }

    /// Source-level name of the component
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Object => "Object",
        }
    }

    /// Zero value a fresh slot holds
    pub fn default_value(self) -> HostValue {
        match self {
            Self::Boolean => HostValue::Boolean(false),
            Self::Byte => HostValue::Byte(0),
            Self::Char => HostValue::Character('\0'),
            Self::Short => HostValue::Short(0),
            Self::Int => HostValue::Integer(0),
            Self::Long => HostValue::Long(0),
            Self::Float => HostValue::Float(0.0),
            Self::Double => HostValue::Double(0.0),
            Self::Object => HostValue::Null,
        }
    }

    /// Convert a value for storage in an array of this component type.
    ///
    /// Integral values narrow only when they fit exactly; `None` means the
    /// value cannot be stored.
    pub fn coerce(self, value: HostValue) -> Option<HostValue> {
        match self {
            Self::Object => Some(value),
            Self::Boolean => match value {
                HostValue::Boolean(_) => Some(value),
                _ => None,
            },
            Self::Char => match value {
                HostValue::Character(_) => Some(value),
                HostValue::String(ref s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(HostValue::Character(c)),
                        _ => None,
                    }
                }
                _ => None,
            },
            Self::Byte => value
                .as_i64()
                .and_then(|v| i8::try_from(v).ok())
                .map(HostValue::Byte),
            Self::Short => value
                .as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .map(HostValue::Short),
            Self::Int => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(HostValue::Integer),
            Self::Long => value.as_i64().map(HostValue::Long),
            Self::Float => value.as_f64().map(|v| HostValue::Float(v as f32)),
            Self::Double => value.as_f64().map(HostValue::Double),
        }
    }
}

// ============================================================================
// Members
// ============================================================================

/// Host-side method implementation: `(receiver, args) -> result`.
/// Static methods receive [`HostValue::Null`] as the receiver.
pub type MethodCallback = dyn Fn(&HostValue, &[HostValue]) -> ProxyResult<HostValue> + Send + Sync;

/// Field metadata
#[derive(Debug, Clone)]
pub struct HostField {
    name: String,
    is_static: bool,
    is_public: bool,
    is_final: bool,
}

impl HostField {
    /// Public, mutable instance field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            is_public: true,
            is_final: false,
        }
    }

    /// Mark as static
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as final (read-only)
    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Mark as private
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is static?
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Is public?
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Is final?
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// Method metadata plus its implementation
#[derive(Clone)]
pub struct HostMethod {
    name: String,
    arity: Option<usize>,
    is_static: bool,
    is_public: bool,
    callback: Arc<MethodCallback>,
}

impl HostMethod {
    /// Public instance method taking exactly `arity` arguments
    pub fn new<F>(name: impl Into<String>, arity: usize, callback: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> ProxyResult<HostValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: Some(arity),
            is_static: false,
            is_public: true,
            callback: Arc::new(callback),
        }
    }

    /// Public instance method accepting any number of arguments
    pub fn varargs<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> ProxyResult<HostValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            is_static: false,
            is_public: true,
            callback: Arc::new(callback),
        }
    }

    /// Mark as static
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as private
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arity; `None` for varargs
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Is static?
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Is public?
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Can this overload take `argc` arguments?
    pub fn accepts(&self, argc: usize) -> bool {
        self.arity.is_none_or(|arity| arity == argc)
    }

    /// Invoke the method
    pub fn invoke(&self, receiver: &HostValue, args: &[HostValue]) -> ProxyResult<HostValue> {
        (self.callback)(receiver, args)
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMethod")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("is_static", &self.is_static)
            .field("is_public", &self.is_public)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HostClass
// ============================================================================

/// A host class: name, superclass, shape and declared members
pub struct HostClass {
    name: String,
    superclass: Option<Arc<HostClass>>,
    shape: Option<CollectionKind>,
    component: Option<ComponentType>,
    primitive: Option<PrimitiveType>,
    fields: Vec<HostField>,
    methods: Vec<HostMethod>,
    statics: RwLock<IndexMap<String, HostValue>>,
}

impl HostClass {
    /// Start describing a class that extends `Object` unless told otherwise
    pub fn builder(name: impl Into<String>) -> HostClassBuilder {
        HostClassBuilder {
            name: name.into(),
            superclass: None,
            root: false,
            shape: None,
            component: None,
            primitive: None,
            fields: Vec::new(),
            methods: Vec::new(),
            statics: IndexMap::new(),
        }
    }

    /// The root `Object` class
    pub fn object() -> Arc<HostClass> {
        builtins::object_class()
    }

    /// The built-in `List` class
    pub fn list() -> Arc<HostClass> {
        builtins::list_class()
    }

    /// The built-in `Set` class
    pub fn set() -> Arc<HostClass> {
        builtins::set_class()
    }

    /// The built-in `Map` class
    pub fn map() -> Arc<HostClass> {
        builtins::map_class()
    }

    /// The built-in `Class` class, the runtime class of class references
    pub fn class() -> Arc<HostClass> {
        builtins::class_class()
    }

    /// Array class for a component type
    pub fn array(component: ComponentType) -> Arc<HostClass> {
        builtins::array_class(component)
    }

    /// Wrapper class for a primitive type
    pub fn primitive(primitive: PrimitiveType) -> Arc<HostClass> {
        builtins::primitive_class(primitive)
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct superclass; `None` only for the root
    pub fn superclass(&self) -> Option<&Arc<HostClass>> {
        self.superclass.as_ref()
    }

    /// This class followed by each superclass up to and including the root
    pub fn hierarchy(self: &Arc<Self>) -> impl Iterator<Item = Arc<HostClass>> + use<> {
        std::iter::successors(Some(self.clone()), |class| class.superclass.clone())
    }

    /// Collection shape, inherited from the nearest superclass declaring one
    pub fn collection_kind(&self) -> CollectionKind {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(shape) = class.shape {
                return shape;
            }
            current = class.superclass.as_deref();
        }
        CollectionKind::None
    }

    /// Array component type
    pub fn component_type(&self) -> Option<ComponentType> {
        self.component
    }

    /// Wrapped primitive type for wrapper classes
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        self.primitive
    }

    /// Fields declared by this class (not inherited)
    pub fn fields(&self) -> &[HostField] {
        &self.fields
    }

    /// Methods declared by this class (not inherited)
    pub fn methods(&self) -> &[HostMethod] {
        &self.methods
    }

    /// Current value of a static field declared by this class
    pub fn static_value(&self, name: &str) -> Option<HostValue> {
        self.statics.read().get(name).cloned()
    }

    /// Store a static field value
    pub fn set_static_value(&self, name: &str, value: HostValue) {
        self.statics.write().insert(name.to_string(), value);
    }
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|class| class.name()),
            )
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HostClass`]
pub struct HostClassBuilder {
    name: String,
    superclass: Option<Arc<HostClass>>,
    root: bool,
    shape: Option<CollectionKind>,
    component: Option<ComponentType>,
    primitive: Option<PrimitiveType>,
    fields: Vec<HostField>,
    methods: Vec<HostMethod>,
    statics: IndexMap<String, HostValue>,
}

impl HostClassBuilder {
    /// Set the superclass
    pub fn extends(mut self, superclass: &Arc<HostClass>) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// Declare the collection shape
    pub fn shape(mut self, kind: CollectionKind) -> Self {
        self.shape = Some(kind);
        self
    }

    /// Declare an instance field
    pub fn field(mut self, field: HostField) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a static field with its initial value
    pub fn static_field(mut self, field: HostField, value: HostValue) -> Self {
        let field = field.with_static();
        self.statics.insert(field.name().to_string(), value);
        self.fields.push(field);
        self
    }

    /// Declare a method
    pub fn method(mut self, method: HostMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub(crate) fn root(mut self) -> Self {
        self.root = true;
        self
    }

    pub(crate) fn component(mut self, component: ComponentType) -> Self {
        self.component = Some(component);
        self.shape = Some(CollectionKind::Array);
        self
    }

    pub(crate) fn primitive(mut self, primitive: PrimitiveType) -> Self {
        self.primitive = Some(primitive);
        self
    }

    /// Finish the class
    pub fn build(self) -> Arc<HostClass> {
        let superclass = if self.root {
            None
        } else {
            Some(self.superclass.unwrap_or_else(HostClass::object))
        };
        Arc::new(HostClass {
            name: self.name,
            superclass,
            shape: self.shape,
            component: self.component,
            primitive: self.primitive,
            fields: self.fields,
            methods: self.methods,
            statics: RwLock::new(self.statics),
        })
    }
}
