//! Class metadata cache
//!
//! A [`ClassDescriptor`] is the immutable, per-class capability record the
//! trap dispatcher consults: collection shape, exposed fields and methods and
//! the method names a polyfill claims. Descriptors are built once by walking
//! the class hierarchy and shared through [`ClassDescriptorCache`].

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::host::{HostClass, HostField, HostMethod, HostValue, PrimitiveType};

/// Shape discriminant of a host class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollectionKind {
    /// Plain object or primitive wrapper
    #[default]
    None,
    /// List-like
    List,
    /// Set-like
    Set,
    /// Map-like
    Map,
    /// Array-like
    Array,
}

/// A field together with the class that declares it
#[derive(Debug, Clone)]
pub struct FieldEntry {
    field: HostField,
    owner: Arc<HostClass>,
}

impl FieldEntry {
    /// Field metadata
    pub fn field(&self) -> &HostField {
        &self.field
    }

    /// Declaring class
    pub fn owner(&self) -> &Arc<HostClass> {
        &self.owner
    }

    /// Current value on `target` (static fields read the declaring class)
    pub fn read(&self, target: &HostValue) -> HostValue {
        let value = if self.field.is_static() {
            self.owner.static_value(self.field.name())
        } else {
            target
                .as_object()
                .and_then(|object| object.field(self.field.name()))
        };
        value.unwrap_or(HostValue::Null)
    }

    /// Store `value`; final fields refuse
    pub fn write(&self, target: &HostValue, value: HostValue) -> bool {
        if self.field.is_final() {
            return false;
        }
        if self.field.is_static() {
            self.owner.set_static_value(self.field.name(), value);
            true
        } else {
            target
                .as_object()
                .is_some_and(|object| object.set_field(self.field.name(), value))
        }
    }
}

/// Overloads sharing a name, most-derived first
#[derive(Debug, Clone)]
pub struct MethodGroup {
    name: String,
    overloads: Vec<HostMethod>,
}

impl MethodGroup {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            overloads: Vec::new(),
        }
    }

    /// Add unless an overload with the same arity is already present
    fn add_if_absent(&mut self, method: &HostMethod) {
        if !self
            .overloads
            .iter()
            .any(|existing| existing.arity() == method.arity())
        {
            self.overloads.push(method.clone());
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All overloads
    pub fn overloads(&self) -> &[HostMethod] {
        &self.overloads
    }

    /// Overload for `argc` arguments: exact arity first, then varargs
    pub fn select(&self, argc: usize) -> Option<&HostMethod> {
        self.overloads
            .iter()
            .find(|method| method.arity() == Some(argc))
            .or_else(|| self.overloads.iter().find(|method| method.arity().is_none()))
    }
}

// ============================================================================
// ClassDescriptor
// ============================================================================

/// Immutable capability record for one class (or one class used as a static target)
#[derive(Debug)]
pub struct ClassDescriptor {
    target_class: Arc<HostClass>,
    static_mode: bool,
    collection_kind: CollectionKind,
    primitive_type: Option<PrimitiveType>,
    fields: IndexMap<String, FieldEntry>,
    methods: IndexMap<String, MethodGroup>,
    override_methods: FxHashSet<String>,
    getters_and_setters: bool,
    getter_prefixes: Vec<String>,
    setter_prefixes: Vec<String>,
}

impl ClassDescriptor {
    /// Build by walking the hierarchy of `class`.
    ///
    /// In static mode the static members of `class` are collected first,
    /// followed by the instance surface of the `Class` class itself.
    pub fn build(class: &Arc<HostClass>, static_mode: bool, config: &ProxyConfig) -> Self {
        let collection_kind = if static_mode {
            CollectionKind::None
        } else {
            class.collection_kind()
        };
        let mut descriptor = Self {
            target_class: class.clone(),
            static_mode,
            collection_kind,
            primitive_type: if static_mode {
                None
            } else {
                class.primitive_type()
            },
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            override_methods: config
                .override_methods_for(collection_kind)
                .iter()
                .cloned()
                .collect(),
            getters_and_setters: config.getters_and_setters,
            getter_prefixes: config.getter_prefixes.clone(),
            setter_prefixes: config.setter_prefixes.clone(),
        };
        if static_mode {
            descriptor.collect_members(class, true);
            descriptor.collect_members(&HostClass::class(), false);
        } else {
            descriptor.collect_members(class, false);
        }
        descriptor
    }

    fn collect_members(&mut self, class: &Arc<HostClass>, statics: bool) {
        for current in class.hierarchy() {
            for field in current
                .fields()
                .iter()
                .filter(|field| field.is_public() && field.is_static() == statics)
            {
                if !self.fields.contains_key(field.name()) {
                    self.fields.insert(
                        field.name().to_string(),
                        FieldEntry {
                            field: field.clone(),
                            owner: current.clone(),
                        },
                    );
                }
            }
            for method in current
                .methods()
                .iter()
                .filter(|method| method.is_public() && method.is_static() == statics)
            {
                self.methods
                    .entry(method.name().to_string())
                    .or_insert_with(|| MethodGroup::new(method.name()))
                    .add_if_absent(method);
            }
        }
    }

    /// Described class
    pub fn target_class(&self) -> &Arc<HostClass> {
        &self.target_class
    }

    /// Describes static members of a class reference?
    pub fn is_static(&self) -> bool {
        self.static_mode
    }

    /// Collection shape
    pub fn collection_kind(&self) -> CollectionKind {
        self.collection_kind
    }

    /// Primitive type for wrapper classes
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        self.primitive_type
    }

    /// Exposed fields in discovery order
    pub fn fields(&self) -> &IndexMap<String, FieldEntry> {
        &self.fields
    }

    /// Exposed methods in discovery order
    pub fn methods(&self) -> &IndexMap<String, MethodGroup> {
        &self.methods
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// Method group by name
    pub fn method(&self, name: &str) -> Option<&MethodGroup> {
        self.methods.get(name)
    }

    /// Method names answered by a polyfill instead
    pub fn override_methods(&self) -> &FxHashSet<String> {
        &self.override_methods
    }

    /// Is `name` claimed by a polyfill?
    pub fn is_override(&self, name: &str) -> bool {
        self.override_methods.contains(name)
    }

    /// Zero-argument getter backing property `name` (`getName`, `isName`)
    pub fn getter(&self, name: &str) -> Option<&HostMethod> {
        self.accessor(name, &self.getter_prefixes, 0)
    }

    /// One-argument setter backing property `name` (`setName`)
    pub fn setter(&self, name: &str) -> Option<&HostMethod> {
        self.accessor(name, &self.setter_prefixes, 1)
    }

    fn accessor(&self, name: &str, prefixes: &[String], arity: usize) -> Option<&HostMethod> {
        if !self.getters_and_setters {
            return None;
        }
        let mut chars = name.chars();
        let first = chars.next()?;
        let suffix: String = first.to_uppercase().chain(chars).collect();
        prefixes.iter().find_map(|prefix| {
            self.methods
                .get(&format!("{prefix}{suffix}"))
                .and_then(|group| group.overloads().iter().find(|m| m.arity() == Some(arity)))
        })
    }

    /// Property names contributed by getters, e.g. `name` for `getName()`
    pub fn getter_properties(&self) -> Vec<String> {
        if !self.getters_and_setters {
            return Vec::new();
        }
        let mut properties = Vec::new();
        for (name, group) in &self.methods {
            if !group.overloads().iter().any(|m| m.arity() == Some(0)) {
                continue;
            }
            for prefix in &self.getter_prefixes {
                let Some(rest) = name.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                let mut chars = rest.chars();
                if let Some(first) = chars.next().filter(|c| c.is_uppercase()) {
                    properties.push(first.to_lowercase().chain(chars).collect());
                    break;
                }
            }
        }
        properties
    }
}

// ============================================================================
// ClassDescriptorCache
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DescriptorKey {
    class_id: usize,
    static_mode: bool,
}

static GLOBAL_CACHE: LazyLock<Arc<ClassDescriptorCache>> =
    LazyLock::new(|| Arc::new(ClassDescriptorCache::new(ProxyConfig::default())));

/// Shared, build-once descriptor cache keyed by class identity.
///
/// The descriptor holds its class alive, so a cached class address is never
/// reused by another class.
pub struct ClassDescriptorCache {
    config: ProxyConfig,
    descriptors: DashMap<DescriptorKey, Arc<ClassDescriptor>>,
}

impl ClassDescriptorCache {
    /// Empty cache using `config` for every descriptor it builds
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            descriptors: DashMap::new(),
        }
    }

    /// The process-wide cache
    pub fn global() -> Arc<ClassDescriptorCache> {
        GLOBAL_CACHE.clone()
    }

    /// Configuration used for building
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Descriptor for `class`, building and publishing it on first use.
    ///
    /// Concurrent first calls publish exactly one descriptor; the shard lock
    /// is held while building, so no caller observes a partial one.
    pub fn get_or_build(&self, class: &Arc<HostClass>, static_mode: bool) -> Arc<ClassDescriptor> {
        let key = DescriptorKey {
            class_id: Arc::as_ptr(class) as usize,
            static_mode,
        };
        if let Some(descriptor) = self.descriptors.get(&key) {
            return descriptor.value().clone();
        }
        self.descriptors
            .entry(key)
            .or_insert_with(|| {
                let descriptor = ClassDescriptor::build(class, static_mode, &self.config);
                debug!(
                    class = class.name(),
                    static_mode,
                    kind = ?descriptor.collection_kind(),
                    fields = descriptor.fields().len(),
                    methods = descriptor.methods().len(),
                    "built class descriptor"
                );
                Arc::new(descriptor)
            })
            .value()
            .clone()
    }

    /// Descriptor for a proxy target: class references use the static
    /// descriptor of the referenced class, everything else its runtime class
    pub fn descriptor_for(&self, target: &HostValue) -> ProxyResult<Arc<ClassDescriptor>> {
        if let Some(class) = target.as_object().and_then(|object| object.as_class_ref()) {
            return Ok(self.get_or_build(class, true));
        }
        let class = target
            .class()
            .ok_or_else(|| ProxyError::internal(format!("Cannot describe {target}")))?;
        Ok(self.get_or_build(&class, false))
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
