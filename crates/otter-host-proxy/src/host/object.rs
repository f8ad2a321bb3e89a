//! Host object instances

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::descriptor::CollectionKind;
use crate::host::class::{ComponentType, HostClass};
use crate::host::value::HostValue;

/// Storage behind a host object, by shape
pub enum HostData {
    /// Plain object, state lives in fields only
    Plain,
    /// Ordered, index-addressable sequence
    List(RwLock<Vec<HostValue>>),
    /// Insertion-ordered set
    Set(RwLock<IndexSet<HostValue>>),
    /// Insertion-ordered map
    Map(RwLock<IndexMap<HostValue, HostValue>>),
    /// Fixed-length array; the component type comes from the class
    Array(RwLock<Vec<HostValue>>),
    /// Reference to a class, exposing its static members
    Class(Arc<HostClass>),
}

struct HostObjectInner {
    class: Arc<HostClass>,
    data: HostData,
    fields: RwLock<IndexMap<String, HostValue>>,
}

/// Shared handle to a host object. Equality is identity.
#[derive(Clone)]
pub struct HostObject(Arc<HostObjectInner>);

impl HostObject {
    /// Instantiate `class` with empty storage matching its shape
    pub fn new(class: Arc<HostClass>) -> Self {
        let data = match class.collection_kind() {
            CollectionKind::None => HostData::Plain,
            CollectionKind::List => HostData::List(RwLock::new(Vec::new())),
            CollectionKind::Set => HostData::Set(RwLock::new(IndexSet::new())),
            CollectionKind::Map => HostData::Map(RwLock::new(IndexMap::new())),
            CollectionKind::Array => HostData::Array(RwLock::new(Vec::new())),
        };
        Self::with_data(class, data)
    }

    /// Instantiate `class` with explicit storage
    pub fn with_data(class: Arc<HostClass>, data: HostData) -> Self {
        let mut fields = IndexMap::new();
        for current in class.hierarchy() {
            for field in current.fields().iter().filter(|field| !field.is_static()) {
                fields
                    .entry(field.name().to_string())
                    .or_insert(HostValue::Null);
            }
        }
        Self(Arc::new(HostObjectInner {
            class,
            data,
            fields: RwLock::new(fields),
        }))
    }

    /// A `List` holding `items`
    pub fn list(items: Vec<HostValue>) -> Self {
        Self::list_of(HostClass::list(), items)
    }

    /// A list-shaped instance of `class` holding `items`
    pub fn list_of(class: Arc<HostClass>, items: Vec<HostValue>) -> Self {
        Self::with_data(class, HostData::List(RwLock::new(items)))
    }

    /// A `Set` holding `values` in insertion order
    pub fn set(values: impl IntoIterator<Item = HostValue>) -> Self {
        Self::with_data(
            HostClass::set(),
            HostData::Set(RwLock::new(values.into_iter().collect())),
        )
    }

    /// A `Map` holding `entries` in insertion order
    pub fn map(entries: impl IntoIterator<Item = (HostValue, HostValue)>) -> Self {
        Self::with_data(
            HostClass::map(),
            HostData::Map(RwLock::new(entries.into_iter().collect())),
        )
    }

    /// An array of `component` holding `items`; items that do not fit the
    /// component type are replaced by its zero value
    pub fn array(component: ComponentType, items: Vec<HostValue>) -> Self {
        let items = items
            .into_iter()
            .map(|item| component.coerce(item).unwrap_or_else(|| component.default_value()))
            .collect();
        Self::with_data(
            HostClass::array(component),
            HostData::Array(RwLock::new(items)),
        )
    }

    /// A reference to `class` itself
    pub fn class_ref(class: Arc<HostClass>) -> Self {
        Self::with_data(HostClass::class(), HostData::Class(class))
    }

    /// Runtime class
    pub fn class(&self) -> &Arc<HostClass> {
        &self.0.class
    }

    /// Underlying storage
    pub fn data(&self) -> &HostData {
        &self.0.data
    }

    /// List storage
    pub fn as_list(&self) -> Option<&RwLock<Vec<HostValue>>> {
        match &self.0.data {
            HostData::List(items) => Some(items),
            _ => None,
        }
    }

    /// Set storage
    pub fn as_set(&self) -> Option<&RwLock<IndexSet<HostValue>>> {
        match &self.0.data {
            HostData::Set(values) => Some(values),
            _ => None,
        }
    }

    /// Map storage
    pub fn as_map(&self) -> Option<&RwLock<IndexMap<HostValue, HostValue>>> {
        match &self.0.data {
            HostData::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Array storage
    pub fn as_array(&self) -> Option<&RwLock<Vec<HostValue>>> {
        match &self.0.data {
            HostData::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Referenced class, for class references
    pub fn as_class_ref(&self) -> Option<&Arc<HostClass>> {
        match &self.0.data {
            HostData::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Array component type
    pub fn component_type(&self) -> Option<ComponentType> {
        self.0.class.component_type()
    }

    /// Element count for collection shapes
    pub fn len(&self) -> Option<usize> {
        match &self.0.data {
            HostData::List(items) | HostData::Array(items) => Some(items.read().len()),
            HostData::Set(values) => Some(values.read().len()),
            HostData::Map(entries) => Some(entries.read().len()),
            HostData::Plain | HostData::Class(_) => None,
        }
    }

    /// Read an instance field; `None` if the class declares no such field
    pub fn field(&self, name: &str) -> Option<HostValue> {
        self.0.fields.read().get(name).cloned()
    }

    /// Write an instance field; returns `false` if it is not declared
    pub fn set_field(&self, name: &str, value: HostValue) -> bool {
        match self.0.fields.write().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Same object?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the object
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

thread_local! {
    /// Collections currently being formatted on this thread
    static FORMATTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a collection as being formatted until dropped
struct FormatGuard;

impl FormatGuard {
    /// `None` when the collection is already being formatted further up the stack
    fn enter(id: usize) -> Option<Self> {
        FORMATTING.with_borrow_mut(|stack| {
            if stack.contains(&id) {
                None
            } else {
                stack.push(id);
                Some(FormatGuard)
            }
        })
    }
}

impl Drop for FormatGuard {
    fn drop(&mut self) {
        FORMATTING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a HostValue>,
) -> fmt::Result {
    f.write_str("[")?;
    for (index, item) in items.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _guard = match &self.0.data {
            HostData::Map(_) | HostData::List(_) | HostData::Array(_) | HostData::Set(_) => {
                match FormatGuard::enter(self.id()) {
                    Some(guard) => Some(guard),
                    None if matches!(self.0.data, HostData::Map(_)) => return f.write_str("(this Map)"),
                    None => return f.write_str("(this Collection)"),
                }
            }
            HostData::Plain | HostData::Class(_) => None,
        };
        match &self.0.data {
            HostData::List(items) | HostData::Array(items) => write_joined(f, items.read().iter()),
            HostData::Set(values) => write_joined(f, values.read().iter()),
            HostData::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.read().iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            }
            HostData::Class(class) => write!(f, "class {}", class.name()),
            HostData::Plain => write!(f, "{}@{:x}", self.0.class.name(), self.id()),
        }
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.0.class.name())
            .field("id", &format_args!("{:x}", self.id()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::class::HostField;

    #[test]
    fn test_new_matches_shape() {
        let list = HostObject::new(HostClass::list());
        assert_eq!(list.len(), Some(0));
        assert!(list.as_list().is_some());

        let plain = HostObject::new(HostClass::builder("Point").build());
        assert!(matches!(plain.data(), HostData::Plain));
        assert_eq!(plain.len(), None);
    }

    #[test]
    fn test_fields_include_inherited() {
        let base = HostClass::builder("Base")
            .field(HostField::new("id"))
            .build();
        let derived = HostClass::builder("Derived")
            .extends(&base)
            .field(HostField::new("name"))
            .build();
        let object = HostObject::new(derived);
        assert_eq!(object.field("id"), Some(HostValue::Null));
        assert!(object.set_field("name", "otter".into()));
        assert_eq!(object.field("name"), Some(HostValue::from("otter")));
        assert!(!object.set_field("missing", HostValue::Null));
    }

    #[test]
    fn test_array_coerces_items() {
        let array = HostObject::array(ComponentType::Int, vec![1.into(), "x".into()]);
        let items = array.as_array().unwrap().read().clone();
        assert_eq!(items, vec![HostValue::Integer(1), HostValue::Integer(0)]);
        assert_eq!(array.class().name(), "int[]");
    }

    #[test]
    fn test_display() {
        let list = HostObject::list(vec![1.into(), "a".into()]);
        assert_eq!(list.to_string(), "[1, a]");
        let map = HostObject::map([(HostValue::from("k"), HostValue::Integer(1))]);
        assert_eq!(map.to_string(), "{k=1}");
    }

    #[test]
    fn test_display_self_reference() {
        let list = HostObject::list(vec![1.into()]);
        list.as_list().unwrap().write().push(HostValue::from(list.clone()));
        assert_eq!(list.to_string(), "[1, (this Collection)]");
        assert_eq!(list.to_string(), "[1, (this Collection)]");

        let map = HostObject::map([(HostValue::from("k"), HostValue::Integer(1))]);
        map.as_map().unwrap().write().insert("self".into(), HostValue::from(map.clone()));
        assert_eq!(map.to_string(), "{k=1, self=(this Map)}");

        list.as_list().unwrap().write().clear();
        map.as_map().unwrap().write().clear();
    }
}
