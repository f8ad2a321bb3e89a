//! Built-in host classes
//!
//! Each class is built once per process and shared.

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;

use crate::descriptor::CollectionKind;
use crate::error::{ProxyError, ProxyResult};
use crate::host::class::{ComponentType, HostClass, HostMethod, PrimitiveType};
use crate::host::object::HostObject;
use crate::host::value::HostValue;

static OBJECT_CLASS: LazyLock<Arc<HostClass>> = LazyLock::new(|| {
    HostClass::builder("Object")
        .root()
        .method(HostMethod::new("toString", 0, |receiver, _args| {
            Ok(HostValue::String(receiver.to_string()))
        }))
        .method(HostMethod::new("hashCode", 0, |receiver, _args| {
            Ok(HostValue::Integer(receiver.hash_code()))
        }))
        .method(HostMethod::new("equals", 1, |receiver, args| {
            Ok(HostValue::Boolean(args.first() == Some(receiver)))
        }))
        .build()
});

static CLASS_CLASS: LazyLock<Arc<HostClass>> = LazyLock::new(|| {
    HostClass::builder("Class")
        .method(HostMethod::new("getName", 0, |receiver, _args| {
            let class = receiver
                .as_object()
                .and_then(HostObject::as_class_ref)
                .ok_or_else(|| receiver_error("Class", receiver))?;
            Ok(HostValue::String(class.name().to_string()))
        }))
        .build()
});

static LIST_CLASS: LazyLock<Arc<HostClass>> = LazyLock::new(|| {
    HostClass::builder("List")
        .shape(CollectionKind::List)
        .method(HostMethod::new("add", 1, |receiver, args| {
            list_of(receiver)?.write().push(arg(args, 0));
            Ok(HostValue::Boolean(true))
        }))
        .method(HostMethod::new("add", 2, |receiver, args| {
            let items = list_of(receiver)?;
            let mut items = items.write();
            let index = index_arg(args, 0, items.len() + 1)?;
            items.insert(index, arg(args, 1));
            Ok(HostValue::Null)
        }))
        .method(HostMethod::new("get", 1, |receiver, args| {
            let items = list_of(receiver)?.read();
            let index = index_arg(args, 0, items.len())?;
            Ok(items[index].clone())
        }))
        .method(HostMethod::new("set", 2, |receiver, args| {
            let mut items = list_of(receiver)?.write();
            let index = index_arg(args, 0, items.len())?;
            Ok(std::mem::replace(&mut items[index], arg(args, 1)))
        }))
        .method(HostMethod::new("remove", 1, |receiver, args| {
            let mut items = list_of(receiver)?.write();
            let index = index_arg(args, 0, items.len())?;
            Ok(items.remove(index))
        }))
        .method(HostMethod::new("size", 0, |receiver, _args| {
            Ok(size_value(list_of(receiver)?.read().len()))
        }))
        .method(HostMethod::new("isEmpty", 0, |receiver, _args| {
            Ok(HostValue::Boolean(list_of(receiver)?.read().is_empty()))
        }))
        .method(HostMethod::new("clear", 0, |receiver, _args| {
            list_of(receiver)?.write().clear();
            Ok(HostValue::Null)
        }))
        .method(HostMethod::new("contains", 1, |receiver, args| {
            let needle = arg(args, 0);
            Ok(HostValue::Boolean(list_of(receiver)?.read().contains(&needle)))
        }))
        .method(HostMethod::new("indexOf", 1, |receiver, args| {
            let needle = arg(args, 0);
            let position = list_of(receiver)?
                .read()
                .iter()
                .position(|item| *item == needle);
            Ok(position.map_or(HostValue::Integer(-1), size_value))
        }))
        .build()
});

static SET_CLASS: LazyLock<Arc<HostClass>> = LazyLock::new(|| {
    HostClass::builder("Set")
        .shape(CollectionKind::Set)
        .method(HostMethod::new("add", 1, |receiver, args| {
            let (_, inserted) = set_of(receiver)?.write().insert_full(arg(args, 0));
            Ok(HostValue::Boolean(inserted))
        }))
        .method(HostMethod::new("remove", 1, |receiver, args| {
            let removed = set_of(receiver)?.write().shift_remove(&arg(args, 0));
            Ok(HostValue::Boolean(removed))
        }))
        .method(HostMethod::new("contains", 1, |receiver, args| {
            Ok(HostValue::Boolean(set_of(receiver)?.read().contains(&arg(args, 0))))
        }))
        .method(HostMethod::new("size", 0, |receiver, _args| {
            Ok(size_value(set_of(receiver)?.read().len()))
        }))
        .method(HostMethod::new("isEmpty", 0, |receiver, _args| {
            Ok(HostValue::Boolean(set_of(receiver)?.read().is_empty()))
        }))
        .method(HostMethod::new("clear", 0, |receiver, _args| {
            set_of(receiver)?.write().clear();
            Ok(HostValue::Null)
        }))
        .build()
});

static MAP_CLASS: LazyLock<Arc<HostClass>> = LazyLock::new(|| {
    HostClass::builder("Map")
        .shape(CollectionKind::Map)
        .method(HostMethod::new("get", 1, |receiver, args| {
            let value = map_of(receiver)?.read().get(&arg(args, 0)).cloned();
            Ok(value.unwrap_or(HostValue::Null))
        }))
        .method(HostMethod::new("put", 2, |receiver, args| {
            let previous = map_of(receiver)?.write().insert(arg(args, 0), arg(args, 1));
            Ok(previous.unwrap_or(HostValue::Null))
        }))
        .method(HostMethod::new("remove", 1, |receiver, args| {
            let previous = map_of(receiver)?.write().shift_remove(&arg(args, 0));
            Ok(previous.unwrap_or(HostValue::Null))
        }))
        .method(HostMethod::new("containsKey", 1, |receiver, args| {
            Ok(HostValue::Boolean(map_of(receiver)?.read().contains_key(&arg(args, 0))))
        }))
        .method(HostMethod::new("size", 0, |receiver, _args| {
            Ok(size_value(map_of(receiver)?.read().len()))
        }))
        .method(HostMethod::new("isEmpty", 0, |receiver, _args| {
            Ok(HostValue::Boolean(map_of(receiver)?.read().is_empty()))
        }))
        .method(HostMethod::new("clear", 0, |receiver, _args| {
            map_of(receiver)?.write().clear();
            Ok(HostValue::Null)
        }))
        .build()
});

static ARRAY_CLASSES: LazyLock<FxHashMap<ComponentType, Arc<HostClass>>> = LazyLock::new(|| {
    ComponentType::ALL
        .into_iter()
        .map(|component| {
            let class = HostClass::builder(format!("{}[]", component.name()))
                .component(component)
                .build();
            (component, class)
        })
        .collect()
});

static PRIMITIVE_CLASSES: LazyLock<[Arc<HostClass>; 10]> = LazyLock::new(|| {
    PrimitiveType::ALL.map(|primitive| {
        HostClass::builder(primitive.class_name())
            .primitive(primitive)
            .build()
    })
});

pub(crate) fn object_class() -> Arc<HostClass> {
    OBJECT_CLASS.clone()
}

pub(crate) fn class_class() -> Arc<HostClass> {
    CLASS_CLASS.clone()
}

pub(crate) fn list_class() -> Arc<HostClass> {
    LIST_CLASS.clone()
}

pub(crate) fn set_class() -> Arc<HostClass> {
    SET_CLASS.clone()
}

pub(crate) fn map_class() -> Arc<HostClass> {
    MAP_CLASS.clone()
}

pub(crate) fn array_class(component: ComponentType) -> Arc<HostClass> {
    match ARRAY_CLASSES.get(&component) {
        Some(class) => class.clone(),
        None => HostClass::builder(format!("{}[]", component.name()))
            .component(component)
            .build(),
    }
}

pub(crate) fn primitive_class(primitive: PrimitiveType) -> Arc<HostClass> {
    PRIMITIVE_CLASSES[primitive as usize].clone()
}

// ============================================================================
// Receiver helpers
// ============================================================================

fn receiver_error(expected: &str, receiver: &HostValue) -> ProxyError {
    ProxyError::type_error(format!("Receiver {receiver} is not an instance of {expected}"))
}

fn list_of(receiver: &HostValue) -> ProxyResult<&parking_lot::RwLock<Vec<HostValue>>> {
    receiver
        .as_object()
        .and_then(HostObject::as_list)
        .ok_or_else(|| receiver_error("List", receiver))
}

fn set_of(
    receiver: &HostValue,
) -> ProxyResult<&parking_lot::RwLock<indexmap::IndexSet<HostValue>>> {
    receiver
        .as_object()
        .and_then(HostObject::as_set)
        .ok_or_else(|| receiver_error("Set", receiver))
}

fn map_of(
    receiver: &HostValue,
) -> ProxyResult<&parking_lot::RwLock<indexmap::IndexMap<HostValue, HostValue>>> {
    receiver
        .as_object()
        .and_then(HostObject::as_map)
        .ok_or_else(|| receiver_error("Map", receiver))
}

fn arg(args: &[HostValue], index: usize) -> HostValue {
    args.get(index).cloned().unwrap_or(HostValue::Null)
}

fn index_arg(args: &[HostValue], index: usize, length: usize) -> ProxyResult<usize> {
    let value = arg(args, index);
    match value.as_index() {
        Some(i) if i < length => Ok(i),
        _ => Err(ProxyError::range_error(format!(
            "Index {value} out of bounds for length {length}"
        ))),
    }
}

fn size_value(size: usize) -> HostValue {
    HostValue::Integer(i32::try_from(size).unwrap_or(i32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_methods() {
        let list = HostValue::from(HostObject::list(vec![1.into(), 2.into()]));
        let class = HostClass::list();
        let add = class
            .methods()
            .iter()
            .find(|m| m.name() == "add" && m.accepts(1))
            .unwrap();
        add.invoke(&list, &[3.into()]).unwrap();
        let size = class.methods().iter().find(|m| m.name() == "size").unwrap();
        assert_eq!(size.invoke(&list, &[]).unwrap(), HostValue::Integer(3));

        let get = class.methods().iter().find(|m| m.name() == "get").unwrap();
        let err = get.invoke(&list, &[7.into()]).unwrap_err();
        assert_eq!(err.message(), "Index 7 out of bounds for length 3");
    }

    #[test]
    fn test_builtin_classes_are_shared() {
        assert!(Arc::ptr_eq(&HostClass::list(), &HostClass::list()));
        assert!(Arc::ptr_eq(
            &HostClass::array(ComponentType::Int),
            &HostClass::array(ComponentType::Int)
        ));
        assert_eq!(HostClass::array(ComponentType::Int).name(), "int[]");
        assert_eq!(
            HostClass::primitive(PrimitiveType::Long).primitive_type(),
            Some(PrimitiveType::Long)
        );
    }

    #[test]
    fn test_class_get_name() {
        let target = HostValue::from(HostObject::class_ref(HostClass::map()));
        let get_name = &CLASS_CLASS.methods()[0];
        assert_eq!(get_name.invoke(&target, &[]).unwrap(), HostValue::from("Map"));
    }
}
