//! List polyfills driven through the proxy `get` trap

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use otter_host_proxy::{HostValue, ProxyError, ScriptValue};
use proptest::prelude::*;

#[test]
fn test_at_counts_from_the_end() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3]));
    assert_eq!(call(&engine, &proxy, "at", &[(-1).into()]).unwrap(), ScriptValue::Integer(3));
    assert_eq!(call(&engine, &proxy, "at", &[0.into()]).unwrap(), ScriptValue::Integer(1));
    assert!(call(&engine, &proxy, "at", &[3.into()]).unwrap().is_undefined());
    assert!(call(&engine, &proxy, "at", &[(-4).into()]).unwrap().is_undefined());
}

proptest! {
    #[test]
    fn prop_at_is_defined_only_inside_bounds(
        items in prop::collection::vec(any::<i32>(), 0..12),
        index in -30i32..30,
    ) {
        let engine = engine();
        let (_list, proxy) = list_proxy(&engine, ints(&items));
        let length = items.len() as i32;
        let result = call(&engine, &proxy, "at", &[index.into()]).unwrap();
        if index >= -length && index < length {
            let resolved = if index < 0 { index + length } else { index };
            prop_assert_eq!(result, ScriptValue::Integer(items[resolved as usize]));
        } else {
            prop_assert!(result.is_undefined());
        }
    }
}

#[test]
fn test_copying_methods_do_not_mutate() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[3, 1, 2]));

    let reversed = call(&engine, &proxy, "toReversed", &[]).unwrap();
    assert_eq!(array_contents(&reversed), script_ints(&[2, 1, 3]));

    let sorted = call(&engine, &proxy, "toSorted", &[]).unwrap();
    assert_eq!(array_contents(&sorted), script_ints(&[1, 2, 3]));

    let spliced = call(&engine, &proxy, "toSpliced", &[0.into(), 1.into(), 9.into()]).unwrap();
    assert_eq!(array_contents(&spliced), script_ints(&[9, 1, 2]));

    let replaced = call(&engine, &proxy, "with", &[(-1).into(), "x".into()]).unwrap();
    assert_eq!(
        array_contents(&replaced),
        vec![ScriptValue::Integer(3), ScriptValue::Integer(1), ScriptValue::from("x")]
    );

    let sliced = call(&engine, &proxy, "slice", &[1.into()]).unwrap();
    assert_eq!(array_contents(&sliced), script_ints(&[1, 2]));

    assert_eq!(list_contents(&list), ints(&[3, 1, 2]));
}

#[test]
fn test_with_out_of_range() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3]));
    let err = call(&engine, &proxy, "with", &[5.into(), "x".into()]).unwrap_err();
    assert_eq!(err, ProxyError::range_error("Invalid index : 5"));
    assert_eq!(err.script_error_name(), "RangeError");
}

#[test]
fn test_reduce_of_empty_list_without_initial_value() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, Vec::new());
    let sum = callback(|args| ScriptValue::Integer(args[0].as_int() + args[1].as_int()));
    let err = call(&engine, &proxy, "reduce", &[sum.clone()]).unwrap_err();
    assert_eq!(
        err,
        ProxyError::type_error("Reduce of empty array with no initial value")
    );
    let err = call(&engine, &proxy, "reduceRight", &[sum.clone()]).unwrap_err();
    assert_eq!(err.message(), "Reduce of empty array with no initial value");

    let initial = call(&engine, &proxy, "reduce", &[sum, 7.into()]).unwrap();
    assert_eq!(initial, ScriptValue::Integer(7));
}

#[test]
fn test_reduce_single_element_skips_callback() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[42]));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let reducer = callback(move |args| {
        counter.fetch_add(1, Ordering::Relaxed);
        args[0].clone()
    });
    let result = call(&engine, &proxy, "reduce", &[reducer]).unwrap();
    assert_eq!(result, ScriptValue::Integer(42));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_reduce_and_reduce_right_order() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3]));
    let concat = callback(|args| ScriptValue::string(format!("{}{}", args[0], args[1])));
    assert_eq!(
        call(&engine, &proxy, "reduce", &[concat.clone()]).unwrap(),
        ScriptValue::from("123")
    );
    assert_eq!(
        call(&engine, &proxy, "reduceRight", &[concat.clone()]).unwrap(),
        ScriptValue::from("321")
    );
    assert_eq!(
        call(&engine, &proxy, "reduce", &[concat, "x".into()]).unwrap(),
        ScriptValue::from("x123")
    );
}

#[test]
fn test_reduce_releases_intermediate_accumulators() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4]));
    let sum = callback(|args| ScriptValue::Integer(args[0].as_int() + args[1].as_int()));
    let result = call(&engine, &proxy, "reduce", &[sum]).unwrap();
    assert_eq!(result, ScriptValue::Integer(10));
    // The first element and two of the three partial sums are released; the
    // final sum is returned.
    assert_eq!(engine.released_count(), 3);
}

#[test]
fn test_splice_removes_and_inserts() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4, 5]));
    let removed = call(&engine, &proxy, "splice", &[1.into(), 2.into()]).unwrap();
    assert_eq!(array_contents(&removed), script_ints(&[2, 3]));
    assert_eq!(list_contents(&list), ints(&[1, 4, 5]));

    let removed = call(&engine, &proxy, "splice", &[1.into(), 0.into(), 8.into(), 9.into()]).unwrap();
    assert!(array_contents(&removed).is_empty());
    assert_eq!(list_contents(&list), ints(&[1, 8, 9, 4, 5]));

    let removed = call(&engine, &proxy, "splice", &[]).unwrap();
    assert!(array_contents(&removed).is_empty());

    let err = call(&engine, &proxy, "splice", &[5.into()]).unwrap_err();
    assert_eq!(err, ProxyError::range_error("Start 5 is out of range"));
}

#[test]
fn test_copy_within() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4, 5]));
    let result = call(&engine, &proxy, "copyWithin", &[0.into(), 3.into()]).unwrap();
    assert_eq!(result, proxy);
    assert_eq!(list_contents(&list), ints(&[4, 5, 3, 4, 5]));

    let (list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4, 5]));
    call(&engine, &proxy, "copyWithin", &[(-2).into(), 0.into(), 2.into()]).unwrap();
    assert_eq!(list_contents(&list), ints(&[1, 2, 3, 1, 2]));
}

#[test]
fn test_fill() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4, 5]));
    let result = call(&engine, &proxy, "fill", &[0.into(), 1.into(), 3.into()]).unwrap();
    assert_eq!(result, proxy);
    assert_eq!(list_contents(&list), ints(&[1, 0, 0, 4, 5]));

    call(&engine, &proxy, "fill", &[7.into()]).unwrap();
    assert_eq!(list_contents(&list), ints(&[7, 7, 7, 7, 7]));
}

#[test]
fn test_fill_without_arguments_keeps_list() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[1, 2, 3]));
    assert_eq!(call(&engine, &proxy, "fill", &[]).unwrap(), proxy);
    assert_eq!(list_contents(&list), ints(&[1, 2, 3]));
}

#[test]
fn test_self_containing_list() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[1]));
    list.as_list().unwrap().write().push(HostValue::from(list.clone()));

    assert_eq!(
        call(&engine, &proxy, "join", &[]).unwrap(),
        ScriptValue::from("1,[1, (this Collection)]")
    );

    call(&engine, &proxy, "sort", &[]).unwrap();
    let contents = list_contents(&list);
    assert_eq!(contents[0], HostValue::Integer(1));
    assert!(matches!(&contents[1], HostValue::Object(inner) if inner.ptr_eq(&list)));

    list.as_list().unwrap().write().clear();
}

#[test]
fn test_sort_with_and_without_comparator() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[10, 9, 1, 100]));
    call(&engine, &proxy, "sort", &[]).unwrap();
    assert_eq!(list_contents(&list), ints(&[1, 10, 100, 9]));

    let descending = callback(|args| ScriptValue::Integer(args[1].as_int() - args[0].as_int()));
    let result = call(&engine, &proxy, "sort", &[descending]).unwrap();
    assert_eq!(result, proxy);
    assert_eq!(list_contents(&list), ints(&[100, 10, 9, 1]));
}

#[test]
fn test_sort_comparator_failure_is_reraised() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[2, 1]));
    let failing = ScriptValue::function("failing", |_engine, _this, _args| {
        Err(ProxyError::type_error("comparator broke"))
    });
    let err = call(&engine, &proxy, "sort", &[failing.clone()]).unwrap_err();
    assert_eq!(err, ProxyError::error("comparator broke"));
    assert_eq!(list_contents(&list), ints(&[2, 1]));

    let err = call(&engine, &proxy, "toSorted", &[failing]).unwrap_err();
    assert_eq!(err.script_error_name(), "Error");
}

#[test]
fn test_callback_walks() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 4]));
    let even = callback(|args| ScriptValue::Boolean(args[0].as_int() % 2 == 0));
    let positive = callback(|args| ScriptValue::Boolean(args[0].as_int() > 0));

    assert_eq!(call(&engine, &proxy, "every", &[positive.clone()]).unwrap(), ScriptValue::Boolean(true));
    assert_eq!(call(&engine, &proxy, "every", &[even.clone()]).unwrap(), ScriptValue::Boolean(false));
    assert_eq!(call(&engine, &proxy, "some", &[even.clone()]).unwrap(), ScriptValue::Boolean(true));

    let filtered = call(&engine, &proxy, "filter", &[even.clone()]).unwrap();
    assert_eq!(array_contents(&filtered), script_ints(&[2, 4]));

    assert_eq!(call(&engine, &proxy, "find", &[even.clone()]).unwrap(), ScriptValue::Integer(2));
    assert_eq!(call(&engine, &proxy, "findIndex", &[even.clone()]).unwrap(), ScriptValue::Integer(1));
    assert_eq!(call(&engine, &proxy, "findLast", &[even.clone()]).unwrap(), ScriptValue::Integer(4));
    assert_eq!(call(&engine, &proxy, "findLastIndex", &[even]).unwrap(), ScriptValue::Integer(3));

    let never = callback(|_| ScriptValue::Boolean(false));
    assert!(call(&engine, &proxy, "find", &[never.clone()]).unwrap().is_undefined());
    assert_eq!(call(&engine, &proxy, "findIndex", &[never.clone()]).unwrap(), ScriptValue::Integer(-1));
    assert_eq!(call(&engine, &proxy, "findLastIndex", &[never]).unwrap(), ScriptValue::Integer(-1));
}

#[test]
fn test_callback_receives_element_index_and_list() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[5, 6]));
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorder = {
        let seen = seen.clone();
        ScriptValue::function("recorder", move |_engine, this, args| {
            seen.lock().push((args[0].clone(), args[1].clone(), args[2].clone(), this.clone()));
            Ok(ScriptValue::Undefined)
        })
    };
    let this_arg = ScriptValue::array(Vec::new());
    let result = call(&engine, &proxy, "forEach", &[recorder, this_arg.clone()]).unwrap();
    assert!(result.is_undefined());

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].0, ScriptValue::Integer(6));
    assert_eq!(seen[1].1, ScriptValue::Integer(1));
    assert_eq!(seen[1].2, proxy);
    assert_eq!(seen[1].3, this_arg);
}

#[test]
fn test_non_callable_callback() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1]));
    let err = call(&engine, &proxy, "map", &[1.into()]).unwrap_err();
    assert_eq!(err, ProxyError::type_error("1 is not a function"));
    let err = call(&engine, &proxy, "forEach", &[]).unwrap_err();
    assert_eq!(err.message(), "undefined is not a function");
}

#[test]
fn test_map_keeps_results_and_releases_nothing() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3]));
    let double = callback(|args| ScriptValue::Integer(args[0].as_int() * 2));
    let mapped = call(&engine, &proxy, "map", &[double]).unwrap();
    assert_eq!(array_contents(&mapped), script_ints(&[2, 4, 6]));
    assert_eq!(engine.released_count(), 0);

    let noop = callback(|_| ScriptValue::Undefined);
    call(&engine, &proxy, "forEach", &[noop]).unwrap();
    assert_eq!(engine.released_count(), 3);
}

#[test]
fn test_searches() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2, 3, 2, 1]));
    assert_eq!(call(&engine, &proxy, "includes", &[3.into()]).unwrap(), ScriptValue::Boolean(true));
    assert_eq!(
        call(&engine, &proxy, "includes", &[3.into(), 3.into()]).unwrap(),
        ScriptValue::Boolean(false)
    );
    assert_eq!(call(&engine, &proxy, "indexOf", &[2.into()]).unwrap(), ScriptValue::Integer(1));
    assert_eq!(
        call(&engine, &proxy, "indexOf", &[2.into(), (-2).into()]).unwrap(),
        ScriptValue::Integer(3)
    );
    assert_eq!(call(&engine, &proxy, "indexOf", &[7.into()]).unwrap(), ScriptValue::Integer(-1));
    assert_eq!(call(&engine, &proxy, "lastIndexOf", &[2.into()]).unwrap(), ScriptValue::Integer(3));
    assert_eq!(
        call(&engine, &proxy, "lastIndexOf", &[2.into(), 2.into()]).unwrap(),
        ScriptValue::Integer(1)
    );
    assert_eq!(
        call(&engine, &proxy, "lastIndexOf", &[1.into(), (-9).into()]).unwrap(),
        ScriptValue::Integer(-1)
    );
    assert_eq!(call(&engine, &proxy, "includes", &[]).unwrap(), ScriptValue::Boolean(false));
}

#[test]
fn test_stack_and_queue_methods() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, ints(&[2]));
    assert_eq!(call(&engine, &proxy, "push", &[3.into(), 4.into()]).unwrap(), ScriptValue::Integer(3));
    assert_eq!(call(&engine, &proxy, "unshift", &[0.into(), 1.into()]).unwrap(), ScriptValue::Integer(5));
    assert_eq!(list_contents(&list), ints(&[0, 1, 2, 3, 4]));
    assert_eq!(call(&engine, &proxy, "pop", &[]).unwrap(), ScriptValue::Integer(4));
    assert_eq!(call(&engine, &proxy, "shift", &[]).unwrap(), ScriptValue::Integer(0));
    assert_eq!(get(&engine, &proxy, "length"), ScriptValue::Integer(3));
    assert_eq!(get(&engine, &proxy, "size"), ScriptValue::Integer(3));

    let result = call(&engine, &proxy, "reverse", &[]).unwrap();
    assert_eq!(result, proxy);
    assert_eq!(list_contents(&list), ints(&[3, 2, 1]));

    let (_empty, empty) = list_proxy(&engine, Vec::new());
    assert!(call(&engine, &empty, "pop", &[]).unwrap().is_undefined());
    assert!(call(&engine, &empty, "shift", &[]).unwrap().is_undefined());
}

#[test]
fn test_join_and_to_json() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, vec![1.into(), HostValue::Null, "a".into()]);
    assert_eq!(call(&engine, &proxy, "join", &[]).unwrap(), ScriptValue::from("1,,a"));
    assert_eq!(call(&engine, &proxy, "join", &[" | ".into()]).unwrap(), ScriptValue::from("1 |  | a"));
    let json = call(&engine, &proxy, "toJSON", &[]).unwrap();
    assert_eq!(
        array_contents(&json),
        vec![ScriptValue::Integer(1), ScriptValue::Null, ScriptValue::from("a")]
    );
}

#[test]
fn test_concat_flattens_one_level() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1]));
    let (_other, other) = list_proxy(&engine, ints(&[4, 5]));
    let nested = ScriptValue::array(vec![ScriptValue::array(script_ints(&[7]))]);
    let result = call(
        &engine,
        &proxy,
        "concat",
        &[ScriptValue::array(script_ints(&[2, 3])), other, 6.into(), nested],
    )
    .unwrap();
    let items = array_contents(&result);
    assert_eq!(items[..6].to_vec(), script_ints(&[1, 2, 3, 4, 5, 6]));
    assert_eq!(items.len(), 7);
    assert_eq!(array_contents(&items[6]), script_ints(&[7]));
}

#[test]
fn test_iterators_snapshot_contents() {
    let engine = engine();
    let (list, proxy) = list_proxy(&engine, vec!["a".into(), "b".into()]);
    let values = call(&engine, &proxy, "values", &[]).unwrap();
    let keys = call(&engine, &proxy, "keys", &[]).unwrap();
    let entries = call(&engine, &proxy, "entries", &[]).unwrap();
    list.as_list().unwrap().write().push("c".into());

    assert_eq!(drain(&engine, &values), vec![ScriptValue::from("a"), ScriptValue::from("b")]);
    assert_eq!(drain(&engine, &keys), script_ints(&[0, 1]));
    let entries: Vec<Vec<ScriptValue>> = drain(&engine, &entries).iter().map(array_contents).collect();
    assert_eq!(entries[1], vec![ScriptValue::Integer(1), ScriptValue::from("b")]);
}

#[test]
fn test_engine_sees_every_call() {
    let engine = engine();
    let (_list, proxy) = list_proxy(&engine, ints(&[1, 2]));
    let identity = callback(|args| args[0].clone());
    call(&engine, &proxy, "map", &[identity]).unwrap();
    // One call for `map` itself plus one per element.
    assert_eq!(engine.call_count(), 3);
}
