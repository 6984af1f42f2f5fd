//! Integration tests for the value inspection engine
//!
//! Covers the observable output grammar: quoting, elision and empty
//! item markers, cycles, depth and budget truncation, determinism, and
//! the per-category renderings.

use std::rc::Rc;

use lyre::inspect::{
    inspect, inspect_with, Compact, Getters, InspectOptions, InspectReturn, IterData, IterKind,
    Property, ProxyData, Sorted, TypedArrayKind, Value, WeakSetData,
};

fn options() -> InspectOptions {
    InspectOptions::default()
}

// ============================================================================
// Spec examples
// ============================================================================

#[test]
fn test_canonical_examples() {
    assert_eq!(inspect(&Value::array(vec![1.into(), 2.into(), 3.into()])), "[ 1, 2, 3 ]");
    assert_eq!(inspect(&Value::object(vec![])), "{}");
    assert_eq!(
        inspect(&Value::set(vec![1.into(), 1.into(), 2.into()])),
        "Set { 1, 2 }"
    );
    assert_eq!(inspect(&Value::str("it's")), "\"it's\"");
}

#[test]
fn test_quote_fallback_to_escaped_single() {
    // Both quote styles plus a template-literal marker: every quote
    // style is taken, so single quotes win with escaping.
    let tricky = Value::str("'a' \"b\" ${c}");
    assert_eq!(inspect(&tricky), "'\\'a\\' \"b\" ${c}'");
}

#[test]
fn test_map_rendering() {
    let map = Value::map(vec![
        (Value::str("a"), 1.into()),
        (Value::str("b"), 2.into()),
    ]);
    assert_eq!(inspect(&map), "Map { \"a\" => 1, \"b\" => 2 }");
}

// ============================================================================
// Cycles and sharing
// ============================================================================

#[test]
fn test_self_referential_containers_terminate() {
    let arr = Value::array(vec![]);
    arr.push(arr.clone());
    assert_eq!(inspect(&arr), "[ [Circular] ]");

    let obj = Value::object(vec![("n", 1.into())]);
    obj.insert_prop("me", obj.clone());
    assert_eq!(inspect(&obj), "{ n: 1, me: [Circular] }");

    // Mutual cycle through two containers.
    let a = Value::object(vec![]);
    let b = Value::object(vec![("a", a.clone())]);
    a.insert_prop("b", b.clone());
    assert_eq!(inspect(&a), "{ b: { a: [Circular] } }");
}

#[test]
fn test_shared_non_circular_values_render_twice() {
    let shared = Value::array(vec![1.into()]);
    let outer = Value::array(vec![shared.clone(), shared]);
    assert_eq!(inspect(&outer), "[ [ 1 ], [ 1 ] ]");
}

// ============================================================================
// Depth and budget control
// ============================================================================

#[test]
fn test_depth_zero_never_renders_nested_structure() {
    let value = Value::object(vec![
        ("arr", Value::array(vec![1.into()])),
        ("obj", Value::object(vec![("x", 1.into())])),
        ("n", 7.into()),
    ]);
    let rendered = inspect_with(
        &value,
        &InspectOptions {
            depth: Some(0),
            ..options()
        },
    );
    assert_eq!(rendered, "{ arr: [Array], obj: [Object], n: 7 }");
}

#[test]
fn test_depth_null_renders_to_cycle_limit() {
    let mut value = Value::object(vec![("leaf", true.into())]);
    for _ in 0..20 {
        value = Value::object(vec![("next", value)]);
    }
    let rendered = inspect_with(
        &value,
        &InspectOptions {
            depth: None,
            ..options()
        },
    );
    assert!(rendered.contains("leaf: true"));
    assert!(!rendered.contains("[Object]"));
}

#[test]
fn test_output_budget_degrades_to_placeholders() {
    // Shared megabyte-sized leaves: rendered in full this would exceed
    // the output ceiling several times over, so structural descent
    // must degrade to placeholders partway through.
    let big = "x".repeat(1 << 20);
    let leaf = Value::array(vec![Value::Str(big)]);
    let wide = Value::array(vec![leaf; 200]);

    let rendered = inspect_with(
        &wide,
        &InspectOptions {
            max_array_length: None,
            ..options()
        },
    );
    assert!(rendered.contains("[Array]"), "expected budget placeholders");
    assert!(
        rendered.len() < (1 << 28),
        "output length {} exceeds the hard ceiling region",
        rendered.len()
    );
}

#[test]
fn test_determinism_for_identical_structures() {
    let build = || {
        Value::object(vec![
            ("bools", Value::array(vec![true.into(), false.into()])),
            ("nums", Value::array(vec![1.into(), 2.5.into(), (-0.0).into()])),
            ("strs", Value::array(vec!["a".into(), "it's".into()])),
        ])
    };
    let opts = InspectOptions {
        colors: true,
        show_hidden: true,
        ..options()
    };
    assert_eq!(inspect_with(&build(), &opts), inspect_with(&build(), &opts));
}

// ============================================================================
// Elision, holes, grouping
// ============================================================================

#[test]
fn test_long_array_elision_marker() {
    let items: Vec<Value> = (0..150).map(|i| Value::Num(i as f64)).collect();
    let rendered = inspect(&Value::array(items));
    assert!(rendered.contains("... 50 more items"));
    assert!(!rendered.contains("101"));
}

#[test]
fn test_sparse_array_empty_item_runs() {
    let slots = vec![
        Some(Value::Num(1.0)),
        None,
        None,
        Some(Value::Num(2.0)),
        None,
    ];
    let rendered = inspect(&Value::sparse_array(slots));
    assert_eq!(rendered, "[ 1, <2 empty items>, 2, <1 empty item> ]");
}

#[test]
fn test_wide_numeric_array_groups_into_columns() {
    let items: Vec<Value> = (0..26).map(|i| Value::Num(i as f64)).collect();
    let rendered = inspect(&Value::array(items));
    assert!(rendered.starts_with("[\n"));
    let rows: Vec<&str> = rendered.lines().filter(|l| l.contains(',')).collect();
    // Grouped into aligned rows, several entries per row.
    assert!(rows.len() > 1 && rows.len() < 26);
    assert!(rows[0].matches(',').count() > 1);
}

// ============================================================================
// Category renderings
// ============================================================================

#[test]
fn test_typed_array_rendering() {
    let floats = Value::typed_array(TypedArrayKind::Float64, vec![1.0, 2.5]);
    assert_eq!(inspect(&floats), "Float64Array [ 1, 2.5 ]");

    let bigs = Value::big_typed_array(TypedArrayKind::BigInt64, vec![1, 2]);
    assert_eq!(inspect(&bigs), "BigInt64Array [ 1n, 2n ]");

    let hidden = inspect_with(
        &Value::typed_array(TypedArrayKind::Uint8, vec![7.0]),
        &InspectOptions {
            show_hidden: true,
            ..options()
        },
    );
    assert!(hidden.contains("[BYTES_PER_ELEMENT]: 1"));
    assert!(hidden.contains("[length]: 1"));
}

#[test]
fn test_iterator_previews() {
    let iter = Value::Iter(Rc::new(IterData {
        kind: IterKind::Set,
        items: vec![1.into(), 2.into()],
    }));
    assert_eq!(inspect(&iter), "[Set Iterator] { 1, 2 }");
}

#[test]
fn test_weak_collections_hide_contents_by_default() {
    let weak = Value::WeakSet(Rc::new(WeakSetData {
        preview: vec![Value::str("b"), Value::str("a")],
    }));
    assert_eq!(inspect(&weak), "WeakSet { <items unknown> }");

    // The best-effort preview is sorted for reproducibility.
    let shown = inspect_with(
        &weak,
        &InspectOptions {
            show_hidden: true,
            ..options()
        },
    );
    assert_eq!(shown, "WeakSet { \"a\", \"b\" }");
}

#[test]
fn test_promise_states() {
    assert_eq!(inspect(&Value::promise_pending()), "Promise { <pending> }");
    assert_eq!(
        inspect(&Value::promise_fulfilled(42.into())),
        "Promise { 42 }"
    );
    assert_eq!(
        inspect(&Value::promise_rejected(Value::str("boom"))),
        "Promise { <rejected> \"boom\" }"
    );
}

#[test]
fn test_function_and_boxed_rendering() {
    assert_eq!(inspect(&Value::function("run")), "[Function: run]");
    assert_eq!(inspect(&Value::function("")), "[Function (anonymous)]");
    assert_eq!(inspect(&Value::class("Widget")), "[class Widget]");

    let tagged = Value::function("f");
    tagged.insert_prop("version", 2.into());
    assert_eq!(inspect(&tagged), "[Function: f] { version: 2 }");

    let boxed = Value::Boxed(Rc::new(lyre::inspect::BoxedData {
        class: "Number",
        value: Value::Num(3.0),
    }));
    assert_eq!(inspect(&boxed), "[Number: 3]");
}

#[test]
fn test_regex_and_date_rendering() {
    assert_eq!(inspect(&Value::regex("ab+c", "gi")), "/ab+c/gi");
    assert_eq!(
        inspect(&Value::Date(Some(0))),
        "1970-01-01T00:00:00.000Z"
    );
    assert_eq!(inspect(&Value::Date(None)), "Invalid Date");
}

#[test]
fn test_error_stack_reconciliation() {
    // Stack already prefixed by the label passes through.
    let traced = Value::error(
        "Error",
        "boom",
        Some("Error: boom\n    at main (app.js:1:1)"),
    );
    assert_eq!(inspect(&traced), "Error: boom\n    at main (app.js:1:1)");

    // No recognizable trace: wrapped in brackets.
    let bare = Value::error("Error", "boom", None);
    assert_eq!(inspect(&bare), "[Error: boom]");

    // Label missing from the stack text: spliced in.
    let mismatched = Value::error(
        "TypeError",
        "bad",
        Some("    at main (app.js:1:1)"),
    );
    let rendered = inspect(&mismatched);
    assert!(rendered.starts_with("TypeError: bad\n"));
    assert!(rendered.contains("    at main"));
}

// ============================================================================
// Hidden members, getters, custom hooks
// ============================================================================

#[test]
fn test_hidden_members_and_size_pseudo_property() {
    let value = Value::object_with_props(
        None,
        vec![
            Property::new("shown", 1.into()),
            Property::hidden("internal", 2.into()),
        ],
    );
    assert_eq!(inspect(&value), "{ shown: 1 }");
    let hidden = inspect_with(
        &value,
        &InspectOptions {
            show_hidden: true,
            ..options()
        },
    );
    assert_eq!(hidden, "{ shown: 1, [internal]: 2 }");

    let set = Value::set(vec![1.into(), 2.into()]);
    let shown = inspect_with(
        &set,
        &InspectOptions {
            show_hidden: true,
            ..options()
        },
    );
    assert_eq!(shown, "Set { 1, 2, [size]: 2 }");
}

#[test]
fn test_getter_rendering_modes() {
    let value = Value::object_with_props(
        None,
        vec![
            Property::getter("lazy", Rc::new(|| Ok(Value::Num(5.0)))),
            Property::setter("sink"),
            Property::getter_setter("both", Rc::new(|| Ok(Value::str("v")))),
        ],
    );

    assert_eq!(
        inspect(&value),
        "{ lazy: [Getter], sink: [Setter], both: [Getter/Setter] }"
    );

    let evaluated = inspect_with(
        &value,
        &InspectOptions {
            getters: Getters::All,
            ..options()
        },
    );
    assert!(evaluated.contains("lazy: [Getter: 5]"));
    assert!(evaluated.contains("both: [Getter/Setter: \"v\"]"));

    let get_only = inspect_with(
        &value,
        &InspectOptions {
            getters: Getters::Get,
            ..options()
        },
    );
    assert!(get_only.contains("lazy: [Getter: 5]"));
    assert!(get_only.contains("both: [Getter/Setter]"));
}

#[test]
fn test_getter_failure_is_contained() {
    let value = Value::object_with_props(
        None,
        vec![
            Property::getter("bad", Rc::new(|| Err("nope".to_string()))),
            Property::new("ok", 1.into()),
        ],
    );
    let rendered = inspect_with(
        &value,
        &InspectOptions {
            getters: Getters::All,
            ..options()
        },
    );
    // The failing accessor collapses inline; siblings still render.
    assert!(rendered.contains("bad: [Getter: <Inspection threw (nope)>]"));
    assert!(rendered.contains("ok: 1"));
}

#[test]
fn test_custom_hook_multiline_reindent() {
    let inner = Value::custom(None, Rc::new(|_| InspectReturn::Text("line1\nline2".into())));
    let outer = Value::object(vec![("v", inner)]);
    let rendered = inspect_with(
        &outer,
        &InspectOptions {
            compact: Compact::False,
            ..options()
        },
    );
    // Hook output spanning lines is re-indented to the nesting level.
    assert!(rendered.contains("line1\n  line2"));
}

// ============================================================================
// Layout options
// ============================================================================

#[test]
fn test_break_length_forces_multi_line() {
    let value = Value::object(vec![
        ("alpha", Value::str("0123456789")),
        ("beta", Value::str("0123456789")),
    ]);
    let narrow = inspect_with(
        &value,
        &InspectOptions {
            break_length: 20,
            ..options()
        },
    );
    assert!(narrow.contains('\n'));
    let wide = inspect_with(
        &value,
        &InspectOptions {
            break_length: 120,
            ..options()
        },
    );
    assert!(!wide.contains('\n'));
}

#[test]
fn test_long_string_wrapping() {
    let long = "word ".repeat(40);
    let rendered = inspect_with(
        &Value::Str(long.trim_end().to_string()),
        &InspectOptions {
            compact: Compact::False,
            ..options()
        },
    );
    assert!(rendered.contains(" +\n"));
}

#[test]
fn test_sorted_with_comparator() {
    let value = Value::object(vec![("a", 1.into()), ("b", 2.into()), ("c", 3.into())]);
    let rendered = inspect_with(
        &value,
        &InspectOptions {
            sorted: Sorted::Comparator(|a, b| b.cmp(a)),
            ..options()
        },
    );
    assert_eq!(rendered, "{ c: 3, b: 2, a: 1 }");
}

#[test]
fn test_proxy_detail_rendering() {
    let proxy = Value::Proxy(Rc::new(ProxyData {
        target: Value::object(vec![("x", 1.into())]),
        handler: Value::object(vec![]),
    }));
    assert_eq!(inspect(&proxy), "{ x: 1 }");
    assert_eq!(
        inspect_with(
            &proxy,
            &InspectOptions {
                show_proxy: true,
                ..options()
            }
        ),
        "Proxy [ { x: 1 }, {} ]"
    );
}
