//! Value inspection engine
//!
//! Produces a deterministic, bounded, human-oriented text rendering of
//! an arbitrary [`Value`], handling cycles, special object categories,
//! and configurable layout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    INSPECTION ENGINE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  format_value: category dispatch over the Value union       │
//! │  containers: per-category structural formatters             │
//! │  primitives: string escaping, number formatting             │
//! │  layout: line breaking, column grouping, string wrapping    │
//! │  style: ANSI styling hook                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! One mutable [`Ctx`] is threaded through the recursive walk: depth,
//! indentation, the seen stack for cycle detection, and a per-level
//! character budget bounding worst-case output on hostile inputs.

pub mod containers;
pub mod layout;
pub mod primitives;
pub mod style;
pub mod value;

pub use style::Style;
pub use value::{
    Accessor, BoxedData, DataViewData, ErrorData, FunctionData, InspectHook, InspectReturn,
    IterData, IterKind, ObjectData, PromiseState, PropKey, PropValue, Property, ProxyData,
    RegexData, TypedArrayData, TypedArrayKind, TypedElements, Value, WeakMapData, WeakSetData,
};

use std::collections::HashMap;

use value::Value as V;

/// Hard ceiling on total rendered characters per indentation level;
/// beyond it structural descent degrades to shallow placeholders.
pub(crate) const TOTAL_BUDGET: usize = 1 << 27;

/// Internal recursion ceiling, independent of the user depth option.
pub(crate) const RECURSION_CEILING: u32 = 200;

/// Single-line packing aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compact {
    /// Pack onto one line whenever the break length allows.
    True,
    /// One entry per line, always.
    False,
    /// Pack entries within this many levels of the deepest nesting.
    Level(u32),
}

/// Stable sorting of object member output.
#[derive(Clone, Copy)]
pub enum Sorted {
    None,
    /// Lexicographic order.
    Default,
    /// A caller-supplied comparator over rendered entries.
    Comparator(fn(&str, &str) -> std::cmp::Ordering),
}

/// Which accessors to evaluate while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Getters {
    None,
    /// Getters without a corresponding setter.
    Get,
    /// Getters that have a corresponding setter.
    Set,
    All,
}

/// User-configurable inspection options.
#[derive(Clone)]
pub struct InspectOptions {
    /// Include non-enumerable members and internal pseudo-properties.
    pub show_hidden: bool,
    /// Maximum recursion depth; `None` is unlimited.
    pub depth: Option<u32>,
    /// Apply ANSI styling.
    pub colors: bool,
    /// Honor per-value custom rendering hooks.
    pub custom_inspect: bool,
    /// Render proxy wrapper detail instead of unwrapping transparently.
    pub show_proxy: bool,
    /// Per-container element cap; `None` is unlimited.
    pub max_array_length: Option<usize>,
    /// Single-line width budget.
    pub break_length: usize,
    pub compact: Compact,
    pub sorted: Sorted,
    pub getters: Getters,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            depth: Some(2),
            colors: false,
            custom_inspect: true,
            show_proxy: false,
            max_array_length: Some(100),
            break_length: 60,
            compact: Compact::Level(3),
            sorted: Sorted::None,
            getters: Getters::None,
        }
    }
}

/// Per-call formatting context, threaded by reference through the
/// recursive walk and discarded when the call returns.
pub(crate) struct Ctx<'a> {
    pub(crate) opts: &'a InspectOptions,
    /// Identities currently being rendered; a repeat is a cycle.
    pub(crate) seen: Vec<usize>,
    pub(crate) indentation_lvl: usize,
    /// Rendered characters accumulated per indentation level.
    pub(crate) budget: HashMap<usize, usize>,
    /// Sticky flag: the output budget is exhausted.
    pub(crate) stop: bool,
    /// Depth of the most recently entered structural value.
    pub(crate) current_depth: u32,
    /// Live recursion frames, for the internal ceiling.
    pub(crate) frames: u32,
}

impl<'a> Ctx<'a> {
    pub(crate) fn new(opts: &'a InspectOptions) -> Self {
        Self {
            opts,
            seen: Vec::new(),
            indentation_lvl: 0,
            budget: HashMap::new(),
            stop: false,
            current_depth: 0,
            frames: 0,
        }
    }

    pub(crate) fn stylize(&self, text: &str, style: Style) -> String {
        style::stylize(self.opts.colors, text, style)
    }
}

/// Render `value` with default options.
pub fn inspect(value: &Value) -> String {
    inspect_with(value, &InspectOptions::default())
}

/// Render `value` with the given options.
pub fn inspect_with(value: &Value, options: &InspectOptions) -> String {
    let mut ctx = Ctx::new(options);
    format_value(&mut ctx, value, 0)
}

/// Recursive dispatcher over value categories.
///
/// Precedence: primitives, the recursion ceiling, the exhausted-budget
/// placeholder, proxy unwrapping, custom-inspection hooks, circular
/// references, then the per-category structural formatter.
pub(crate) fn format_value(ctx: &mut Ctx, value: &Value, depth: u32) -> String {
    if value.is_primitive() {
        return primitives::format_primitive(ctx, value);
    }

    if ctx.frames >= RECURSION_CEILING {
        return ctx.stylize(
            &format!("[{}: Inspection interrupted prematurely]", value.class_label()),
            Style::Special,
        );
    }

    if ctx.stop {
        return ctx.stylize(&format!("[{}]", value.class_label()), Style::Special);
    }

    if let V::Proxy(proxy) = value {
        if !ctx.opts.show_proxy {
            let target = proxy.target.clone();
            return format_value(ctx, &target, depth);
        }
    }

    if ctx.opts.custom_inspect {
        if let V::Object(obj) = value {
            if let Some(hook) = obj.custom_inspect.clone() {
                let remaining = ctx.opts.depth.map(|d| d.saturating_sub(depth));
                match (*hook)(remaining) {
                    InspectReturn::Text(text) => {
                        // Re-indent multi-line hook output to the
                        // current level.
                        let indent = format!("\n{}", " ".repeat(ctx.indentation_lvl));
                        return text.replace('\n', &indent);
                    }
                    InspectReturn::Val(replacement) => {
                        let same = match (replacement.identity(), value.identity()) {
                            (Some(a), Some(b)) => a == b,
                            _ => false,
                        };
                        if !same {
                            return format_value(ctx, &replacement, depth);
                        }
                        // The hook handed back the value itself; fall
                        // through to structural formatting.
                    }
                }
            }
        }
    }

    if let Some(id) = value.identity() {
        if ctx.seen.contains(&id) {
            return ctx.stylize("[Circular]", Style::Special);
        }
    }

    containers::format_raw(ctx, value, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_primitive_rendering() {
        assert_eq!(inspect(&Value::Undefined), "undefined");
        assert_eq!(inspect(&Value::Null), "null");
        assert_eq!(inspect(&Value::Bool(true)), "true");
        assert_eq!(inspect(&Value::Num(42.0)), "42");
        assert_eq!(inspect(&Value::Num(-0.0)), "-0");
        assert_eq!(inspect(&Value::BigInt(9)), "9n");
        assert_eq!(inspect(&Value::str("hi")), "\"hi\"");
        assert_eq!(inspect(&Value::symbol("tag")), "Symbol(tag)");
    }

    #[test]
    fn test_flat_array_and_object() {
        let arr = Value::array(vec![1.into(), 2.into(), 3.into()]);
        assert_eq!(inspect(&arr), "[ 1, 2, 3 ]");
        assert_eq!(inspect(&Value::object(vec![])), "{}");
        assert_eq!(inspect(&Value::array(vec![])), "[]");
        let obj = Value::object(vec![("a", 1.into())]);
        assert_eq!(inspect(&obj), "{ a: 1 }");
    }

    #[test]
    fn test_set_dedup_rendering() {
        let set = Value::set(vec![1.into(), 1.into(), 2.into()]);
        assert_eq!(inspect(&set), "Set { 1, 2 }");
    }

    #[test]
    fn test_circular_reference_marker() {
        let arr = Value::array(vec![1.into()]);
        arr.push(arr.clone());
        assert_eq!(inspect(&arr), "[ 1, [Circular] ]");

        let obj = Value::object(vec![]);
        obj.insert_prop("self", obj.clone());
        assert_eq!(inspect(&obj), "{ self: [Circular] }");
    }

    #[test]
    fn test_depth_limit_placeholders() {
        let deep = Value::object(vec![(
            "a",
            Value::object(vec![("b", Value::object(vec![("c", Value::object(vec![]))]))]),
        )]);
        assert_eq!(inspect(&deep), "{ a: { b: { c: [Object] } } }");
        assert_eq!(
            inspect_with(
                &deep,
                &InspectOptions {
                    depth: Some(0),
                    ..Default::default()
                }
            ),
            "{ a: [Object] }"
        );
    }

    #[test]
    fn test_unlimited_depth_bounded_by_cycles() {
        let deep = Value::object(vec![("x", Value::object(vec![("y", 1.into())]))]);
        let rendered = inspect_with(
            &deep,
            &InspectOptions {
                depth: None,
                ..Default::default()
            },
        );
        assert_eq!(rendered, "{ x: { y: 1 } }");
    }

    #[test]
    fn test_determinism() {
        let make = || {
            Value::object(vec![
                ("nums", Value::array(vec![1.into(), 2.into()])),
                ("flag", true.into()),
                ("text", "abc".into()),
            ])
        };
        assert_eq!(inspect(&make()), inspect(&make()));
    }

    #[test]
    fn test_custom_inspect_hook_text() {
        let value = Value::custom(None, Rc::new(|_| InspectReturn::Text("<custom>".into())));
        assert_eq!(inspect(&value), "<custom>");

        let off = inspect_with(
            &value,
            &InspectOptions {
                custom_inspect: false,
                ..Default::default()
            },
        );
        assert_eq!(off, "{}");
    }

    #[test]
    fn test_custom_inspect_hook_value() {
        let value = Value::custom(
            Some("Wrapper"),
            Rc::new(|_| InspectReturn::Val(Value::str("inner"))),
        );
        assert_eq!(inspect(&value), "\"inner\"");
    }

    #[test]
    fn test_proxy_unwraps_unless_shown() {
        let proxy = Value::Proxy(Rc::new(ProxyData {
            target: Value::array(vec![1.into()]),
            handler: Value::object(vec![]),
        }));
        assert_eq!(inspect(&proxy), "[ 1 ]");
        let shown = inspect_with(
            &proxy,
            &InspectOptions {
                show_proxy: true,
                ..Default::default()
            },
        );
        assert_eq!(shown, "Proxy [ [ 1 ], {} ]");
    }

    #[test]
    fn test_recursion_ceiling_interrupts() {
        // A linked list deeper than the internal ceiling, inspected
        // with unlimited depth, must degrade instead of overflowing.
        let mut head = Value::object(vec![]);
        for _ in 0..(RECURSION_CEILING + 50) {
            let next = Value::object(vec![("next", head)]);
            head = next;
        }
        let rendered = inspect_with(
            &head,
            &InspectOptions {
                depth: None,
                compact: Compact::True,
                ..Default::default()
            },
        );
        assert!(rendered.contains("Inspection interrupted prematurely"));
    }

    #[test]
    fn test_colors_wrap_output() {
        let rendered = inspect_with(
            &Value::Num(1.0),
            &InspectOptions {
                colors: true,
                ..Default::default()
            },
        );
        assert_eq!(rendered, "\u{1b}[33m1\u{1b}[39m");
    }

    #[test]
    fn test_sorted_output() {
        let obj = Value::object(vec![("b", 1.into()), ("a", 2.into())]);
        let rendered = inspect_with(
            &obj,
            &InspectOptions {
                sorted: Sorted::Default,
                ..Default::default()
            },
        );
        assert_eq!(rendered, "{ a: 2, b: 1 }");
    }
}
