//! Structural formatters
//!
//! Per-category rendering of container values: entry collection,
//! elision markers, pseudo-properties, accessor evaluation, and the
//! final hand-off to the layout engine.

use chrono::{LocalResult, TimeZone, Utc};

use super::layout::{reduce_to_single_string, ExtrasType};
use super::primitives::{
    format_bigint, format_number, format_primitive, format_primitive_plain, is_identifier,
    quote_string,
};
use super::style::Style;
use super::value::{
    Accessor, ErrorData, IterKind, PromiseState, PropKey, PropValue, Property, TypedElements,
    Value,
};
use super::{format_value, Compact, Ctx, Getters, Sorted, TOTAL_BUDGET};

/// Format a structural value: depth gate, seen-stack guard, category
/// dispatch, layout, and output-budget accounting.
pub(crate) fn format_raw(ctx: &mut Ctx, value: &Value, depth: u32) -> String {
    if let Some(limit) = ctx.opts.depth {
        if depth > limit {
            return ctx.stylize(&format!("[{}]", value.class_label()), Style::Special);
        }
    }

    let id = value.identity();
    if let Some(id) = id {
        ctx.seen.push(id);
    }
    ctx.frames += 1;
    ctx.current_depth = depth;

    let res = format_category(ctx, value, depth);

    ctx.frames -= 1;
    if id.is_some() {
        ctx.seen.pop();
    }

    let level = ctx.indentation_lvl;
    let tally = ctx.budget.entry(level).or_insert(0);
    *tally += res.len();
    if *tally > TOTAL_BUDGET {
        ctx.stop = true;
    }

    res
}

/// Format the value of one entry with the indentation bump the layout
/// engine expects.
fn entry_value(ctx: &mut Ctx, value: &Value, depth: u32, extras: ExtrasType) -> String {
    let diff = if matches!(ctx.opts.compact, Compact::True) && extras == ExtrasType::Object {
        3
    } else {
        2
    };
    ctx.indentation_lvl += diff;
    let res = format_value(ctx, value, depth + 1);
    ctx.indentation_lvl -= diff;
    res
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn more_items(n: usize) -> String {
    format!("... {} more item{}", n, plural(n))
}

fn format_category(ctx: &mut Ctx, value: &Value, depth: u32) -> String {
    let mut base = String::new();
    let mut extras = ExtrasType::Object;
    let mut numeric = false;
    let mut trailer_len = 0usize;
    let braces_open: String;
    let mut braces_close = "}";

    let mut output: Vec<String> = match value {
        Value::Array(items) => {
            extras = ExtrasType::Array;
            braces_open = "[".to_string();
            braces_close = "]";
            let items = items.borrow();
            numeric = items
                .iter()
                .flatten()
                .all(|v| matches!(v, Value::Num(_) | Value::BigInt(_)));
            let (out, trailing) = format_array_entries(ctx, &items, depth);
            trailer_len = trailing;
            out
        }
        Value::Set(items) => {
            braces_open = "Set {".to_string();
            let items = items.borrow();
            let mut out: Vec<String> = items
                .iter()
                .map(|v| entry_value(ctx, v, depth, ExtrasType::Object))
                .collect();
            if ctx.opts.show_hidden {
                out.push(format!(
                    "[size]: {}",
                    ctx.stylize(&format_number(items.len() as f64), Style::Number)
                ));
            }
            out
        }
        Value::Map(entries) => {
            braces_open = "Map {".to_string();
            let entries = entries.borrow();
            let mut out: Vec<String> = entries
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{} => {}",
                        entry_value(ctx, k, depth, ExtrasType::Object),
                        entry_value(ctx, v, depth, ExtrasType::Object)
                    )
                })
                .collect();
            if ctx.opts.show_hidden {
                out.push(format!(
                    "[size]: {}",
                    ctx.stylize(&format_number(entries.len() as f64), Style::Number)
                ));
            }
            out
        }
        Value::TypedArray(data) => {
            extras = ExtrasType::Array;
            braces_open = format!("{} [", data.kind.name());
            braces_close = "]";
            numeric = true;
            let max = ctx.opts.max_array_length.unwrap_or(usize::MAX);
            let total = data.len();
            let shown = total.min(max);
            let mut out: Vec<String> = match &data.elements {
                TypedElements::Num(values) => values
                    .iter()
                    .take(shown)
                    .map(|n| ctx.stylize(&format_number(*n), Style::Number))
                    .collect(),
                TypedElements::Big(values) => values
                    .iter()
                    .take(shown)
                    .map(|v| ctx.stylize(&format_bigint(*v), Style::BigInt))
                    .collect(),
            };
            if total > shown {
                out.push(more_items(total - shown));
                trailer_len += 1;
            }
            if ctx.opts.show_hidden {
                let byte_len = total * data.kind.bytes_per_element();
                for (key, val) in [
                    ("BYTES_PER_ELEMENT", data.kind.bytes_per_element()),
                    ("length", total),
                    ("byteLength", byte_len),
                    ("byteOffset", 0),
                ] {
                    out.push(format!(
                        "[{}]: {}",
                        key,
                        ctx.stylize(&format_number(val as f64), Style::Number)
                    ));
                    trailer_len += 1;
                }
            }
            out
        }
        Value::Iter(data) => {
            extras = ExtrasType::Array;
            let kind = match data.kind {
                IterKind::Map => "Map",
                IterKind::Set => "Set",
            };
            braces_open = format!("[{} Iterator] {{", kind);
            let max = ctx.opts.max_array_length.unwrap_or(usize::MAX);
            let shown = data.items.len().min(max);
            let mut out: Vec<String> = data.items[..shown]
                .iter()
                .map(|v| entry_value(ctx, v, depth, ExtrasType::Object))
                .collect();
            if data.items.len() > shown {
                out.push(more_items(data.items.len() - shown));
                trailer_len += 1;
            }
            out
        }
        Value::ArrayBuffer(bytes) => {
            braces_open = "ArrayBuffer {".to_string();
            let max = ctx.opts.max_array_length.unwrap_or(usize::MAX);
            let shown = bytes.len().min(max);
            let hex: Vec<String> = bytes[..shown].iter().map(|b| format!("{:02x}", b)).collect();
            let mut contents = hex.join(" ");
            if bytes.len() > shown {
                let rest = bytes.len() - shown;
                contents.push_str(&format!(" ... {} more byte{}", rest, plural(rest)));
            }
            vec![
                format!("[Uint8Contents]: <{}>", contents),
                format!(
                    "byteLength: {}",
                    ctx.stylize(&format_number(bytes.len() as f64), Style::Number)
                ),
            ]
        }
        Value::DataView(view) => {
            braces_open = "DataView {".to_string();
            vec![
                format!(
                    "byteLength: {}",
                    ctx.stylize(&format_number(view.byte_length as f64), Style::Number)
                ),
                format!(
                    "byteOffset: {}",
                    ctx.stylize(&format_number(view.byte_offset as f64), Style::Number)
                ),
                format!(
                    "buffer: {}",
                    entry_value(
                        ctx,
                        &Value::ArrayBuffer(view.buffer.clone()),
                        depth,
                        ExtrasType::Object
                    )
                ),
            ]
        }
        Value::Promise(state) => {
            braces_open = "Promise {".to_string();
            match &*state.borrow() {
                PromiseState::Pending => vec![ctx.stylize("<pending>", Style::Special)],
                PromiseState::Fulfilled(v) => {
                    vec![entry_value(ctx, v, depth, ExtrasType::Object)]
                }
                PromiseState::Rejected(reason) => vec![format!(
                    "{} {}",
                    ctx.stylize("<rejected>", Style::Special),
                    entry_value(ctx, reason, depth, ExtrasType::Object)
                )],
            }
        }
        Value::WeakSet(data) => {
            braces_open = "WeakSet {".to_string();
            if ctx.opts.show_hidden {
                // Best-effort preview, sorted for reproducibility.
                let mut out: Vec<String> = data
                    .preview
                    .iter()
                    .map(|v| entry_value(ctx, v, depth, ExtrasType::Object))
                    .collect();
                out.sort();
                out
            } else {
                vec![ctx.stylize("<items unknown>", Style::Special)]
            }
        }
        Value::WeakMap(data) => {
            braces_open = "WeakMap {".to_string();
            if ctx.opts.show_hidden {
                let mut out: Vec<String> = data
                    .preview
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{} => {}",
                            entry_value(ctx, k, depth, ExtrasType::Object),
                            entry_value(ctx, v, depth, ExtrasType::Object)
                        )
                    })
                    .collect();
                out.sort();
                out
            } else {
                vec![ctx.stylize("<items unknown>", Style::Special)]
            }
        }
        Value::Namespace(obj) => {
            braces_open = "[Module] {".to_string();
            format_properties(ctx, &obj.props.borrow(), depth)
        }
        Value::Boxed(boxed) => {
            braces_open = "{".to_string();
            base = format!(
                "[{}: {}]",
                boxed.class,
                format_primitive(ctx, &boxed.value)
            );
            Vec::new()
        }
        Value::Function(f) => {
            braces_open = "{".to_string();
            let label = if f.is_class {
                if f.name.is_empty() {
                    "[class (anonymous)]".to_string()
                } else {
                    format!("[class {}]", f.name)
                }
            } else if f.name.is_empty() {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {}]", f.name)
            };
            base = ctx.stylize(&label, Style::Special);
            format_properties(ctx, &f.props.borrow(), depth)
        }
        Value::Regex(re) => {
            braces_open = "{".to_string();
            base = ctx.stylize(&format!("/{}/{}", re.source, re.flags), Style::Regexp);
            Vec::new()
        }
        Value::Date(millis) => {
            braces_open = "{".to_string();
            let text = match millis {
                None => "Invalid Date".to_string(),
                Some(ms) => match Utc.timestamp_millis_opt(*ms) {
                    LocalResult::Single(dt) => {
                        dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
                    }
                    _ => "Invalid Date".to_string(),
                },
            };
            base = ctx.stylize(&text, Style::Date);
            Vec::new()
        }
        Value::Error(err) => {
            braces_open = "{".to_string();
            base = format_error_base(err);
            format_properties(ctx, &err.props.borrow(), depth)
        }
        Value::Proxy(proxy) => {
            extras = ExtrasType::Array;
            braces_open = "Proxy [".to_string();
            braces_close = "]";
            vec![
                entry_value(ctx, &proxy.target, depth, ExtrasType::Array),
                entry_value(ctx, &proxy.handler, depth, ExtrasType::Array),
            ]
        }
        Value::Object(obj) => {
            braces_open = match &obj.class_name {
                Some(name) => format!("{} {{", name),
                None => "{".to_string(),
            };
            format_properties(ctx, &obj.props.borrow(), depth)
        }
        primitive => {
            braces_open = "{".to_string();
            base = format_primitive(ctx, primitive);
            Vec::new()
        }
    };

    if extras == ExtrasType::Object {
        match ctx.opts.sorted {
            Sorted::None => {}
            Sorted::Default => output.sort(),
            Sorted::Comparator(cmp) => output.sort_by(|a, b| cmp(a, b)),
        }
    }

    reduce_to_single_string(
        ctx,
        output,
        &base,
        (&braces_open, braces_close),
        extras,
        depth,
        numeric,
        trailer_len,
    )
}

/// Array body: elements in order, hole runs collapsed to empty-item
/// markers, the element cap reported as a more-items marker. Returns
/// the entries plus the number of trailing meta entries.
fn format_array_entries(
    ctx: &mut Ctx,
    slots: &[Option<Value>],
    depth: u32,
) -> (Vec<String>, usize) {
    let max = ctx.opts.max_array_length.unwrap_or(usize::MAX);
    let total = slots.len();
    let mut output = Vec::new();
    let mut consumed = 0usize;
    let mut trailer_len = 0usize;

    while consumed < total && output.len() < max {
        match &slots[consumed] {
            Some(v) => {
                output.push(entry_value(ctx, v, depth, ExtrasType::Array));
                consumed += 1;
            }
            None => {
                let start = consumed;
                while consumed < total && slots[consumed].is_none() {
                    consumed += 1;
                }
                let run = consumed - start;
                output.push(format!("<{} empty item{}>", run, plural(run)));
            }
        }
    }

    let remaining = total - consumed;
    if remaining > 0 {
        output.push(more_items(remaining));
        trailer_len += 1;
    }
    if ctx.opts.show_hidden {
        output.push(format!(
            "[length]: {}",
            ctx.stylize(&format_number(total as f64), Style::Number)
        ));
        trailer_len += 1;
    }
    (output, trailer_len)
}

fn format_properties(ctx: &mut Ctx, props: &[Property], depth: u32) -> Vec<String> {
    props
        .iter()
        .filter(|p| p.enumerable || ctx.opts.show_hidden)
        .map(|p| format_property(ctx, p, depth))
        .collect()
}

fn format_property(ctx: &mut Ctx, prop: &Property, depth: u32) -> String {
    let key = match &prop.key {
        PropKey::Sym(desc) => format!("[Symbol({})]", desc),
        PropKey::Str(k) => {
            let rendered = if is_identifier(k) {
                k.clone()
            } else {
                ctx.stylize(&quote_string(k), Style::Str)
            };
            if prop.enumerable {
                rendered
            } else {
                format!("[{}]", rendered)
            }
        }
    };

    let value = match &prop.value {
        PropValue::Data(v) => entry_value(ctx, v, depth, ExtrasType::Object),
        PropValue::Setter => ctx.stylize("[Setter]", Style::Special),
        PropValue::Getter(accessor) => format_accessor(
            ctx,
            "Getter",
            accessor,
            matches!(ctx.opts.getters, Getters::All | Getters::Get),
            depth,
        ),
        PropValue::GetterSetter(accessor) => format_accessor(
            ctx,
            "Getter/Setter",
            accessor,
            matches!(ctx.opts.getters, Getters::All | Getters::Set),
            depth,
        ),
    };

    format!("{}: {}", key, value)
}

/// Render an accessor, evaluating it when the getters option selects
/// it. Evaluation failures collapse to an inline annotation instead of
/// aborting sibling rendering.
fn format_accessor(
    ctx: &mut Ctx,
    label: &str,
    accessor: &Accessor,
    evaluate: bool,
    depth: u32,
) -> String {
    if !evaluate {
        return ctx.stylize(&format!("[{}]", label), Style::Special);
    }
    match (**accessor)() {
        Err(message) => ctx.stylize(
            &format!("[{}: <Inspection threw ({})>]", label, message),
            Style::Special,
        ),
        Ok(v) if v.is_primitive() => ctx.stylize(
            &format!("[{}: {}]", label, format_primitive_plain(&v)),
            Style::Special,
        ),
        Ok(v) => {
            let formatted = entry_value(ctx, &v, depth, ExtrasType::Object);
            format!(
                "{} {}",
                ctx.stylize(&format!("[{}]", label), Style::Special),
                formatted
            )
        }
    }
}

/// Reconcile an error's rendered stack with its own name and message:
/// the label is spliced in when it does not already prefix the stack,
/// and a stack without a recognizable trace is wrapped in brackets.
fn format_error_base(err: &ErrorData) -> String {
    let label = if err.message.is_empty() {
        err.name.clone()
    } else {
        format!("{}: {}", err.name, err.message)
    };
    let mut stack = err.stack.clone().unwrap_or_else(|| label.clone());
    if !stack.starts_with(err.name.as_str()) {
        stack = format!("{}\n{}", label, stack);
    }
    if !stack.contains("\n    at ") {
        stack = format!("[{}]", stack);
    }
    stack
}
