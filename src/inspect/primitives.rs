//! Primitive formatting
//!
//! String escaping and quote selection, number formatting (negative
//! zero, NaN, infinities), big integers and symbols.

use super::layout;
use super::style::Style;
use super::value::Value;
use super::{Compact, Ctx};

/// Render a primitive value with styling applied.
pub(crate) fn format_primitive(ctx: &Ctx, value: &Value) -> String {
    match value {
        Value::Undefined => ctx.stylize("undefined", Style::Undefined),
        Value::Null => ctx.stylize("null", Style::Null),
        Value::Bool(b) => ctx.stylize(if *b { "true" } else { "false" }, Style::Boolean),
        Value::Num(n) => ctx.stylize(&format_number(*n), Style::Number),
        Value::BigInt(v) => ctx.stylize(&format_bigint(*v), Style::BigInt),
        Value::Str(s) => format_string(ctx, s),
        Value::Sym(desc) => ctx.stylize(&format_symbol(desc), Style::Symbol),
        other => ctx.stylize(&format!("[{}]", other.class_label()), Style::Special),
    }
}

/// Render a primitive without styling; used for evaluated accessors.
pub(crate) fn format_primitive_plain(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Num(n) => format_number(*n),
        Value::BigInt(v) => format_bigint(*v),
        Value::Str(s) => quote_string(s),
        Value::Sym(desc) => format_symbol(desc),
        other => format!("[{}]", other.class_label()),
    }
}

fn format_string(ctx: &Ctx, s: &str) -> String {
    // Long strings are re-wrapped into quoted segments joined with a
    // continuation operator, unless single-line packing is forced.
    if !matches!(ctx.opts.compact, Compact::True)
        && s.len() > layout::MIN_LINE_WIDTH
        && s.len()
            > ctx
                .opts
                .break_length
                .saturating_sub(ctx.indentation_lvl + 4)
    {
        if let Some(wrapped) = layout::wrap_long_string(ctx, s) {
            return wrapped;
        }
    }
    ctx.stylize(&quote_string(s), Style::Str)
}

/// Numeric rendering; negative zero is distinguished from positive.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    format!("{}", n)
}

/// Big integers carry the width marker suffix.
pub(crate) fn format_bigint(v: i128) -> String {
    format!("{}n", v)
}

fn format_symbol(desc: &str) -> String {
    format!("Symbol({})", desc)
}

/// Quote and escape a string.
///
/// The quote character is chosen to minimize escaping: double quotes
/// unless the string contains one, then single, then backtick, falling
/// back to escaped single quotes when all three are present.
pub(crate) fn quote_string(s: &str) -> String {
    let has_double = s.contains('"');
    let has_single = s.contains('\'');
    let has_backtick = s.contains('`') || s.contains("${");
    let quote = if !has_double {
        '"'
    } else if !has_single {
        '\''
    } else if !has_backtick {
        '`'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Whether a property key renders bare, without quotes.
pub(crate) fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_preference_order() {
        assert_eq!(quote_string("plain"), "\"plain\"");
        assert_eq!(quote_string("it's"), "\"it's\"");
        assert_eq!(quote_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(quote_string("'both' \"quotes\""), "`'both' \"quotes\"`");
        assert_eq!(
            quote_string("'a' \"b\" `c`"),
            "'\\'a\\' \"b\" `c`'"
        );
        // ${ disqualifies the backtick fallback like a literal backtick.
        assert_eq!(
            quote_string("'x' \"y\" ${z}"),
            "'\\'x\\' \"y\" ${z}'"
        );
    }

    #[test]
    fn test_control_character_escapes() {
        assert_eq!(quote_string("a\nb"), "\"a\\nb\"");
        assert_eq!(quote_string("a\tb"), "\"a\\tb\"");
        assert_eq!(quote_string("a\u{1}b"), "\"a\\x01b\"");
        assert_eq!(quote_string("back\\slash"), "\"back\\\\slash\"");
    }

    #[test]
    fn test_format_number_special_cases() {
        assert_eq!(format_number(-0.0), "-0");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_bigint_suffix() {
        assert_eq!(format_bigint(42), "42n");
        assert_eq!(format_bigint(-7), "-7n");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("_bar"));
        assert!(is_identifier("$x1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
