//! Layout engine
//!
//! Decides single-line versus multi-line rendering of structural
//! values, groups wide array bodies into aligned columns, and wraps
//! long strings into quoted segments.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex_lite::Regex;

use super::primitives::quote_string;
use super::style::{width_without_ansi, Style};
use super::{Compact, Ctx};

/// Shortest line the string wrapper will produce.
pub(crate) const MIN_LINE_WIDTH: usize = 16;

/// Whether a body's entries came from an array-like or an object-like
/// value; column grouping applies only to array-like bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExtrasType {
    Object,
    Array,
}

/// Combine already-formatted entries into the final rendering.
///
/// Single-line is chosen only when the projected length stays under
/// the break-length budget; otherwise every entry is placed on its own
/// indented line. `trailer_len` counts trailing meta entries (elision
/// markers, hidden pseudo-properties) excluded from column grouping.
#[allow(clippy::too_many_arguments)]
pub(crate) fn reduce_to_single_string(
    ctx: &Ctx,
    mut output: Vec<String>,
    base: &str,
    braces: (&str, &str),
    extras: ExtrasType,
    depth: u32,
    numeric: bool,
    trailer_len: usize,
) -> String {
    if output.is_empty() {
        if !base.is_empty() {
            return base.to_string();
        }
        return format!("{}{}", braces.0, braces.1);
    }

    match ctx.opts.compact {
        Compact::Level(n) if n >= 1 => {
            let entries = output.len();
            if extras == ExtrasType::Array && entries > 6 {
                output = group_array_elements(ctx, output, numeric, trailer_len);
            }
            // Entries closer than `n` levels to the deepest nesting
            // combine on one line when they fit.
            if ctx.current_depth - depth < n && entries == output.len() {
                let start =
                    output.len() + ctx.indentation_lvl + braces.0.len() + base.len() + 10;
                if is_below_break_length(ctx, &output, start, base) {
                    let joined = output.join(", ");
                    if !joined.contains('\n') {
                        let prefix = if base.is_empty() {
                            String::new()
                        } else {
                            format!("{} ", base)
                        };
                        return format!("{}{} {} {}", prefix, braces.0, joined, braces.1);
                    }
                }
            }
            multi_line(ctx, &output, base, braces)
        }
        Compact::True => {
            if is_below_break_length(ctx, &output, 0, base) {
                let base_part = if base.is_empty() {
                    String::new()
                } else {
                    format!(" {}", base)
                };
                return format!(
                    "{}{} {} {}",
                    braces.0,
                    base_part,
                    output.join(", "),
                    braces.1
                );
            }
            multi_line(ctx, &output, base, braces)
        }
        _ => multi_line(ctx, &output, base, braces),
    }
}

fn multi_line(ctx: &Ctx, output: &[String], base: &str, braces: (&str, &str)) -> String {
    let indentation = format!("\n{}", " ".repeat(ctx.indentation_lvl));
    let prefix = if base.is_empty() {
        String::new()
    } else {
        format!("{} ", base)
    };
    format!(
        "{}{}{}  {}{}{}",
        prefix,
        braces.0,
        indentation,
        output.join(&format!(",{}  ", indentation)),
        indentation,
        braces.1
    )
}

/// Projected-width check with colors stripped before measuring.
fn is_below_break_length(ctx: &Ctx, output: &[String], start: usize, base: &str) -> bool {
    // Separators take one character each.
    let mut total = output.len() + start;
    if total + output.len() > ctx.opts.break_length {
        return false;
    }
    for entry in output {
        total += if ctx.opts.colors {
            width_without_ansi(entry)
        } else {
            entry.chars().count()
        };
        if total > ctx.opts.break_length {
            return false;
        }
    }
    base.is_empty() || !base.contains('\n')
}

/// Left-pad array-like entries into aligned columns.
///
/// The column count comes from the geometric relationship between the
/// average entry width, an assumed character aspect ratio, and the
/// available width. Skipped when fewer than two columns fit or when
/// entry lengths vary too much (longest exceeding one fifth of the
/// combined total).
fn group_array_elements(
    ctx: &Ctx,
    output: Vec<String>,
    numeric: bool,
    trailer_len: usize,
) -> Vec<String> {
    const SEPARATOR_SPACE: usize = 2;

    let output_length = output.len() - trailer_len;
    if output_length == 0 {
        return output;
    }

    let mut total_length = 0usize;
    let mut max_length = 0usize;
    let mut data_len = vec![0usize; output_length];
    for (i, entry) in output.iter().take(output_length).enumerate() {
        let len = width_without_ansi(entry);
        data_len[i] = len;
        total_length += len + SEPARATOR_SPACE;
        if len > max_length {
            max_length = len;
        }
    }

    let actual_max = max_length + SEPARATOR_SPACE;
    let fits = actual_max * 3 + ctx.indentation_lvl < ctx.opts.break_length;
    let uniform = total_length as f64 / actual_max as f64 > 5.0 || max_length <= 6;
    if !fits || !uniform {
        return output;
    }

    let approx_char_heights = 2.5f64;
    let average_bias =
        ((actual_max as f64) - (total_length as f64) / (output_length as f64)).sqrt();
    let biased_max = ((actual_max as f64) - 3.0 - average_bias).max(1.0);
    let compact_level = match ctx.opts.compact {
        Compact::Level(n) => n as usize,
        _ => 3,
    };
    let columns = (((approx_char_heights * biased_max * output_length as f64).sqrt()
        / biased_max)
        .round() as usize)
        .min(ctx.opts.break_length.saturating_sub(ctx.indentation_lvl) / actual_max)
        .min(compact_level * 4)
        .min(15);
    if columns <= 1 {
        return output;
    }

    let mut max_line_length = Vec::with_capacity(columns);
    for i in 0..columns {
        let mut line_length = 0usize;
        let mut j = i;
        while j < output_length {
            if data_len[j] > line_length {
                line_length = data_len[j];
            }
            j += columns;
        }
        max_line_length.push(line_length + SEPARATOR_SPACE);
    }

    let mut grouped = Vec::new();
    let mut i = 0;
    while i < output_length {
        let row_end = (i + columns).min(output_length);
        let mut row = String::new();
        for j in i..row_end - 1 {
            // Padding targets include any invisible styling bytes.
            let target = max_line_length[j - i] + output[j].len() - data_len[j];
            let cell = format!("{}, ", output[j]);
            if numeric {
                row.push_str(&" ".repeat(target.saturating_sub(cell.len())));
                row.push_str(&cell);
            } else {
                row.push_str(&cell);
                row.push_str(&" ".repeat(target.saturating_sub(cell.len())));
            }
        }
        let j = row_end - 1;
        if numeric {
            let target = (max_line_length[j - i] + output[j].len() - data_len[j])
                .saturating_sub(SEPARATOR_SPACE);
            row.push_str(&" ".repeat(target.saturating_sub(output[j].len())));
            row.push_str(&output[j]);
        } else {
            row.push_str(&output[j]);
        }
        grouped.push(row);
        i += columns;
    }

    for entry in output.into_iter().skip(output_length) {
        grouped.push(entry);
    }
    grouped
}

/// One wrap regex per distinct wrap width.
static WRAP_REGEXES: Lazy<Mutex<HashMap<usize, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn wrap_regex(divisor: usize) -> Regex {
    let mut cache = WRAP_REGEXES.lock();
    cache
        .entry(divisor)
        .or_insert_with(|| {
            let pattern = format!(r"(.|\n){{1,{}}}(\s|$)|[^\s]+?(\s|$)", divisor);
            Regex::new(&pattern).expect("wrap pattern is valid")
        })
        .clone()
}

/// Greedily re-wrap a long string into quoted segments joined by a
/// continuation operator. Returns `None` when the string does not
/// split into more than one segment.
pub(crate) fn wrap_long_string(ctx: &Ctx, s: &str) -> Option<String> {
    let raw_max = ctx.opts.break_length.saturating_sub(ctx.indentation_lvl);
    let max_line = raw_max.max(MIN_LINE_WIDTH);
    let lines = s.len().div_ceil(max_line);
    let average = ((s.len() as f64) / (lines as f64)).round() as usize;
    let divisor = average.max(MIN_LINE_WIDTH);

    let re = wrap_regex(divisor);
    let segments: Vec<&str> = re.find_iter(s).map(|m| m.as_str()).collect();
    if segments.len() <= 1 {
        return None;
    }

    let indent = " ".repeat(ctx.indentation_lvl);
    let mut res = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            res.push_str(&indent);
            res.push_str("  ");
        }
        res.push_str(&ctx.stylize(&quote_string(segment), Style::Str));
        if i < segments.len() - 1 {
            res.push_str(" +\n");
        }
    }
    Some(res)
}
