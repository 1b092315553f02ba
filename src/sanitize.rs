//! Identifier sanitization (§4.7): turning category levels into valid
//! downstream column-name fragments.

use std::collections::HashSet;

/// Sanitize a single level string into a valid identifier fragment:
/// lowercase ASCII letters, non-alphanumerics mapped to `_`, a leading
/// minus sign replaced with `minus_`, a leading digit prefixed with `x_`,
/// and runs of `_` collapsed to one.
pub fn sanitize_level(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let starts_negative = raw.trim_start().starts_with('-');
    let body = if starts_negative {
        raw.trim_start().trim_start_matches('-')
    } else {
        raw
    };

    for ch in body.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_underscore = false;
    for ch in out.chars() {
        if ch == '_' {
            if !prev_underscore {
                collapsed.push(ch);
            }
            prev_underscore = true;
        } else {
            collapsed.push(ch);
            prev_underscore = false;
        }
    }
    let collapsed = collapsed.trim_matches('_').to_string();

    let mut result = if starts_negative {
        format!("minus_{collapsed}")
    } else {
        collapsed
    };

    if result.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        result = format!("x_{result}");
    }

    if result.is_empty() {
        result = "x_".to_string();
    }

    result
}

/// Sanitize a batch of level strings, resolving post-sanitization collisions
/// by appending `_2`, `_3`, ... in encounter order.
pub fn sanitize_levels(levels: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(levels.len());
    for level in levels {
        let base = sanitize_level(level);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
