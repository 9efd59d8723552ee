//! Identifiers for generated netlists.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__+").unwrap());
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*([fpnumkMGT]?)").unwrap()
});

/// Turn `name` into an identifier every dialect accepts.
pub fn proper_name(name: &str) -> String {
    let name = name.strip_suffix(".sch").unwrap_or(name);
    let mut proper = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        proper.push('n');
    }
    proper.push_str(name);

    let proper = NON_WORD.replace_all(&proper, "_");
    let proper = UNDERSCORES.replace_all(&proper, "_");
    if proper.starts_with('_') {
        format!("n{proper}")
    } else {
        proper.into_owned()
    }
}

/// File name part of a reference, directories dropped.
pub fn proper_file_name(reference: &str) -> &str {
    Path::new(reference)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(reference)
}

/// A parameter value for a Verilog `#(...)` list.
///
/// A leading number with an optional engineering suffix is written out as a
/// plain number; anything else is passed through.
pub fn verilog_param(value: &str) -> String {
    let Some(caps) = LEADING_NUMBER.captures(value) else {
        return value.to_string();
    };
    let Ok(number) = caps[1].parse::<f64>() else {
        return value.to_string();
    };
    let scale = match caps.get(2).map(|m| m.as_str()) {
        Some("f") => 1e-15,
        Some("p") => 1e-12,
        Some("n") => 1e-9,
        Some("u") => 1e-6,
        Some("m") => 1e-3,
        Some("k") => 1e3,
        Some("M") => 1e6,
        Some("G") => 1e9,
        Some("T") => 1e12,
        _ => 1.0,
    };
    format!("{}", number * scale)
}
