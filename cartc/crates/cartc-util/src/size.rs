//! Human-readable data-size parsing and comparison.
//!
//! Values like `1.5G` or `512K` appear on both sides of the suffix-bound
//! keys (`mem_max`, `disk_min`, ...). A trailing unit from `B K M G T`
//! (case-insensitive) scales by powers of 1024; the numeric part may be
//! fractional.

use std::cmp::Ordering;

fn unit_multiplier(unit: char) -> Option<i64> {
    match unit.to_ascii_uppercase() {
        'B' => Some(1),
        'K' => Some(1024),
        'M' => Some(1024 * 1024),
        'G' => Some(1024 * 1024 * 1024),
        'T' => Some(1024_i64.pow(4)),
        _ => None,
    }
}

fn has_unit_char(s: &str) -> bool {
    s.chars().any(|c| unit_multiplier(c).is_some())
}

/// Converts a human-readable size into a byte count (or whatever base unit
/// `default_suffix` implies when no unit is attached). Returns `None` when
/// the numeric part does not parse.
pub fn convert_data_size(size: &str, default_suffix: char) -> Option<i64> {
    let (number, unit) = match size.chars().last() {
        Some(last) if unit_multiplier(last).is_some() => (&size[..size.len() - 1], last),
        Some(_) => (size, default_suffix),
        None => return None,
    };
    let value: f64 = number.parse().ok()?;
    Some((value * unit_multiplier(unit)? as f64) as i64)
}

/// Compares two size strings. Bare integers compare numerically; as soon as
/// either side carries a unit character anywhere, both parse as sizes with a
/// megabyte default. Returns `None` when either side is unparsable.
pub fn compare_size(a: &str, b: &str) -> Option<Ordering> {
    let (va, vb) = if has_unit_char(a) || has_unit_char(b) {
        (convert_data_size(a, 'M')?, convert_data_size(b, 'M')?)
    } else {
        (a.parse::<i64>().ok()?, b.parse::<i64>().ok()?)
    };
    Some(va.cmp(&vb))
}
