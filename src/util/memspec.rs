//! Memory-size shorthand parsing and formatting.
//!
//! Resource strings express memory-like quantities either as a bare megabyte
//! count or with a binary suffix (`512k`, `2g`, `1tb`). All values resolve
//! to megabytes internally.

const MB_PER_GB: i64 = 1024;
const MB_PER_TB: i64 = 1024 * 1024;

/// Parse a memory shorthand into megabytes.
///
/// Accepts a decimal integer with an optional case-insensitive suffix
/// (`k`, `m`, `g`, `t`, each optionally followed by `b`). A bare number is
/// taken as megabytes. Kilobyte values truncate toward zero. Returns `None`
/// on malformed input.
pub fn parse_mb(input: &str) -> Option<i64> {
    let s = input.trim();
    let digits_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    if digits_end == 0 {
        return None;
    }
    let value: i64 = s[..digits_end].parse().ok()?;
    let suffix = s[digits_end..].to_ascii_lowercase();
    match suffix.trim_end_matches('b') {
        "" | "m" => Some(value),
        "k" => Some(value / 1024),
        "g" => value.checked_mul(MB_PER_GB),
        "t" => value.checked_mul(MB_PER_TB),
        _ => None,
    }
}

/// Render a megabyte count using the largest binary unit that divides it
/// exactly (`2048` → `"2G"`, `2049` → `"2049M"`).
pub fn format_mb(mb: i64) -> String {
    if mb != 0 && mb % MB_PER_TB == 0 {
        format!("{}T", mb / MB_PER_TB)
    } else if mb != 0 && mb % MB_PER_GB == 0 {
        format!("{}G", mb / MB_PER_GB)
    } else {
        format!("{mb}M")
    }
}
