//! Identifier normalization for join and group keys.
//!
//! Health-region codes arrive with variable width (`1`, `"0000001"`,
//! `4300001.0`) and boundary codes carry a trailing check digit that the
//! supply records do not. Everything that becomes a key goes through here.

use std::fmt::Display;

/// Width of a normalized health-region (CRS) code.
pub const REGION_CODE_WIDTH: usize = 7;

/// Width of the municipality code used to match boundaries to records.
pub const MUNICIPALITY_KEY_WIDTH: usize = 6;

/// Left-pad the textual form of `value` with `'0'` up to `width` characters.
///
/// Never truncates: a value already `width` characters or longer is returned
/// as-is.
pub fn zero_pad(value: impl Display, width: usize) -> String {
    let text = value.to_string();
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let mut padded = String::with_capacity(width);
    padded.extend(std::iter::repeat('0').take(width - len));
    padded.push_str(&text);
    padded
}

/// Normalize a health-region code to [`REGION_CODE_WIDTH`] characters.
///
/// Strings and numbers are accepted uniformly; textual input is first run
/// through [`canonical_code`].
pub fn normalize_region_code(value: impl Display) -> String {
    zero_pad(canonical_code(&value.to_string()), REGION_CODE_WIDTH)
}

/// Trim whitespace and drop an integral float suffix (`"4300001.0"`).
///
/// Spreadsheet exports frequently turn integer codes into floats; anything
/// that is not an integral float is returned trimmed but otherwise intact.
pub fn canonical_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((int_part, frac)) = trimmed.split_once('.') {
        let integral = !int_part.is_empty()
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac.chars().all(|c| c == '0');
        if integral {
            return int_part.to_string();
        }
    }
    trimmed.to_string()
}

/// Join key of a boundary administrative code: its first
/// [`MUNICIPALITY_KEY_WIDTH`] characters. Shorter codes are returned whole.
pub fn municipality_join_key(code: &str) -> String {
    canonical_code(code)
        .chars()
        .take(MUNICIPALITY_KEY_WIDTH)
        .collect()
}
