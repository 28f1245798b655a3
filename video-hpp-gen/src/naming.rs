//! Identifier conventions of the registry: case conversion, prefix handling
//! and literal classification.

/// `StdVideoH264ProfileIdc` → `STD_VIDEO_H264_PROFILE_IDC`.
///
/// A `_` goes before an uppercase letter that follows a lowercase letter or
/// a digit, and before a digit that follows a lowercase letter.
pub fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    let mut prev_lower = false;
    let mut prev_digit = false;
    for c in name.chars() {
        if (c.is_ascii_uppercase() && (prev_lower || prev_digit))
            || (c.is_ascii_digit() && prev_lower)
        {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
        prev_lower = c.is_ascii_lowercase();
        prev_digit = c.is_ascii_digit();
    }
    out
}

/// `MONOCHROME_4_2_0` → `Monochrome420` (or `Monochrome4_2_0` with
/// `keep_separated_numbers`).
///
/// The first character and every character after a `_` or a digit keep
/// their case, all others are lowered. Underscores are dropped unless they
/// sit between two digits and `keep_separated_numbers` is set.
pub fn to_camel(value: &str, keep_separated_numbers: bool) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' {
            let between_digits = i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if keep_separated_numbers && between_digits {
                out.push('_');
            }
        } else if i == 0 || bytes[i - 1] == b'_' || bytes[i - 1].is_ascii_digit() {
            out.push(b as char);
        } else {
            out.push(b.to_ascii_lowercase() as char);
        }
    }
    out
}

/// The `e`-prefixed C++ enumerator for a raw registry value name.
///
/// `STD_VIDEO_H264_PROFILE_IDC_HIGH` in `StdVideoH264ProfileIdc` → `eHigh`.
pub fn enum_value_name(enum_name: &str, value_name: &str) -> String {
    let prefix = enum_value_prefix(enum_name);
    format!("e{}", to_camel(strip_prefix(value_name, &prefix), true))
}

/// `UPPER_SNAKE_` prefix every value of `enum_name` must carry.
pub fn enum_value_prefix(enum_name: &str) -> String {
    format!("{}_", to_upper_snake(enum_name))
}

/// Remove `prefix` if present, otherwise return `value` unchanged.
pub fn strip_prefix<'a>(value: &'a str, prefix: &str) -> &'a str {
    value.strip_prefix(prefix).unwrap_or(value)
}

/// Unsigned base-10 literal: one or more ASCII digits.
pub fn is_decimal_literal(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `0x`-prefixed hexadecimal literal with uppercase digits, as the registry
/// writes them (`0x7FFFFFFF`).
pub fn is_hex_literal(value: &str) -> bool {
    value.strip_prefix("0x").is_some_and(|digits| {
        !digits.is_empty()
            && digits
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    })
}

/// Split on `separator`, trim each piece and drop empty ones.
pub fn tokenize<'a>(value: &'a str, separator: &str) -> Vec<&'a str> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Separate each `*` from the token next to it: `const*` → `const *`,
/// `*const` → `* const`. A star glued on both sides only gets the space in
/// front (`a*b` → `a *b`).
pub fn trim_stars(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c != '*' {
            out.push(c);
            continue;
        }
        if i > 0 && !matches!(chars[i - 1], ' ' | '*') {
            out.push(' ');
            out.push('*');
        } else {
            out.push('*');
            if chars.get(i + 1).is_some_and(|n| !matches!(n, ' ' | '*')) {
                out.push(' ');
            }
        }
    }
    out
}

/// Remove `postfix` if present, otherwise return `value` unchanged.
pub fn strip_postfix<'a>(value: &'a str, postfix: &str) -> &'a str {
    value.strip_suffix(postfix).unwrap_or(value)
}
