/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer parsing for register addresses and similar hand-typed values.

/// Parse `s` as `0x`-prefixed hexadecimal or signed decimal.
///
/// Surrounding whitespace is ignored and the prefix is case-insensitive.
/// Returns `None` if the text is not a valid literal or does not fit in
/// `i64`.
pub fn try_parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && !hex.starts_with(['+', '-']) => {
            i64::from_str_radix(hex, 16).ok()
        }
        Some(_) => None,
        None => s.parse::<i64>().ok(),
    }
}

/// Like [`try_parse_int`], but returns `0` for unparseable input.
pub fn parse_int(s: &str) -> i64 {
    try_parse_int(s).unwrap_or(0)
}
