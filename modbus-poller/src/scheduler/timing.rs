/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Elapsed-time arithmetic on the wrapping millisecond counter.
//!
//! `now - last` is computed as a two's-complement difference, so an operation
//! fired at `u32::MAX - 10` is correctly seen as 20 ms old at `now = 9`.

use crate::model::Millis;

/// Milliseconds from `last` to `now`, correct across one counter rollover.
pub fn elapsed(now: Millis, last: Millis) -> Millis {
    now.wrapping_sub(last)
}

/// `true` if `interval` has fully elapsed since `last`.
///
/// Returns `false` for `interval <= 0`: such an operation never fires.
pub fn is_due(now: Millis, last: Millis, interval: i32) -> bool {
    match Millis::try_from(interval) {
        Ok(interval) if interval > 0 => elapsed(now, last) >= interval,
        _ => false,
    }
}
