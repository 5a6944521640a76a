//! Directional-movement kernels (Wilder).
//!
//! Per-row closed forms over high/low/close slices. Row 0 has no previous
//! bar to compare against and always yields the null sentinel. The smoothed
//! composites (DI, DX, ADX, ADXR) are assembled in the memoized function
//! layer from these primitives plus Wilder smoothing.

use tessera_types::{is_null, NULL_VALUE};

/// Positive directional movement at `idx`:
/// the up-move when it exceeds both the down-move and zero, else 0.
#[must_use]
pub fn dm_plus(idx: usize, highs: &[f64], lows: &[f64]) -> f64 {
    if idx == 0 || idx >= highs.len() || idx >= lows.len() {
        return NULL_VALUE;
    }
    let up_move = highs[idx] - highs[idx - 1];
    let down_move = lows[idx - 1] - lows[idx];
    if is_null(up_move) || is_null(down_move) {
        return NULL_VALUE;
    }
    if up_move > down_move && up_move > 0.0 {
        up_move
    } else {
        0.0
    }
}

/// Negative directional movement at `idx`.
#[must_use]
pub fn dm_minus(idx: usize, highs: &[f64], lows: &[f64]) -> f64 {
    if idx == 0 || idx >= highs.len() || idx >= lows.len() {
        return NULL_VALUE;
    }
    let up_move = highs[idx] - highs[idx - 1];
    let down_move = lows[idx - 1] - lows[idx];
    if is_null(up_move) || is_null(down_move) {
        return NULL_VALUE;
    }
    if down_move > up_move && down_move > 0.0 {
        down_move
    } else {
        0.0
    }
}

/// True range at `idx`:
/// `max(H-L, |H - prev_close|, |L - prev_close|)`.
#[must_use]
pub fn true_range(idx: usize, highs: &[f64], lows: &[f64], closes: &[f64]) -> f64 {
    if idx == 0 || idx >= highs.len() || idx >= lows.len() || idx >= closes.len() {
        return NULL_VALUE;
    }
    let prev_close = closes[idx - 1];
    let hl = highs[idx] - lows[idx];
    let hc = (highs[idx] - prev_close).abs();
    let lc = (lows[idx] - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Directional indicator from smoothed DM and smoothed TR:
/// `100 * dm / tr`. Null when the smoothed TR is null or zero.
#[must_use]
pub fn di(smoothed_dm: f64, smoothed_tr: f64) -> f64 {
    if is_null(smoothed_dm) || is_null(smoothed_tr) || smoothed_tr == 0.0 {
        return NULL_VALUE;
    }
    100.0 * smoothed_dm / smoothed_tr
}

/// Directional index from +DI and -DI:
/// `100 * |di_plus - di_minus| / (di_plus + di_minus)`.
#[must_use]
pub fn dx(di_plus: f64, di_minus: f64) -> f64 {
    if is_null(di_plus) || is_null(di_minus) {
        return NULL_VALUE;
    }
    let di_sum = di_plus + di_minus;
    if di_sum == 0.0 {
        return NULL_VALUE;
    }
    100.0 * (di_plus - di_minus).abs() / di_sum
}
