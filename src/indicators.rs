//! Technical indicators
//!
//! Rolling statistics used by the filter, detector and risk stages. Every
//! series-valued indicator returns `None` until its window is fully
//! populated, so callers only ever read a statistic built from a full window.

use itertools::izip;

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Final value of an SMA, `None` when the series is shorter than the window
pub fn last_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Calculate True Range
///
/// The first bar has no previous close and falls back to high - low.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    if let (Some(&h), Some(&l)) = (high.first(), low.first()) {
        tr.push(h - l);
    }

    for (&h, &l, &prev_close) in izip!(high.iter().skip(1), low.iter().skip(1), close.iter()) {
        let hl = h - l;
        let hc = (h - prev_close).abs();
        let lc = (l - prev_close).abs();
        tr.push(hl.max(hc).max(lc));
    }

    tr
}

/// Calculate Average True Range as a simple average of true range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let tr = true_range(high, low, close);
    sma(&tr, period)
}

/// Position and value of the highest value; ties resolve to the earliest
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}

/// Lowest value, `None` for an empty slice
pub fn min_value(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().fold(None, |min, v| Some(min.map_or(v, |m: f64| m.min(v))))
}
