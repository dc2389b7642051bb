//! Moving-average and rolling-window primitives

/// Exponential moving average with `alpha = 2 / (period + 1)`, seeded with
/// the first value. Same length as the input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            Some(p) => alpha * value + (1.0 - alpha) * p,
            None => value,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Mean of the `period` values ending at `end` (inclusive)
pub fn sma_at(values: &[f64], end: usize, period: usize) -> Option<f64> {
    window(values, end, period).map(|w| w.iter().sum::<f64>() / period as f64)
}

pub fn highest_at(values: &[f64], end: usize, period: usize) -> Option<f64> {
    window(values, end, period).map(|w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn lowest_at(values: &[f64], end: usize, period: usize) -> Option<f64> {
    window(values, end, period).map(|w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

fn window(values: &[f64], end: usize, period: usize) -> Option<&[f64]> {
    if period == 0 || end >= values.len() || end + 1 < period {
        return None;
    }
    Some(&values[end + 1 - period..=end])
}
