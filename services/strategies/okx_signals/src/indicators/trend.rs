//! Trend indicators: MACD, BBI and ZLMM

use super::averages::{ema, sma_at};

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BBI_WINDOWS: [usize; 4] = [3, 6, 12, 24];
pub const ZLMM_CHANGE_PERIOD: usize = 21;
pub const ZLMM_SMOOTHING: usize = 5;

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// `EMA(12) - EMA(26)`, its `EMA(9)` and the difference.
///
/// Undefined until the slow average has a full window behind it.
pub fn macd(closes: &[f64]) -> Macd {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, MACD_SIGNAL);

    let defined = |i: usize| i + 1 >= MACD_SLOW;
    let mut out = Macd {
        macd: Vec::with_capacity(closes.len()),
        signal: Vec::with_capacity(closes.len()),
        histogram: Vec::with_capacity(closes.len()),
    };
    for i in 0..closes.len() {
        if defined(i) {
            out.macd.push(Some(line[i]));
            out.signal.push(Some(signal[i]));
            out.histogram.push(Some(line[i] - signal[i]));
        } else {
            out.macd.push(None);
            out.signal.push(None);
            out.histogram.push(None);
        }
    }
    out
}

/// Bull and bear index: mean of the 3, 6, 12 and 24 period SMAs
pub fn bbi(closes: &[f64]) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            let mut sum = 0.0;
            for period in BBI_WINDOWS {
                sum += sma_at(closes, i, period)?;
            }
            Some(sum / BBI_WINDOWS.len() as f64)
        })
        .collect()
}

/// 5-period mean of the 21-period percent change
pub fn zlmm(closes: &[f64]) -> Vec<Option<f64>> {
    let momentum: Vec<Option<f64>> = (0..closes.len())
        .map(|i| {
            let past = *closes.get(i.checked_sub(ZLMM_CHANGE_PERIOD)?)?;
            if past == 0.0 {
                return None;
            }
            Some((closes[i] - past) / past * 100.0)
        })
        .collect();

    (0..closes.len())
        .map(|i| {
            let start = (i + 1).checked_sub(ZLMM_SMOOTHING)?;
            let mut sum = 0.0;
            for value in &momentum[start..=i] {
                sum += (*value)?;
            }
            Some(sum / ZLMM_SMOOTHING as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_undefined_before_slow_window() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let out = macd(&closes);
        assert!(out.macd[..25].iter().all(Option::is_none));
        assert!(out.macd[25..].iter().all(Option::is_some));
        // Rising prices keep the fast average above the slow one
        assert!(out.macd[39].unwrap() > 0.0);
        let hist = out.histogram[30].unwrap();
        assert!((hist - (out.macd[30].unwrap() - out.signal[30].unwrap())).abs() < 1e-12);
    }

    #[test]
    fn test_bbi_flat_series_equals_price() {
        let closes = vec![50.0; 30];
        let out = bbi(&closes);
        assert!(out[..23].iter().all(Option::is_none));
        assert_eq!(out[23], Some(50.0));
        assert_eq!(out[29], Some(50.0));
    }

    #[test]
    fn test_zlmm_window() {
        // Every close 1% above the one 21 steps earlier
        let closes: Vec<f64> = (0..30)
            .map(|i| if i < 21 { 100.0 } else { 101.0 })
            .collect();
        let out = zlmm(&closes);
        assert!(out[..25].iter().all(Option::is_none));
        let value = out[25].unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zlmm_zero_price_is_undefined() {
        let mut closes = vec![10.0; 30];
        closes[3] = 0.0;
        let out = zlmm(&closes);
        // momentum at 24 divides by closes[3]
        assert_eq!(out[24], None);
        assert_eq!(out[28], None);
        assert!(out[29].is_some());
    }
}
