//! Bounded oscillators: KDJ, RSI and Williams %R

use super::averages::{highest_at, lowest_at};

pub const KDJ_PERIOD: usize = 9;
pub const KDJ_SEED: f64 = 50.0;
pub const RSI_PERIOD: usize = 14;
pub const WILLIAMS_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct Kdj {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
}

/// Stochastic KDJ over a 9-period range.
///
/// `K = 2/3 K' + 1/3 RSV`, `D = 2/3 D' + 1/3 K`, `J = 3K - 2D`, with
/// `K' = D' = 50` before the first defined point. A flat range gives
/// `RSV = 50`.
pub fn kdj(highs: &[f64], lows: &[f64], closes: &[f64]) -> Kdj {
    let len = closes.len().min(highs.len()).min(lows.len());
    let mut out = Kdj {
        k: Vec::with_capacity(len),
        d: Vec::with_capacity(len),
        j: Vec::with_capacity(len),
    };
    let (mut k_prev, mut d_prev) = (KDJ_SEED, KDJ_SEED);

    for i in 0..len {
        let range = highest_at(highs, i, KDJ_PERIOD).zip(lowest_at(lows, i, KDJ_PERIOD));
        let Some((hh, ll)) = range else {
            out.k.push(None);
            out.d.push(None);
            out.j.push(None);
            continue;
        };

        let rsv = if hh == ll {
            50.0
        } else {
            (closes[i] - ll) / (hh - ll) * 100.0
        };
        let k = 2.0 / 3.0 * k_prev + rsv / 3.0;
        let d = 2.0 / 3.0 * d_prev + k / 3.0;
        out.k.push(Some(k));
        out.d.push(Some(d));
        out.j.push(Some(3.0 * k - 2.0 * d));
        k_prev = k;
        d_prev = d;
    }
    out
}

/// 14-period RSI from simple averages of gains and losses.
///
/// No losses in the window gives 100, or 50 when the window is flat.
pub fn rsi(closes: &[f64]) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if i < RSI_PERIOD {
                return None;
            }
            let (mut gain, mut loss) = (0.0, 0.0);
            for j in i + 1 - RSI_PERIOD..=i {
                let change = closes[j] - closes[j - 1];
                if change > 0.0 {
                    gain += change;
                } else {
                    loss -= change;
                }
            }
            let (gain, loss) = (gain / RSI_PERIOD as f64, loss / RSI_PERIOD as f64);
            Some(if loss == 0.0 {
                if gain > 0.0 {
                    100.0
                } else {
                    50.0
                }
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            })
        })
        .collect()
}

/// Williams %R in `[-100, 0]`; undefined when the 14-period range is flat
pub fn williams_r(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            let hh = highest_at(highs, i, WILLIAMS_PERIOD)?;
            let ll = lowest_at(lows, i, WILLIAMS_PERIOD)?;
            if hh == ll {
                return None;
            }
            Some((hh - closes[i]) / (hh - ll) * -100.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdj_flat_range_stays_at_seed() {
        let prices = vec![10.0; 12];
        let out = kdj(&prices, &prices, &prices);
        assert!(out.k[..8].iter().all(Option::is_none));
        for column in [&out.k, &out.d, &out.j] {
            for value in &column[8..] {
                assert!((value.unwrap() - 50.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_kdj_close_at_high() {
        let highs: Vec<f64> = (0..9).map(|i| 10.0 + i as f64).collect();
        let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let closes = highs.clone();
        let out = kdj(&highs, &lows, &closes);
        // RSV = 100 at index 8
        let k = out.k[8].unwrap();
        let d = out.d[8].unwrap();
        assert!((k - (2.0 / 3.0 * 50.0 + 100.0 / 3.0)).abs() < 1e-9);
        assert!((d - (2.0 / 3.0 * 50.0 + k / 3.0)).abs() < 1e-9);
        assert!((out.j[8].unwrap() - (3.0 * k - 2.0 * d)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_bounds_and_definition() {
        let rising: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&rising);
        assert!(out[..14].iter().all(Option::is_none));
        assert_eq!(out[14], Some(100.0));

        let flat = vec![5.0; 20];
        assert_eq!(rsi(&flat)[19], Some(50.0));

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&falling)[19], Some(0.0));
    }

    #[test]
    fn test_rsi_mixed_window() {
        // Seven +2 moves and seven -1 moves: RS = 2, RSI = 66.67
        let mut closes = vec![100.0];
        for step in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if step % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let value = rsi(&closes)[14].unwrap();
        assert!((value - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_williams_r_range() {
        let highs: Vec<f64> = (0..14).map(|i| 20.0 + i as f64).collect();
        let lows: Vec<f64> = (0..14).map(|i| 10.0 + i as f64).collect();
        let mut closes: Vec<f64> = lows.clone();
        closes[13] = 33.0;
        let out = williams_r(&highs, &lows, &closes);
        assert!(out[..13].iter().all(Option::is_none));
        // hh = 33, ll = 10, close at the high
        assert_eq!(out[13], Some(0.0));

        closes[13] = 10.0;
        assert_eq!(williams_r(&highs, &lows, &closes)[13], Some(-100.0));

        let flat = vec![7.0; 14];
        assert_eq!(williams_r(&flat, &flat, &flat)[13], None);
    }
}
