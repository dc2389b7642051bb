//! OHLCV candle sample

use serde::{Deserialize, Serialize};

/// One OHLCV sample for a fixed time bucket.
///
/// `timestamp_ms` is the bucket open time in milliseconds since the Unix
/// epoch, exactly as the venue reports it. Two candles with the same
/// timestamp describe the same bucket; the later one is a refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp_ms: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candle where every price equals `price`. Handy for tests and
    /// synthetic fills.
    pub fn flat(timestamp_ms: i64, price: f64) -> Self {
        Self::new(timestamp_ms, price, price, price, price, 0.0)
    }

    /// Sanity check applied to decoded venue data.
    ///
    /// Rejects non-finite values, non-positive prices, negative volume and
    /// bars whose high/low do not bracket open and close.
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_candle() {
        let candle = Candle::new(1_700_000_000_000, 100.0, 105.0, 99.0, 104.0, 12.5);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_invalid_candles() {
        assert!(!Candle::new(0, 100.0, 99.0, 101.0, 100.0, 1.0).is_valid());
        assert!(!Candle::new(0, f64::NAN, 101.0, 99.0, 100.0, 1.0).is_valid());
        assert!(!Candle::new(0, 100.0, 101.0, 99.0, 100.0, -1.0).is_valid());
        assert!(!Candle::new(0, 0.0, 0.0, 0.0, 0.0, 0.0).is_valid());
    }
}
