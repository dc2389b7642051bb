//! Capacity-bounded candle history

use crate::Candle;
use std::collections::VecDeque;

/// Outcome of pushing a candle into a [`PriceSeries`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesUpdate {
    /// New bucket appended (possibly evicting the oldest candle)
    Appended,
    /// Most recent bucket refined in place
    Replaced,
    /// Candle older than the newest retained bucket; ignored
    Stale,
}

impl SeriesUpdate {
    /// Whether the series contents changed
    pub fn changed(self) -> bool {
        !matches!(self, SeriesUpdate::Stale)
    }
}

/// Ordered candle history with FIFO eviction.
///
/// Invariants:
/// - `len() <= capacity()` at all times
/// - timestamps are strictly increasing front to back
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl PriceSeries {
    /// Create an empty series. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a candle, replacing the newest one if it shares its bucket
    pub fn push(&mut self, candle: Candle) -> SeriesUpdate {
        match self.candles.back_mut() {
            Some(last) if candle.timestamp_ms == last.timestamp_ms => {
                *last = candle;
                SeriesUpdate::Replaced
            }
            Some(last) if candle.timestamp_ms < last.timestamp_ms => SeriesUpdate::Stale,
            _ => {
                self.candles.push_back(candle);
                self.evict_overflow();
                SeriesUpdate::Appended
            }
        }
    }

    /// Load a historical batch in any order. Returns how many candles changed
    /// the series.
    pub fn extend_history<I>(&mut self, candles: I) -> usize
    where
        I: IntoIterator<Item = Candle>,
    {
        let mut batch: Vec<Candle> = candles.into_iter().collect();
        batch.sort_by_key(|c| c.timestamp_ms);
        batch
            .into_iter()
            .map(|c| self.push(c))
            .filter(|update| update.changed())
            .count()
    }

    /// Change the retention limit, dropping the oldest candles if the series
    /// is now over capacity. Returns the number evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let overflow = self.candles.len().saturating_sub(self.capacity);
        self.candles.drain(..overflow);
        overflow
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::flat(ts, close)
    }

    #[test]
    fn test_same_bucket_replaces_last() {
        let mut series = PriceSeries::new(10);
        assert_eq!(series.push(candle(1_000, 10.0)), SeriesUpdate::Appended);
        assert_eq!(series.push(candle(1_000, 11.0)), SeriesUpdate::Replaced);
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().map(|c| c.close), Some(11.0));
    }

    #[test]
    fn test_stale_candle_ignored() {
        let mut series = PriceSeries::new(10);
        series.push(candle(2_000, 10.0));
        assert_eq!(series.push(candle(1_000, 9.0)), SeriesUpdate::Stale);
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().map(|c| c.close), Some(10.0));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut series = PriceSeries::new(3);
        for ts in 0..5 {
            series.push(candle(ts, ts as f64));
        }
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_history_is_sorted_before_insert() {
        let mut series = PriceSeries::new(10);
        // Venue returns newest first
        let changed = series.extend_history(vec![candle(3, 3.0), candle(2, 2.0), candle(1, 1.0)]);
        assert_eq!(changed, 3);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_shrinking_capacity_truncates_oldest() {
        let mut series = PriceSeries::new(10);
        for ts in 0..10 {
            series.push(candle(ts, ts as f64));
        }
        assert_eq!(series.set_capacity(4), 6);
        assert_eq!(series.closes(), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(series.set_capacity(8), 0);
        assert_eq!(series.len(), 4);
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(
            capacity in 1usize..50,
            steps in proptest::collection::vec((0i64..3, 1.0f64..100.0), 0..200),
        ) {
            let mut series = PriceSeries::new(capacity);
            let mut ts = 0i64;
            let mut appended = Vec::new();
            for (advance, close) in steps {
                ts += advance;
                if series.push(candle(ts, close)) == SeriesUpdate::Appended {
                    appended.push(ts);
                }
                prop_assert!(series.len() <= capacity);
            }

            // Retained candles are the newest appended buckets, in order
            let expected: Vec<i64> = appended.iter().rev().take(capacity).rev().copied().collect();
            let retained: Vec<i64> = series.iter().map(|c| c.timestamp_ms).collect();
            prop_assert_eq!(retained, expected);
        }
    }
}
