//! Open positions and the append-only trade history

use crate::error::{Result, StrategyError};
use std::collections::HashMap;
use types::{InstrumentId, Position, TradeRecord};

/// At most one open position per instrument
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<InstrumentId, Position>,
    history: Vec<TradeRecord>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, position: Position) -> Result<()> {
        if self.positions.contains_key(&position.instrument) {
            return Err(StrategyError::PositionAlreadyOpen {
                instrument: position.instrument,
            });
        }
        self.positions.insert(position.instrument.clone(), position);
        Ok(())
    }

    pub fn close(&mut self, instrument: &InstrumentId) -> Option<Position> {
        self.positions.remove(instrument)
    }

    pub fn position(&self, instrument: &InstrumentId) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn has_position(&self, instrument: &InstrumentId) -> bool {
        self.positions.contains_key(instrument)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn record(&mut self, trade: TradeRecord) {
        self.history.push(trade);
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str) -> Position {
        Position {
            instrument: InstrumentId::new(symbol).unwrap(),
            entry_price: dec!(100),
            size: dec!(1),
            entry_time: Utc::now(),
            order_id: "42".to_string(),
        }
    }

    #[test]
    fn test_second_open_is_refused() {
        let mut ledger = PositionLedger::new();
        ledger.open(position("BTC-USDT")).unwrap();
        assert!(matches!(
            ledger.open(position("BTC-USDT")),
            Err(StrategyError::PositionAlreadyOpen { .. })
        ));
        ledger.open(position("ETH-USDT")).unwrap();
        assert_eq!(ledger.positions().count(), 2);
    }

    #[test]
    fn test_close_removes_position() {
        let mut ledger = PositionLedger::new();
        let btc = InstrumentId::new("BTC-USDT").unwrap();
        ledger.open(position("BTC-USDT")).unwrap();
        assert!(ledger.has_position(&btc));
        assert_eq!(ledger.close(&btc).map(|p| p.order_id), Some("42".to_string()));
        assert!(ledger.close(&btc).is_none());
        assert!(ledger.position(&btc).is_none());
    }

    proptest! {
        #[test]
        fn prop_single_position_per_instrument(ops in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut ledger = PositionLedger::new();
            let btc = InstrumentId::new("BTC-USDT").unwrap();
            for buy in ops {
                if buy {
                    let _ = ledger.open(position("BTC-USDT"));
                } else {
                    ledger.close(&btc);
                }
                prop_assert!(ledger.positions().filter(|p| p.instrument == btc).count() <= 1);
            }
        }
    }
}
