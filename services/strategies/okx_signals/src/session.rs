//! Trading session: the global enable flag plus trade frequency counters.
//!
//! Owned by the decision loop and passed by reference to the gate and the
//! executor. The daily counter resets on a rolling 24h window that starts at
//! the first check after the previous window expired.

use chrono::{DateTime, Duration, Utc};
use signal_config::RiskLimits;
use thiserror::Error;

/// Why the trading-conditions gate refused a buy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("trading is disabled")]
    TradingDisabled,

    #[error("minimum trade interval not elapsed ({remaining_secs}s remaining)")]
    TooSoon { remaining_secs: i64 },

    #[error("daily trade limit of {limit} reached")]
    DailyLimit { limit: u32 },
}

#[derive(Debug, Clone)]
pub struct TradingSession {
    trading_enabled: bool,
    last_trade_at: Option<DateTime<Utc>>,
    daily_trades: u32,
    window_start: DateTime<Utc>,
}

impl TradingSession {
    pub fn new(trading_enabled: bool, now: DateTime<Utc>) -> Self {
        Self {
            trading_enabled,
            last_trade_at: None,
            daily_trades: 0,
            window_start: now,
        }
    }

    pub fn from_limits(limits: &RiskLimits, now: DateTime<Utc>) -> Self {
        Self::new(limits.trading_enabled, now)
    }

    /// All must pass: enabled, interval since the last trade elapsed, and
    /// today's count below the daily maximum.
    pub fn check_conditions(
        &mut self,
        limits: &RiskLimits,
        now: DateTime<Utc>,
    ) -> Result<(), GateRejection> {
        self.roll_window(now);

        if !self.trading_enabled {
            return Err(GateRejection::TradingDisabled);
        }

        if let Some(last) = self.last_trade_at {
            let interval = Duration::seconds(limits.min_trade_interval_secs as i64);
            let elapsed = now - last;
            if elapsed < interval {
                return Err(GateRejection::TooSoon {
                    remaining_secs: (interval - elapsed).num_seconds(),
                });
            }
        }

        if self.daily_trades >= limits.max_trades_per_day {
            return Err(GateRejection::DailyLimit {
                limit: limits.max_trades_per_day,
            });
        }
        Ok(())
    }

    pub fn record_trade(&mut self, now: DateTime<Utc>) {
        self.roll_window(now);
        self.last_trade_at = Some(now);
        self.daily_trades += 1;
    }

    fn roll_window(&mut self, now: DateTime<Utc>) {
        if now - self.window_start >= Duration::hours(24) {
            self.window_start = now;
            self.daily_trades = 0;
        }
    }

    pub fn enable_trading(&mut self) {
        self.trading_enabled = true;
    }

    pub fn disable_trading(&mut self) {
        self.trading_enabled = false;
    }

    pub fn is_trading_enabled(&self) -> bool {
        self.trading_enabled
    }

    pub fn daily_trades(&self) -> u32 {
        self.daily_trades
    }

    pub fn last_trade_at(&self) -> Option<DateTime<Utc>> {
        self.last_trade_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn limits() -> RiskLimits {
        RiskLimits {
            min_trade_interval_secs: 300,
            max_trades_per_day: 2,
            trading_enabled: true,
            ..RiskLimits::default()
        }
    }

    #[test]
    fn test_disabled_session_rejects() {
        let now = start();
        let mut session = TradingSession::new(false, now);
        assert_eq!(
            session.check_conditions(&limits(), now),
            Err(GateRejection::TradingDisabled)
        );
        session.enable_trading();
        assert!(session.check_conditions(&limits(), now).is_ok());
    }

    #[test]
    fn test_min_interval_between_trades() {
        let now = start();
        let mut session = TradingSession::from_limits(&limits(), now);
        session.record_trade(now);

        let early = now + Duration::seconds(120);
        assert_eq!(
            session.check_conditions(&limits(), early),
            Err(GateRejection::TooSoon { remaining_secs: 180 })
        );
        assert!(session
            .check_conditions(&limits(), now + Duration::seconds(300))
            .is_ok());
    }

    #[test]
    fn test_daily_limit_and_rolling_reset() {
        let now = start();
        let mut session = TradingSession::from_limits(&limits(), now);
        session.record_trade(now);
        session.record_trade(now + Duration::minutes(10));

        let later = now + Duration::hours(2);
        assert_eq!(
            session.check_conditions(&limits(), later),
            Err(GateRejection::DailyLimit { limit: 2 })
        );

        let next_day = now + Duration::hours(24);
        assert!(session.check_conditions(&limits(), next_day).is_ok());
        assert_eq!(session.daily_trades(), 0);
    }
}
