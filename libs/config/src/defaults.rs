//! Default values shared by the feed, the venue client and the strategy
//!
//! Kept in one place so the config structs, the adapters and the tests agree
//! on the numbers.

/// OKX endpoints
pub mod okx {
    /// Business websocket carrying candle channels
    pub const WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/business";

    /// REST base URL (same host for sandbox; simulated trading is a header)
    pub const REST_URL: &str = "https://www.okx.com";

    /// Spot cash trading mode
    pub const TRADE_MODE: &str = "cash";

    /// Maximum rows the candles endpoint returns per call
    pub const MAX_CANDLES_PER_REQUEST: usize = 300;
}

/// Feed connector defaults
pub mod feed {
    pub const BASE_CURRENCY: &str = "BTC";
    pub const QUOTE_CURRENCY: &str = "USDT";
    pub const BAR: &str = "1m";

    /// Retained candles (selectable 300 / 1000 / 2000)
    pub const MAX_POINTS: usize = 300;

    pub const CONNECT_TIMEOUT_MS: u64 = 30_000;
    pub const SUBSCRIBE_TIMEOUT_MS: u64 = 10_000;

    /// Silence after which a connected feed is considered dead
    pub const MESSAGE_TIMEOUT_MS: u64 = 30_000;

    pub const KEEPALIVE_INTERVAL_MS: u64 = 25_000;

    pub const BASE_BACKOFF_MS: u64 = 5_000;
    pub const MAX_BACKOFF_MS: u64 = 60_000;
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

    /// Decoded candle queue between the read loop and the decision loop
    pub const QUEUE_CAPACITY: usize = 1_024;
}

/// Venue trading rules that are not published by the exchange
pub mod venue {
    /// Simulated trading rejects small orders more aggressively
    pub const MIN_ORDER_NOTIONAL_SANDBOX: i64 = 50;
    pub const MIN_ORDER_NOTIONAL_LIVE: i64 = 5;

    /// Fraction of available quote balance a single order may use, in percent
    pub const BALANCE_UTILIZATION_PERCENT: i64 = 90;

    /// Sandbox limit orders cross the touch by this many basis points
    pub const SANDBOX_PRICE_OFFSET_BPS: i64 = 50;

    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
}

/// Decision loop defaults
pub mod engine {
    pub const TICK_INTERVAL_MS: u64 = 1_000;

    /// Ticks between feed health checks
    pub const HEALTH_CHECK_EVERY_TICKS: u32 = 10;

    /// Candles required before multi-condition evaluation
    pub const MIN_HISTORY: usize = 30;
}
