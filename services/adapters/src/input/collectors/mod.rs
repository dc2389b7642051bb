//! Venue-specific data collectors

pub mod okx;

pub use okx::OkxCandleCollector;
