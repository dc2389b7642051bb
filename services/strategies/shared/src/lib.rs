//! Shared Strategy Framework
//!
//! Lifecycle trait and metrics common to signal strategies.

pub mod metrics;
pub mod traits;

pub use metrics::*;
pub use traits::*;
