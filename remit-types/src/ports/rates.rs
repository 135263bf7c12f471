//! Exchange rate ports.
//!
//! `RateSource` is the raw upstream feed; `RateProvider` is what the
//! quoting layer consumes: cached, margin-applied, fallback-backed.

use crate::domain::{Currency, FxRate};
use crate::error::RateError;

/// Raw market-rate feed: an HTTP provider, a static table, or a test fake.
///
/// Returns the base rate as units of `from` per one unit of `to`,
/// without margin.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<f64, RateError>;
}

/// Port trait the engine quotes against.
///
/// Implementations apply the platform margin and are responsible for
/// caching and fallback behavior; `get_rate` must never block on a
/// refresh of an already-cached pair.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Effective (margin-applied) rate for a currency pair.
    /// Same-currency pairs return rate 1.0 with no margin.
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<FxRate, RateError>;
}
