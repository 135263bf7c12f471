//! # Remit Rates
//!
//! Exchange-rate adapter for the transfer engine.
//!
//! Rates flow through three layers:
//! - a [`RateSource`] fetches raw market rates (HTTP feed, or the static
//!   table for development);
//! - [`CachedRateProvider`] caches them process-wide with a short TTL and
//!   stale-while-revalidate refresh, falling back to the static
//!   last-known-good table when the source is down;
//! - a [`MarginSchedule`] applies the platform spread per pair, additive
//!   or percentage, before the rate leaves this crate.
//!
//! All rates are directed: units of the source currency per one unit of
//! the destination currency (ZAR->USD base 17.83 means 17.83 ZAR buys
//! one USD).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use remit_types::{Currency, FxRate, RateError, RateProvider, RateSource};

// ─────────────────────────────────────────────────────────────────────────────
// Static rate table (last-known-good fallback and dev source)
// ─────────────────────────────────────────────────────────────────────────────

/// USD value of one unit of each supported currency. Anchoring every
/// currency to USD lets any directed pair be derived from two anchors.
fn usd_anchor(currency: Currency) -> f64 {
    match currency {
        Currency::USD => 1.0,
        Currency::ZAR => 1.0 / 17.83,
        Currency::MWK => 1.0 / 1733.0,
        Currency::MZN => 1.0 / 63.9,
    }
}

/// Base rate from the static table: `from` units per one `to` unit.
pub fn static_rate(from: Currency, to: Currency) -> f64 {
    usd_anchor(to) / usd_anchor(from)
}

/// Rate source backed by the static table. Used in development and as
/// the last-known-good fallback when the live feed is unreachable.
#[derive(Debug, Default, Clone)]
pub struct StaticRateSource;

#[async_trait::async_trait]
impl RateSource for StaticRateSource {
    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<f64, RateError> {
        Ok(static_rate(from, to))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP rate source
// ─────────────────────────────────────────────────────────────────────────────

/// Payload shape of the upstream feed: units-per-USD quotes.
#[derive(Debug, serde::Deserialize)]
struct RatesPayload {
    rates: HashMap<String, f64>,
}

/// Live market-rate feed over HTTP.
///
/// Expects `GET {base_url}/rates` to return
/// `{"base":"USD","rates":{"ZAR":17.83,"MWK":1733.0,...}}`.
pub struct HttpRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn per_usd(payload: &RatesPayload, currency: Currency) -> Result<f64, RateError> {
        if currency == Currency::USD {
            return Ok(1.0);
        }
        payload
            .rates
            .get(&currency.to_string())
            .copied()
            .ok_or_else(|| RateError::UnsupportedCurrency(currency.to_string()))
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rate(&self, from: Currency, to: Currency) -> Result<f64, RateError> {
        let payload: RatesPayload = self
            .client
            .get(format!("{}/rates", self.base_url))
            .send()
            .await
            .map_err(|e| RateError::SourceUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| RateError::SourceUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| RateError::SourceUnavailable(e.to_string()))?;

        // Feed quotes units-per-USD, so one `from` unit is worth
        // 1/per_usd(from) USD.
        let from_per_usd = Self::per_usd(&payload, from)?;
        let to_per_usd = Self::per_usd(&payload, to)?;
        if !from_per_usd.is_finite() || !to_per_usd.is_finite() || from_per_usd <= 0.0 || to_per_usd <= 0.0
        {
            return Err(RateError::SourceUnavailable(format!(
                "feed returned non-positive rate for {} or {}",
                from, to
            )));
        }
        Ok(from_per_usd / to_per_usd)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Margin schedule
// ─────────────────────────────────────────────────────────────────────────────

/// How the platform spread is applied to a base rate.
///
/// The source material is inconsistent about additive vs. percentage
/// margins, so the model is configurable per pair rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginModel {
    /// Fixed amount added to the base rate (ZAR->USD default: +0.015).
    Additive(f64),
    /// Fractional markup, e.g. 0.005 = 0.5%.
    Percentage(f64),
}

impl MarginModel {
    /// Applies the margin in the direction that favors the platform:
    /// the effective source-per-destination rate rises, so the customer
    /// receives less foreign currency.
    pub fn apply(&self, base: f64) -> f64 {
        match self {
            MarginModel::Additive(m) => base + m,
            MarginModel::Percentage(p) => base * (1.0 + p),
        }
    }
}

/// Per-pair margin configuration with a platform-wide default.
#[derive(Debug, Clone)]
pub struct MarginSchedule {
    pub default: MarginModel,
    pub per_pair: HashMap<(Currency, Currency), MarginModel>,
}

impl Default for MarginSchedule {
    fn default() -> Self {
        let mut per_pair = HashMap::new();
        per_pair.insert(
            (Currency::ZAR, Currency::USD),
            MarginModel::Additive(0.015),
        );
        Self {
            default: MarginModel::Percentage(0.005),
            per_pair,
        }
    }
}

impl MarginSchedule {
    pub fn margin_for(&self, from: Currency, to: Currency) -> MarginModel {
        self.per_pair.get(&(from, to)).copied().unwrap_or(self.default)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cached provider
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    fetched_at: Instant,
    /// Set when a background refresh fails, so a stale entry that cannot
    /// be revalidated is flagged as last-known-good.
    refresh_failed: bool,
}

struct Inner<S: RateSource> {
    source: S,
    cache: DashMap<(Currency, Currency), CachedRate>,
    /// Pairs with a background refresh already in flight.
    refreshing: DashMap<(Currency, Currency), ()>,
    ttl: Duration,
    margins: MarginSchedule,
}

/// Process-wide rate cache with margin application.
///
/// The cache starts cold; the first request for a pair fetches inline.
/// Once a pair is cached, a stale entry is served immediately while a
/// background task refreshes it, so quote requests never block on the
/// upstream feed. Cold-cache source failures fall back to the static
/// table; a stale entry whose refresh keeps failing is served as
/// last-known-good. Both cases flag the result as `degraded`.
pub struct CachedRateProvider<S: RateSource> {
    inner: Arc<Inner<S>>,
}

impl<S: RateSource> Clone for CachedRateProvider<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: RateSource> CachedRateProvider<S> {
    pub fn new(source: S, ttl: Duration, margins: MarginSchedule) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache: DashMap::new(),
                refreshing: DashMap::new(),
                ttl,
                margins,
            }),
        }
    }

    fn effective(&self, from: Currency, to: Currency, base: f64, degraded: bool) -> FxRate {
        FxRate {
            rate: self.inner.margins.margin_for(from, to).apply(base),
            degraded,
        }
    }

    fn spawn_refresh(&self, from: Currency, to: Currency) {
        // Only one refresh in flight per pair.
        if self.inner.refreshing.insert((from, to), ()).is_some() {
            return;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move {
            match inner.source.fetch_rate(from, to).await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => {
                    inner.cache.insert(
                        (from, to),
                        CachedRate {
                            rate,
                            fetched_at: Instant::now(),
                            refresh_failed: false,
                        },
                    );
                }
                Ok(rate) => {
                    tracing::warn!(%from, %to, rate, "rate refresh returned invalid rate");
                    mark_refresh_failed(&inner.cache, from, to);
                }
                Err(e) => {
                    tracing::warn!(%from, %to, error = %e, "rate refresh failed, keeping stale entry");
                    mark_refresh_failed(&inner.cache, from, to);
                }
            }
            inner.refreshing.remove(&(from, to));
        });
    }
}

fn mark_refresh_failed(
    cache: &DashMap<(Currency, Currency), CachedRate>,
    from: Currency,
    to: Currency,
) {
    if let Some(mut entry) = cache.get_mut(&(from, to)) {
        entry.refresh_failed = true;
    }
}

#[async_trait::async_trait]
impl<S: RateSource> RateProvider for CachedRateProvider<S> {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<FxRate, RateError> {
        if from == to {
            return Ok(FxRate::identity());
        }

        if let Some(entry) = self.inner.cache.get(&(from, to)) {
            let cached = *entry;
            drop(entry);
            if cached.fetched_at.elapsed() < self.inner.ttl {
                return Ok(self.effective(from, to, cached.rate, false));
            }
            // Stale-while-revalidate: serve the stale rate, refresh in
            // the background. Once a refresh has failed, the entry is
            // last-known-good and the result says so.
            self.spawn_refresh(from, to);
            return Ok(self.effective(from, to, cached.rate, cached.refresh_failed));
        }

        // Cold cache: fetch inline, fall back to the static table.
        match self.inner.source.fetch_rate(from, to).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => {
                self.inner.cache.insert(
                    (from, to),
                    CachedRate {
                        rate,
                        fetched_at: Instant::now(),
                        refresh_failed: false,
                    },
                );
                Ok(self.effective(from, to, rate, false))
            }
            Ok(rate) => {
                tracing::warn!(%from, %to, rate, "rate source returned invalid rate, using fallback");
                Ok(self.effective(from, to, static_rate(from, to), true))
            }
            Err(e) => {
                tracing::warn!(%from, %to, error = %e, "rate source unavailable, using fallback");
                Ok(self.effective(from, to, static_rate(from, to), true))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Clone)]
    struct FakeSource {
        rate: f64,
        fail: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(rate: f64) -> Self {
            Self {
                rate,
                fail: Arc::new(AtomicBool::new(false)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl RateSource for FakeSource {
        async fn fetch_rate(&self, _from: Currency, _to: Currency) -> Result<f64, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(RateError::SourceUnavailable("down".into()))
            } else {
                Ok(self.rate)
            }
        }
    }

    fn provider(source: FakeSource, ttl: Duration) -> CachedRateProvider<FakeSource> {
        CachedRateProvider::new(source, ttl, MarginSchedule::default())
    }

    #[tokio::test]
    async fn test_zar_usd_additive_margin() {
        let source = FakeSource::new(17.83);
        let provider = provider(source, Duration::from_secs(60));

        let fx = provider
            .get_rate(Currency::ZAR, Currency::USD)
            .await
            .unwrap();

        assert!((fx.rate - 17.845).abs() < 1e-9);
        assert!(!fx.degraded);
    }

    #[tokio::test]
    async fn test_percentage_margin_for_other_pairs() {
        let source = FakeSource::new(100.0);
        let provider = provider(source, Duration::from_secs(60));

        let fx = provider
            .get_rate(Currency::ZAR, Currency::MWK)
            .await
            .unwrap();

        assert!((fx.rate - 100.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_same_currency_identity() {
        let source = FakeSource::new(17.83);
        let provider = provider(source.clone(), Duration::from_secs(60));

        let fx = provider
            .get_rate(Currency::USD, Currency::USD)
            .await
            .unwrap();

        assert_eq!(fx.rate, 1.0);
        assert!(!fx.degraded);
        // No source call for same-currency conversion.
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let source = FakeSource::new(17.83);
        let provider = provider(source.clone(), Duration::from_secs(60));

        provider.get_rate(Currency::ZAR, Currency::USD).await.unwrap();
        provider.get_rate(Currency::ZAR, Currency::USD).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_marks_degraded() {
        let source = FakeSource::new(17.83);
        source.fail.store(true, Ordering::SeqCst);
        let provider = provider(source, Duration::from_secs(60));

        let fx = provider
            .get_rate(Currency::ZAR, Currency::USD)
            .await
            .unwrap();

        assert!(fx.degraded);
        // Static table base 17.83 + additive margin.
        assert!((fx.rate - 17.845).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stale_entry_served_while_revalidating() {
        let source = FakeSource::new(17.83);
        // Zero TTL: every cached read is stale.
        let provider = provider(source.clone(), Duration::ZERO);

        provider.get_rate(Currency::ZAR, Currency::USD).await.unwrap();
        // Served from cache immediately even though stale.
        let fx = provider
            .get_rate(Currency::ZAR, Currency::USD)
            .await
            .unwrap();
        assert!((fx.rate - 17.845).abs() < 1e-9);

        // The background refresh lands eventually.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_stale_entry_degraded_once_refresh_fails() {
        let source = FakeSource::new(17.83);
        let provider = provider(source.clone(), Duration::ZERO);

        // Prime the cache, then take the source down.
        provider.get_rate(Currency::ZAR, Currency::USD).await.unwrap();
        source.fail.store(true, Ordering::SeqCst);

        // First stale read spawns a refresh that will fail.
        provider.get_rate(Currency::ZAR, Currency::USD).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The entry is still served, but flagged last-known-good.
        let fx = provider
            .get_rate(Currency::ZAR, Currency::USD)
            .await
            .unwrap();
        assert!((fx.rate - 17.845).abs() < 1e-9);
        assert!(fx.degraded);
    }

    #[test]
    fn test_static_table_directions() {
        let zar_usd = static_rate(Currency::ZAR, Currency::USD);
        let usd_zar = static_rate(Currency::USD, Currency::ZAR);
        assert!((zar_usd - 17.83).abs() < 1e-9);
        assert!((zar_usd * usd_zar - 1.0).abs() < 1e-9);
    }
}
