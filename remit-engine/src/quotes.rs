//! Quote pricing and the ephemeral quote store.
//!
//! A quote freezes the effective rate and itemized fee at pricing time.
//! Transaction creation consumes the stored quote verbatim; nothing is
//! recomputed, so the customer pays exactly what was shown.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;

use remit_types::{
    AppError, DomainError, Money, Quote, QuoteId, QuoteRequest, RateProvider,
};

use crate::fees::FeeCalculator;

/// In-process TTL store for unconsumed quotes.
///
/// Quotes are small and short-lived; expired entries are pruned lazily
/// on insert rather than by a sweeper task.
#[derive(Default)]
struct QuoteStore {
    quotes: DashMap<QuoteId, Quote>,
}

impl QuoteStore {
    fn insert(&self, quote: Quote) {
        let now = Utc::now();
        self.quotes.retain(|_, q| !q.is_expired(now));
        self.quotes.insert(quote.id, quote);
    }

    fn take(&self, id: QuoteId) -> Option<Quote> {
        self.quotes.remove(&id).map(|(_, q)| q)
    }
}

/// Prices transfers and hands out consumable quotes.
pub struct QuoteService {
    rates: Arc<dyn RateProvider>,
    fees: FeeCalculator,
    store: QuoteStore,
    ttl: Duration,
}

impl QuoteService {
    pub fn new(rates: Arc<dyn RateProvider>, fees: FeeCalculator, ttl: Duration) -> Self {
        Self {
            rates,
            fees,
            store: QuoteStore::default(),
            ttl,
        }
    }

    /// Prices a transfer and stores the resulting quote until consumed
    /// or expired.
    ///
    /// Bounds are validated before the rate lookup, so an out-of-range
    /// amount never reaches the rate source.
    pub async fn quote(&self, req: &QuoteRequest) -> Result<Quote, AppError> {
        let send_amount = Money::new(req.send_amount, req.from_currency)
            .map_err(|_| DomainError::InvalidAmount("send amount must be positive".into()))?;
        self.fees.check_bounds(send_amount)?;

        let rate = self.rates.get_rate(req.from_currency, req.to_currency).await?;
        let fee = self.fees.calculate(send_amount, req.express)?;

        let total_cost = send_amount.checked_add(fee.total())?;
        // Recipient amount: send minor units divided by the effective
        // rate, rounded to the destination's minor unit. Both sides use
        // two decimals so the minor-unit ratio equals the major ratio.
        let recipient_minor = (send_amount.amount() as f64 / rate.rate).round() as i64;
        let recipient_gets = Money::new(recipient_minor, req.to_currency)
            .map_err(|_| AppError::Internal("recipient amount underflow".into()))?;

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::new(),
            from_currency: req.from_currency,
            to_currency: req.to_currency,
            send_amount,
            rate,
            fee,
            total_cost,
            recipient_gets,
            express: req.express,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.store.insert(quote.clone());
        tracing::debug!(quote_id = %quote.id, rate = rate.rate, degraded = rate.degraded, "quote issued");
        Ok(quote)
    }

    /// Consumes a stored quote for transaction creation.
    ///
    /// Unknown ids and expired quotes both surface as `QuoteExpired`;
    /// the client cannot distinguish them and the remedy is the same.
    pub fn take(&self, id: QuoteId) -> Result<Quote, AppError> {
        let quote = self.store.take(id).ok_or(AppError::QuoteExpired)?;
        if quote.is_expired(Utc::now()) {
            return Err(AppError::QuoteExpired);
        }
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remit_types::{Currency, FxRate, RateError};

    struct FixedRate(f64);

    #[async_trait::async_trait]
    impl RateProvider for FixedRate {
        async fn get_rate(&self, from: Currency, to: Currency) -> Result<FxRate, RateError> {
            if from == to {
                return Ok(FxRate::identity());
            }
            Ok(FxRate {
                rate: self.0,
                degraded: false,
            })
        }
    }

    fn service(rate: f64, ttl: Duration) -> QuoteService {
        QuoteService::new(Arc::new(FixedRate(rate)), FeeCalculator::default(), ttl)
    }

    fn zar_usd_request(send_amount: i64) -> QuoteRequest {
        QuoteRequest {
            send_amount,
            from_currency: Currency::ZAR,
            to_currency: Currency::USD,
            express: false,
        }
    }

    #[tokio::test]
    async fn test_reference_pricing() {
        // R500 at 17.845: fee R17.50, total R517.50, recipient $28.02.
        let service = service(17.845, Duration::minutes(5));
        let quote = service.quote(&zar_usd_request(50000)).await.unwrap();

        assert_eq!(quote.fee.total_fee, 1750);
        assert_eq!(quote.total_cost.amount(), 51750);
        assert_eq!(quote.recipient_gets.amount(), 2802);
        assert_eq!(quote.recipient_gets.currency(), Currency::USD);
    }

    #[tokio::test]
    async fn test_totals_invariant() {
        let service = service(17.845, Duration::minutes(5));
        let quote = service.quote(&zar_usd_request(123456)).await.unwrap();

        assert_eq!(
            quote.total_cost.amount(),
            quote.send_amount.amount() + quote.fee.total_fee
        );
    }

    #[tokio::test]
    async fn test_take_consumes_quote() {
        let service = service(17.845, Duration::minutes(5));
        let quote = service.quote(&zar_usd_request(50000)).await.unwrap();

        assert!(service.take(quote.id).is_ok());
        // Second take of the same id fails.
        assert!(matches!(service.take(quote.id), Err(AppError::QuoteExpired)));
    }

    #[tokio::test]
    async fn test_expired_quote_rejected() {
        let service = service(17.845, Duration::milliseconds(-1));
        let quote = service.quote(&zar_usd_request(50000)).await.unwrap();

        assert!(matches!(service.take(quote.id), Err(AppError::QuoteExpired)));
    }

    #[tokio::test]
    async fn test_bounds_checked_before_rate() {
        let service = service(17.845, Duration::minutes(5));
        let result = service.quote(&zar_usd_request(10_000_001)).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
