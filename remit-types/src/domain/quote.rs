//! Quote domain model: a priced, time-bounded offer to send money.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};

/// Unique identifier for a Quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct QuoteId(Uuid);

impl QuoteId {
    /// Creates a new random QuoteId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a QuoteId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for QuoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for QuoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A directed exchange rate, quoted as units of the source currency
/// per one unit of the destination currency (ZAR->USD: 17.845 ZAR per USD).
///
/// `degraded` is set when the rate came from the static fallback table
/// rather than the live source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FxRate {
    pub rate: f64,
    pub degraded: bool,
}

impl FxRate {
    /// The identity rate used for same-currency conversion.
    pub fn identity() -> Self {
        Self {
            rate: 1.0,
            degraded: false,
        }
    }
}

/// Itemized fee components, all in minor units of the send currency.
///
/// Exposed line-by-line so callers can render and audit each component,
/// not just the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FeeBreakdown {
    pub currency: Currency,
    /// Flat per-transfer fee.
    pub fixed_fee: i64,
    /// Percentage-of-amount component.
    pub percentage_fee: i64,
    /// Surcharge for express processing, zero when not requested.
    pub express_surcharge: i64,
    /// Surcharge applied above the regulatory reporting threshold.
    pub regulatory_surcharge: i64,
    /// Sum of all components.
    pub total_fee: i64,
}

impl FeeBreakdown {
    /// Total fee as a Money value.
    pub fn total(&self) -> Money {
        Money::new(self.total_fee, self.currency).unwrap_or_else(|_| Money::zero(self.currency))
    }
}

/// A priced, time-bounded offer to convert and send money.
///
/// Quotes are ephemeral: they live in an in-process store until consumed
/// by transaction creation or expired. The rate is frozen here and reused
/// verbatim at creation time - it is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Quote {
    pub id: QuoteId,
    pub from_currency: Currency,
    pub to_currency: Currency,
    /// Amount the sender pays in, excluding fees.
    pub send_amount: Money,
    /// Frozen effective rate (base + margin), source units per destination unit.
    pub rate: FxRate,
    pub fee: FeeBreakdown,
    /// send_amount + fee.total
    pub total_cost: Money,
    /// Amount the recipient receives in the destination currency.
    pub recipient_gets: Money,
    pub express: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    /// True if the quote may no longer be committed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_quote() -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::new(),
            from_currency: Currency::ZAR,
            to_currency: Currency::USD,
            send_amount: Money::new(50000, Currency::ZAR).unwrap(),
            rate: FxRate {
                rate: 17.845,
                degraded: false,
            },
            fee: FeeBreakdown {
                currency: Currency::ZAR,
                fixed_fee: 0,
                percentage_fee: 1750,
                express_surcharge: 0,
                regulatory_surcharge: 0,
                total_fee: 1750,
            },
            total_cost: Money::new(51750, Currency::ZAR).unwrap(),
            recipient_gets: Money::new(2802, Currency::USD).unwrap(),
            express: false,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn test_quote_totals_invariant() {
        let quote = sample_quote();
        assert_eq!(
            quote.total_cost.amount(),
            quote.send_amount.amount() + quote.fee.total_fee
        );
    }

    #[test]
    fn test_quote_expiry() {
        let quote = sample_quote();
        assert!(!quote.is_expired(quote.created_at));
        assert!(quote.is_expired(quote.expires_at + Duration::seconds(1)));
    }
}
