//! Fee calculation.
//!
//! Pure arithmetic over a [`FeeSchedule`]; no I/O, no state. Amount
//! bounds are enforced here, before any rate lookup or fee math runs.

use std::collections::HashMap;

use remit_types::{Currency, DomainError, FeeBreakdown, Money};

/// A surcharge expressed either as a flat minor-unit amount or as a
/// fraction of the send amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surcharge {
    Flat(i64),
    Percentage(f64),
}

impl Surcharge {
    fn amount_for(&self, send_minor: i64) -> i64 {
        match self {
            Surcharge::Flat(v) => *v,
            Surcharge::Percentage(p) => round_half_up(send_minor as f64 * p),
        }
    }
}

/// Fee configuration, loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    /// Smallest accepted send amount, minor units.
    pub min_amount: i64,
    /// Largest accepted send amount, minor units.
    pub max_amount: i64,
    /// Percentage fee applied when no per-currency override exists.
    pub default_percentage: f64,
    pub percentage_overrides: HashMap<Currency, f64>,
    /// Flat per-transfer fee by send currency, minor units.
    pub fixed_fees: HashMap<Currency, i64>,
    pub express_surcharge: Surcharge,
    /// Send amounts at or above this (minor units) attract the
    /// regulatory reporting surcharge.
    pub regulatory_threshold: i64,
    pub regulatory_surcharge: Surcharge,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let mut percentage_overrides = HashMap::new();
        percentage_overrides.insert(Currency::ZAR, 0.035);

        Self {
            min_amount: 100,
            max_amount: 10_000_000,
            default_percentage: 0.02,
            percentage_overrides,
            fixed_fees: HashMap::new(),
            express_surcharge: Surcharge::Flat(2500),
            regulatory_threshold: 5_000_000,
            regulatory_surcharge: Surcharge::Percentage(0.0025),
        }
    }
}

/// Rounds to the nearest minor unit, half away from zero.
fn round_half_up(value: f64) -> i64 {
    value.round() as i64
}

/// Computes itemized fees for a transfer.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// Rejects amounts outside the configured bounds. Runs before any
    /// fee or rate computation so an out-of-range request never touches
    /// the rate source.
    pub fn check_bounds(&self, amount: Money) -> Result<(), DomainError> {
        let minor = amount.amount();
        if minor <= 0 {
            return Err(DomainError::InvalidAmount(
                "send amount must be positive".into(),
            ));
        }
        if minor < self.schedule.min_amount || minor > self.schedule.max_amount {
            return Err(DomainError::AmountOutOfRange {
                amount: minor,
                min: self.schedule.min_amount,
                max: self.schedule.max_amount,
            });
        }
        Ok(())
    }

    /// Itemized fee for a send amount. The caller is expected to have
    /// run `check_bounds` first; this re-checks as a guard.
    pub fn calculate(&self, amount: Money, express: bool) -> Result<FeeBreakdown, DomainError> {
        self.check_bounds(amount)?;

        let minor = amount.amount();
        let currency = amount.currency();

        let percentage = self
            .schedule
            .percentage_overrides
            .get(&currency)
            .copied()
            .unwrap_or(self.schedule.default_percentage);

        let fixed_fee = self.schedule.fixed_fees.get(&currency).copied().unwrap_or(0);
        let percentage_fee = round_half_up(minor as f64 * percentage);
        let express_surcharge = if express {
            self.schedule.express_surcharge.amount_for(minor)
        } else {
            0
        };
        let regulatory_surcharge = if minor >= self.schedule.regulatory_threshold {
            self.schedule.regulatory_surcharge.amount_for(minor)
        } else {
            0
        };

        Ok(FeeBreakdown {
            currency,
            fixed_fee,
            percentage_fee,
            express_surcharge,
            regulatory_surcharge,
            total_fee: fixed_fee + percentage_fee + express_surcharge + regulatory_surcharge,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> FeeCalculator {
        FeeCalculator::new(FeeSchedule::default())
    }

    #[test]
    fn test_zar_percentage_fee() {
        // R500.00 at 3.5% -> R17.50.
        let amount = Money::new(50000, Currency::ZAR).unwrap();
        let fee = calculator().calculate(amount, false).unwrap();

        assert_eq!(fee.percentage_fee, 1750);
        assert_eq!(fee.fixed_fee, 0);
        assert_eq!(fee.express_surcharge, 0);
        assert_eq!(fee.regulatory_surcharge, 0);
        assert_eq!(fee.total_fee, 1750);
    }

    #[test]
    fn test_default_percentage_for_other_currencies() {
        let amount = Money::new(10000, Currency::USD).unwrap();
        let fee = calculator().calculate(amount, false).unwrap();

        assert_eq!(fee.percentage_fee, 200);
    }

    #[test]
    fn test_express_surcharge_added() {
        let amount = Money::new(50000, Currency::ZAR).unwrap();
        let fee = calculator().calculate(amount, true).unwrap();

        assert_eq!(fee.express_surcharge, 2500);
        assert_eq!(fee.total_fee, 1750 + 2500);
    }

    #[test]
    fn test_regulatory_surcharge_at_threshold() {
        // Exactly 50,000.00 major units triggers the surcharge.
        let amount = Money::new(5_000_000, Currency::ZAR).unwrap();
        let fee = calculator().calculate(amount, false).unwrap();

        assert_eq!(fee.regulatory_surcharge, 12500);

        let below = Money::new(4_999_999, Currency::ZAR).unwrap();
        let fee = calculator().calculate(below, false).unwrap();
        assert_eq!(fee.regulatory_surcharge, 0);
    }

    #[test]
    fn test_rounding_half_up() {
        let mut schedule = FeeSchedule::default();
        schedule.percentage_overrides.insert(Currency::ZAR, 0.035);
        let calc = FeeCalculator::new(schedule);

        // 101 * 0.035 = 3.535 -> 4.
        let amount = Money::new(101, Currency::ZAR).unwrap();
        let fee = calc.calculate(amount, false).unwrap();
        assert_eq!(fee.percentage_fee, 4);
    }

    #[test]
    fn test_bounds_rejected() {
        let calc = calculator();

        let too_small = Money::new(50, Currency::ZAR).unwrap();
        assert!(matches!(
            calc.calculate(too_small, false),
            Err(DomainError::AmountOutOfRange { .. })
        ));

        let too_large = Money::new(10_000_001, Currency::ZAR).unwrap();
        assert!(matches!(
            calc.check_bounds(too_large),
            Err(DomainError::AmountOutOfRange { .. })
        ));

        let zero = Money::new(0, Currency::ZAR).unwrap();
        assert!(matches!(
            calc.check_bounds(zero),
            Err(DomainError::InvalidAmount(_))
        ));
    }
}
