//! Rule-based risk scoring.
//!
//! Three weighted sub-scores (transaction, user, device), each a 0-100
//! heuristic, combined and clamped to [0, 100]. The scorer is pure:
//! it reads the supplied context and never touches a repository.

use chrono::{DateTime, Utc};

use remit_types::{
    DeviceContext, KnownDevice, KycProfile, KycTier, Money, RiskAssessment, RiskFactor, RiskTier,
    UserHistory,
};

/// Weights and tier thresholds, loaded from the environment at startup.
#[derive(Debug, Clone, Copy)]
pub struct RiskConfig {
    pub weight_transaction: f64,
    pub weight_user: f64,
    pub weight_device: f64,
    /// Scores at or below this are LOW.
    pub low_max: f64,
    /// Scores at or above this are HIGH.
    pub high_min: f64,
    /// Trailing window for frequency and history aggregates.
    pub history_window_days: i64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weight_transaction: 0.4,
            weight_user: 0.3,
            weight_device: 0.3,
            low_max: 30.0,
            high_min: 71.0,
            history_window_days: 30,
        }
    }
}

impl RiskConfig {
    /// Tier for a composite score.
    pub fn tier_for(&self, score: f64) -> RiskTier {
        if score <= self.low_max {
            RiskTier::Low
        } else if score >= self.high_min {
            RiskTier::High
        } else {
            RiskTier::Medium
        }
    }
}

/// Per-user inputs the service gathers before scoring.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub history: UserHistory,
    pub kyc: KycProfile,
    pub known_device: Option<KnownDevice>,
}

pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Scores a transfer candidate. Factors are recorded in evaluation
    /// order; their weights are the points contributed to the owning
    /// sub-score, not the composite.
    pub fn assess(
        &self,
        amount: Money,
        user: &UserContext,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let mut factors = Vec::new();

        let tx_score = self.transaction_score(amount, user, &mut factors);
        let user_score = self.user_score(user, &mut factors);
        let device_score = self.device_score(user, device, now, &mut factors);

        let score = (self.config.weight_transaction * tx_score
            + self.config.weight_user * user_score
            + self.config.weight_device * device_score)
            .clamp(0.0, 100.0);

        RiskAssessment {
            score,
            tier: self.config.tier_for(score),
            factors,
        }
    }

    fn transaction_score(
        &self,
        amount: Money,
        user: &UserContext,
        factors: &mut Vec<RiskFactor>,
    ) -> f64 {
        let mut score: f64 = 0.0;
        let minor = amount.amount();

        // Amount relative to the user's historical average.
        if user.history.average_amount > 0 {
            let ratio = minor as f64 / user.history.average_amount as f64;
            if ratio >= 5.0 {
                score += 40.0;
                factors.push(RiskFactor {
                    code: "amount_vs_history",
                    weight: 40.0,
                    detail: format!("amount is {:.1}x the user's average", ratio),
                });
            } else if ratio >= 2.0 {
                score += 20.0;
                factors.push(RiskFactor {
                    code: "amount_vs_history",
                    weight: 20.0,
                    detail: format!("amount is {:.1}x the user's average", ratio),
                });
            }
        }

        // Burst of transfers inside the trailing window.
        if user.history.recent_count >= 10 {
            score += 30.0;
            factors.push(RiskFactor {
                code: "transfer_frequency",
                weight: 30.0,
                detail: format!(
                    "{} transfers in the last {} days",
                    user.history.recent_count, self.config.history_window_days
                ),
            });
        } else if user.history.recent_count >= 5 {
            score += 15.0;
            factors.push(RiskFactor {
                code: "transfer_frequency",
                weight: 15.0,
                detail: format!(
                    "{} transfers in the last {} days",
                    user.history.recent_count, self.config.history_window_days
                ),
            });
        }

        // Proximity to the KYC tier's monthly limit.
        if user.kyc.monthly_limit > 0 {
            let projected =
                (user.kyc.monthly_used + minor) as f64 / user.kyc.monthly_limit as f64;
            if projected >= 0.9 {
                score += 30.0;
                factors.push(RiskFactor {
                    code: "limit_proximity",
                    weight: 30.0,
                    detail: format!("{:.0}% of monthly limit after this transfer", projected * 100.0),
                });
            } else if projected >= 0.75 {
                score += 15.0;
                factors.push(RiskFactor {
                    code: "limit_proximity",
                    weight: 15.0,
                    detail: format!("{:.0}% of monthly limit after this transfer", projected * 100.0),
                });
            }
        }

        score.min(100.0)
    }

    fn user_score(&self, user: &UserContext, factors: &mut Vec<RiskFactor>) -> f64 {
        let mut score: f64 = 0.0;

        let age = user.kyc.account_age_days;
        if age < 7 {
            score += 40.0;
            factors.push(RiskFactor {
                code: "young_account",
                weight: 40.0,
                detail: format!("account is {} days old", age),
            });
        } else if age < 30 {
            score += 20.0;
            factors.push(RiskFactor {
                code: "young_account",
                weight: 20.0,
                detail: format!("account is {} days old", age),
            });
        }

        match user.kyc.tier {
            KycTier::Unverified => {
                score += 40.0;
                factors.push(RiskFactor {
                    code: "kyc_tier",
                    weight: 40.0,
                    detail: "user is unverified".into(),
                });
            }
            KycTier::Basic => {
                score += 15.0;
                factors.push(RiskFactor {
                    code: "kyc_tier",
                    weight: 15.0,
                    detail: "user has basic verification only".into(),
                });
            }
            KycTier::Full => {}
        }

        if user.history.failed_count > 0 {
            let points = (15.0 * user.history.failed_count as f64).min(40.0);
            score += points;
            factors.push(RiskFactor {
                code: "prior_failures",
                weight: points,
                detail: format!("{} prior failed transfers", user.history.failed_count),
            });
        }

        score.min(100.0)
    }

    fn device_score(
        &self,
        user: &UserContext,
        device: &DeviceContext,
        now: DateTime<Utc>,
        factors: &mut Vec<RiskFactor>,
    ) -> f64 {
        let mut score: f64 = 0.0;

        match &user.known_device {
            None => {
                score += 40.0;
                factors.push(RiskFactor {
                    code: "new_device",
                    weight: 40.0,
                    detail: "device fingerprint not seen before".into(),
                });
            }
            Some(known) => {
                // Implausible travel since the last sighting.
                let hours = (now - known.last_seen_at).num_seconds() as f64 / 3600.0;
                if hours > 0.0 {
                    let km = haversine_km(
                        known.latitude,
                        known.longitude,
                        device.latitude,
                        device.longitude,
                    );
                    let kmh = km / hours;
                    if kmh > 900.0 {
                        score += 30.0;
                        factors.push(RiskFactor {
                            code: "impossible_travel",
                            weight: 30.0,
                            detail: format!("{:.0} km in {:.1} h since last sighting", km, hours),
                        });
                    }
                }
            }
        }

        if device.ip_country != device.declared_country {
            score += 30.0;
            factors.push(RiskFactor {
                code: "geo_mismatch",
                weight: 30.0,
                detail: format!(
                    "request from {} but profile says {}",
                    device.ip_country, device.declared_country
                ),
            });
        }

        score.min(100.0)
    }
}

/// Great-circle distance in kilometers.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use remit_types::Currency;
    use uuid::Uuid;

    fn established_user() -> UserContext {
        UserContext {
            history: UserHistory {
                recent_count: 2,
                average_amount: 50000,
                failed_count: 0,
            },
            kyc: KycProfile {
                tier: KycTier::Full,
                monthly_limit: 10_000_000,
                monthly_used: 0,
                account_age_days: 400,
            },
            known_device: Some(home_device()),
        }
    }

    fn home_device() -> KnownDevice {
        KnownDevice {
            user_id: Uuid::new_v4(),
            fingerprint: "fp_home".into(),
            country: "ZA".into(),
            latitude: -26.2,
            longitude: 28.0,
            last_seen_at: Utc::now() - Duration::days(1),
        }
    }

    fn matching_device() -> DeviceContext {
        DeviceContext {
            fingerprint: "fp_home".into(),
            ip_country: "ZA".into(),
            declared_country: "ZA".into(),
            latitude: -26.2,
            longitude: 28.0,
        }
    }

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default())
    }

    #[test]
    fn test_established_user_scores_low() {
        let assessment = scorer().assess(
            Money::new(50000, Currency::ZAR).unwrap(),
            &established_user(),
            &matching_device(),
            Utc::now(),
        );

        assert_eq!(assessment.tier, RiskTier::Low);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_new_unverified_user_needs_verification() {
        let user = UserContext {
            history: UserHistory::default(),
            kyc: KycProfile {
                tier: KycTier::Unverified,
                monthly_limit: 500_000,
                monthly_used: 400_000,
                account_age_days: 1,
            },
            known_device: None,
        };
        let device = DeviceContext {
            ip_country: "GB".into(),
            ..matching_device()
        };

        let assessment = scorer().assess(
            Money::new(100_000, Currency::ZAR).unwrap(),
            &user,
            &device,
            Utc::now(),
        );

        // user: 40 (age) + 40 (kyc) = 80; device: 40 (new) + 30 (geo) = 70;
        // transaction: 30 (limit). Composite 0.4*30 + 0.3*80 + 0.3*70 = 57.
        assert_eq!(assessment.tier, RiskTier::Medium);
        let codes = assessment.factor_codes();
        assert!(codes.contains(&"young_account".to_string()));
        assert!(codes.contains(&"kyc_tier".to_string()));
        assert!(codes.contains(&"new_device".to_string()));
        assert!(codes.contains(&"geo_mismatch".to_string()));
    }

    #[test]
    fn test_tier_boundaries() {
        let config = RiskConfig::default();
        assert_eq!(config.tier_for(30.0), RiskTier::Low);
        assert_eq!(config.tier_for(31.0), RiskTier::Medium);
        assert_eq!(config.tier_for(70.0), RiskTier::Medium);
        assert_eq!(config.tier_for(71.0), RiskTier::High);
    }

    #[test]
    fn test_impossible_travel_flagged() {
        let mut user = established_user();
        // Last seen in Johannesburg one hour ago.
        if let Some(device) = user.known_device.as_mut() {
            device.last_seen_at = Utc::now() - Duration::hours(1);
        }
        // Request now placed in London.
        let device = DeviceContext {
            latitude: 51.5,
            longitude: -0.1,
            ..matching_device()
        };

        let assessment = scorer().assess(
            Money::new(50000, Currency::ZAR).unwrap(),
            &user,
            &device,
            Utc::now(),
        );

        assert!(assessment
            .factor_codes()
            .contains(&"impossible_travel".to_string()));
    }

    #[test]
    fn test_amount_spike_flagged() {
        let user = established_user();
        let assessment = scorer().assess(
            Money::new(300_000, Currency::ZAR).unwrap(),
            &user,
            &matching_device(),
            Utc::now(),
        );

        let spike = assessment
            .factors
            .iter()
            .find(|f| f.code == "amount_vs_history")
            .expect("spike factor present");
        assert_eq!(spike.weight, 40.0);
    }
}
