//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use remit_engine::{FeeSchedule, RiskConfig};
use remit_types::{Currency, GatewayConfig, GatewayKind};

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Live market-rate feed; the static table is used when unset.
    pub rate_feed_url: Option<String>,
    pub rate_cache_ttl: Duration,
    pub quote_ttl: chrono::Duration,
    pub verification_ttl: chrono::Duration,
    /// Age at which the reaper fails a PENDING transaction.
    pub pending_timeout: chrono::Duration,
    pub reaper_interval: Duration,
    pub rate_limit_per_minute: u32,
    pub gateways: Vec<GatewayConfig>,
    pub fees: FeeSchedule,
    pub risk: RiskConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let rate_feed_url = env::var("RATE_FEED_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            port,
            database_url,
            rate_feed_url,
            rate_cache_ttl: Duration::from_secs(env_u64("RATE_CACHE_TTL_SECS", 60)?),
            quote_ttl: chrono::Duration::seconds(env_i64("QUOTE_TTL_SECS", 300)?),
            verification_ttl: chrono::Duration::seconds(env_i64("VERIFICATION_TTL_SECS", 600)?),
            pending_timeout: chrono::Duration::seconds(env_i64("PENDING_TIMEOUT_SECS", 1800)?),
            reaper_interval: Duration::from_secs(env_u64("REAPER_INTERVAL_SECS", 60)?),
            rate_limit_per_minute: env_u64("RATE_LIMIT_PER_MINUTE", 100)? as u32,
            gateways: gateway_configs()?,
            fees: fee_schedule()?,
            risk: risk_config()?,
        })
    }
}

fn env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a positive integer, got {:?}", name, v)),
        Err(_) => Ok(default),
    }
}

fn env_i64(name: &str, default: i64) -> anyhow::Result<i64> {
    Ok(env_u64(name, default as u64)? as i64)
}

fn env_f64(name: &str, default: f64) -> anyhow::Result<f64> {
    match env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got {:?}", name, v)),
        Err(_) => Ok(default),
    }
}

/// Fee knobs over the built-in schedule; per-currency overrides stay in code.
fn fee_schedule() -> anyhow::Result<FeeSchedule> {
    let defaults = FeeSchedule::default();
    Ok(FeeSchedule {
        min_amount: env_i64("FEE_MIN_AMOUNT", defaults.min_amount)?,
        max_amount: env_i64("FEE_MAX_AMOUNT", defaults.max_amount)?,
        default_percentage: env_f64("FEE_DEFAULT_PERCENTAGE", defaults.default_percentage)?,
        regulatory_threshold: env_i64("REGULATORY_THRESHOLD", defaults.regulatory_threshold)?,
        ..defaults
    })
}

fn risk_config() -> anyhow::Result<RiskConfig> {
    let defaults = RiskConfig::default();
    Ok(RiskConfig {
        weight_transaction: env_f64("RISK_WEIGHT_TRANSACTION", defaults.weight_transaction)?,
        weight_user: env_f64("RISK_WEIGHT_USER", defaults.weight_user)?,
        weight_device: env_f64("RISK_WEIGHT_DEVICE", defaults.weight_device)?,
        low_max: env_f64("RISK_LOW_MAX", defaults.low_max)?,
        high_min: env_f64("RISK_HIGH_MIN", defaults.high_min)?,
        history_window_days: env_i64("RISK_HISTORY_WINDOW_DAYS", defaults.history_window_days)?,
    })
}

/// A gateway is configured when its `<PREFIX>_ENDPOINT` and
/// `<PREFIX>_WEBHOOK_SECRET` variables are both set; unset providers are
/// simply absent from the registry.
fn gateway_configs() -> anyhow::Result<Vec<GatewayConfig>> {
    let specs = [
        (GatewayKind::Card, "CARD", "ZAR,USD"),
        (GatewayKind::Eft, "EFT", "ZAR"),
        (GatewayKind::OpenBanking, "OPEN_BANKING", "ZAR,USD,MWK,MZN"),
    ];

    let mut configs = Vec::new();
    for (kind, prefix, default_currencies) in specs {
        let endpoint = env::var(format!("{}_ENDPOINT", prefix)).ok();
        let secret = env::var(format!("{}_WEBHOOK_SECRET", prefix)).ok();
        let (Some(endpoint), Some(webhook_secret)) = (endpoint, secret) else {
            continue;
        };

        let raw = env::var(format!("{}_CURRENCIES", prefix))
            .unwrap_or_else(|_| default_currencies.to_string());
        let currencies = parse_currencies(&raw)
            .map_err(|code| anyhow::anyhow!("{}_CURRENCIES: unsupported currency {}", prefix, code))?;

        configs.push(GatewayConfig {
            kind,
            endpoint,
            webhook_secret,
            currencies,
        });
    }
    Ok(configs)
}

fn parse_currencies(raw: &str) -> Result<Vec<Currency>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currencies() {
        let parsed = parse_currencies("ZAR, USD,MWK").unwrap();
        assert_eq!(parsed, vec![Currency::ZAR, Currency::USD, Currency::MWK]);
        assert!(parse_currencies("ZAR,JPY").is_err());
    }
}
