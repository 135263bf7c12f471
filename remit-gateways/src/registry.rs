//! Gateway registry: kind-keyed lookup over the configured adapters.

use std::collections::HashMap;
use std::sync::Arc;

use remit_types::{GatewayConfig, GatewayKind, PaymentGateway};

use crate::{CardGateway, EftGateway, OpenBankingGateway};

/// Immutable set of configured gateways, built once at startup.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from per-provider configs, sharing one HTTP client.
    pub fn from_configs(configs: Vec<GatewayConfig>, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        for config in configs {
            let gateway: Arc<dyn PaymentGateway> = match config.kind {
                GatewayKind::Card => Arc::new(CardGateway::new(config, client.clone())),
                GatewayKind::Eft => Arc::new(EftGateway::new(config, client.clone())),
                GatewayKind::OpenBanking => {
                    Arc::new(OpenBankingGateway::new(config, client.clone()))
                }
            };
            registry = registry.register(gateway);
        }
        registry
    }

    pub fn register(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    pub fn get(&self, kind: GatewayKind) -> Option<Arc<dyn PaymentGateway>> {
        self.gateways.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = GatewayKind> + '_ {
        self.gateways.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remit_types::Currency;

    fn config(kind: GatewayKind) -> GatewayConfig {
        GatewayConfig {
            kind,
            endpoint: "http://localhost:0".to_string(),
            webhook_secret: "whsec".to_string(),
            currencies: vec![Currency::ZAR],
        }
    }

    #[test]
    fn test_from_configs_registers_each_kind() {
        let registry = GatewayRegistry::from_configs(
            vec![
                config(GatewayKind::Card),
                config(GatewayKind::Eft),
                config(GatewayKind::OpenBanking),
            ],
            reqwest::Client::new(),
        );

        assert!(registry.get(GatewayKind::Card).is_some());
        assert!(registry.get(GatewayKind::Eft).is_some());
        assert!(registry.get(GatewayKind::OpenBanking).is_some());
        assert_eq!(registry.kinds().count(), 3);
    }

    #[test]
    fn test_missing_gateway_is_none() {
        let registry =
            GatewayRegistry::from_configs(vec![config(GatewayKind::Card)], reqwest::Client::new());
        assert!(registry.get(GatewayKind::Eft).is_none());
    }
}
