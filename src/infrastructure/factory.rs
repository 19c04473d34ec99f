use crate::config::{Config, ExchangeKind};
use crate::domain::ports::ExchangeClient;
use crate::infrastructure::binance::BinanceExchangeClient;
use crate::infrastructure::mock::MockExchangeClient;
use std::sync::Arc;
use tracing::info;

pub struct ExchangeFactory;

impl ExchangeFactory {
    pub fn create(config: &Config) -> Arc<dyn ExchangeClient> {
        match config.exchange {
            ExchangeKind::Binance => {
                info!("ExchangeFactory: using Binance at {}", config.binance.base_url);
                Arc::new(BinanceExchangeClient::new(&config.binance))
            }
            ExchangeKind::Mock => {
                info!("ExchangeFactory: using synthetic mock exchange");
                Arc::new(MockExchangeClient::synthetic())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_client_id_follows_configured_exchange() {
        let vars: HashMap<&str, &str> = HashMap::from([("EXCHANGE", "mock")]);
        let config = Config::from_lookup(&|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(ExchangeFactory::create(&config).id(), "mock");

        let config = Config::from_lookup(&|_| None).unwrap();
        assert_eq!(ExchangeFactory::create(&config).id(), "binance");
    }
}
