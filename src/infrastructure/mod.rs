pub mod binance;
pub mod core;
pub mod factory;
pub mod mock;
pub mod persistence;

pub use factory::ExchangeFactory;
pub use mock::MockExchangeClient;
