// Market data domain (candles, timeframes, indicator rows)
pub mod market;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Signal taxonomy
pub mod signals;

// Domain-specific error types
pub mod errors;
