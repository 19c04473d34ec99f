// Rolling-window indicator computation
pub mod indicators;

// Incremental candle synchronization
pub mod market_data;

// Scan orchestration over (symbol, timeframe) pairs
pub mod scanner;

// Signal scorers
pub mod signals;
