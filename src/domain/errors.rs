use thiserror::Error;

/// Failure categories reported by an exchange candle fetch.
///
/// `Network`, `Timeout` and `RateLimited` are transient and worth retrying;
/// `SymbolNotFound` and `Rejected` are permanent for the request as sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Rate limit exceeded: {reason}")]
    RateLimited { reason: String },

    #[error("Symbol not found on exchange: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("Exchange rejected request: {reason}")]
    Rejected { reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. } | FetchError::Timeout { .. } | FetchError::RateLimited { .. }
        )
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}
