use anyhow::{Result, bail};

/// Quote currencies recognised when splitting an exchange pair, longest first
/// so that "USDT" wins over "USD".
const QUOTE_CURRENCIES: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", // Stablecoins
    "USD", "EUR", "GBP", "TRY", "BTC", "ETH", "BNB",
];

/// Normalizes a trading pair to the "BASE/QUOTE" form used as the storage key.
///
/// Accepts either an exchange-native pair ("BTCUSDT") or an already
/// normalized one ("btc/usdt"), so that both spellings map to the same series.
///
/// # Examples
/// ```
/// use candlescan::domain::market::symbol::normalize_symbol;
///
/// assert_eq!(normalize_symbol("BTCUSDT").unwrap(), "BTC/USDT");
/// assert_eq!(normalize_symbol("eth/usdt").unwrap(), "ETH/USDT");
/// ```
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();

    if symbol.is_empty() {
        bail!("Cannot normalize empty symbol");
    }

    if let Some((base, quote)) = symbol.split_once('/') {
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            bail!("Malformed symbol: '{}'. Expected BASE/QUOTE", symbol);
        }
        return Ok(symbol);
    }

    for quote in QUOTE_CURRENCIES {
        if let Some(base) = symbol.strip_suffix(quote)
            && !base.is_empty()
            && base.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Ok(format!("{}/{}", base, quote));
        }
    }

    bail!(
        "Cannot normalize symbol: '{}' - no recognized quote currency",
        symbol
    )
}

/// Exchange-native form of a normalized pair ("BTC/USDT" -> "BTCUSDT").
pub fn denormalize_symbol(symbol: &str) -> String {
    symbol.replace('/', "")
}
