//! Symbol normalization for linear USDT perpetuals.

/// Normalize user/exchange symbol spellings to the `BASEUSDT` form.
///
/// `"btc/usdt:usdt"`, `"BTC-USDT"` and `"btc"` all become `"BTCUSDT"`.
pub fn normalize_symbol(symbol: &str) -> String {
    let mut clean = symbol.trim().to_ascii_uppercase();
    if let Some(stripped) = clean.strip_suffix(":USDT") {
        clean = stripped.to_string();
    }
    clean.retain(|c| c != '/' && c != '-');
    if !clean.ends_with("USDT") {
        clean.push_str("USDT");
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_spellings() {
        assert_eq!(normalize_symbol("btc/usdt:usdt"), "BTCUSDT");
        assert_eq!(normalize_symbol("BTC-USDT"), "BTCUSDT");
        assert_eq!(normalize_symbol("sol"), "SOLUSDT");
        assert_eq!(normalize_symbol("XRPUSDT"), "XRPUSDT");
    }
}
