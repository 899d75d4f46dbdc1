//! Ticker symbol normalization, applied before any provider call.

/// Trim and upper-case `raw`. A symbol that already names an exchange
/// (contains `.`) is kept; a bare symbol longer than four characters gets
/// `long_suffix` appended. Returns `None` for a blank symbol.
pub fn normalize_ticker(raw: &str, long_suffix: &str) -> Option<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return None;
    }
    if ticker.contains('.') || ticker.len() <= 4 || long_suffix.is_empty() {
        return Some(ticker);
    }
    Some(format!("{ticker}{}", long_suffix.to_ascii_uppercase()))
}
