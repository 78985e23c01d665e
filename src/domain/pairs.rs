//! Trading pair lists: parsing from configuration and ranking by volume.

use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairListError {
    #[error("empty token in pair list")]
    EmptyToken,

    #[error("duplicate pair: {0}")]
    DuplicatePair(String),

    #[error("invalid pair symbol '{0}' (letters and digits only)")]
    InvalidSymbol(String),
}

/// Parse a comma-separated pair list. Symbols are upper-cased.
pub fn parse_pairs(input: &str) -> Result<Vec<String>, PairListError> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(PairListError::EmptyToken);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PairListError::InvalidSymbol(trimmed.to_string()));
        }
        let pair = trimmed.to_ascii_uppercase();
        if !seen.insert(pair.clone()) {
            return Err(PairListError::DuplicatePair(pair));
        }
        pairs.push(pair);
    }

    Ok(pairs)
}

/// 24h ticker snapshot for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub quote_volume: f64,
}

/// Symbols quoted in `quote`, highest quote volume first, at most `count`.
/// Non-finite volumes are ignored; ties keep input order.
pub fn rank_top_pairs(tickers: &[Ticker], quote: &str, count: usize) -> Vec<String> {
    let quote = quote.to_ascii_uppercase();
    let mut candidates: Vec<&Ticker> = tickers
        .iter()
        .filter(|t| {
            t.symbol.len() > quote.len()
                && t.symbol.ends_with(&quote)
                && t.quote_volume.is_finite()
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.quote_volume
            .partial_cmp(&a.quote_volume)
            .unwrap_or(Ordering::Equal)
    });
    candidates
        .into_iter()
        .take(count)
        .map(|t| t.symbol.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(symbol: &str, quote_volume: f64) -> Ticker {
        Ticker {
            symbol: symbol.into(),
            quote_volume,
        }
    }

    #[test]
    fn parse_pairs_uppercases_and_trims() {
        let pairs = parse_pairs(" ethbtc, BNBBTC ,adaBtc").unwrap();
        assert_eq!(pairs, vec!["ETHBTC", "BNBBTC", "ADABTC"]);
    }

    #[test]
    fn parse_pairs_rejects_bad_input() {
        assert_eq!(parse_pairs("ETHBTC,,BNBBTC"), Err(PairListError::EmptyToken));
        assert_eq!(
            parse_pairs("ETHBTC,ethbtc"),
            Err(PairListError::DuplicatePair("ETHBTC".into()))
        );
        assert_eq!(
            parse_pairs("ETH/BTC"),
            Err(PairListError::InvalidSymbol("ETH/BTC".into()))
        );
        assert_eq!(parse_pairs(""), Err(PairListError::EmptyToken));
    }

    #[test]
    fn rank_filters_by_quote_and_sorts_descending() {
        let tickers = vec![
            ticker("ETHBTC", 500.0),
            ticker("BTCUSDT", 9_000.0),
            ticker("BNBBTC", 800.0),
            ticker("ADABTC", 20.0),
            ticker("BTC", 1e9),
        ];
        assert_eq!(rank_top_pairs(&tickers, "btc", 2), vec!["BNBBTC", "ETHBTC"]);
        assert_eq!(rank_top_pairs(&tickers, "BTC", 10).len(), 3);
    }

    #[test]
    fn rank_skips_non_finite_volume() {
        let tickers = vec![ticker("ETHBTC", f64::NAN), ticker("XRPBTC", 1.0)];
        assert_eq!(rank_top_pairs(&tickers, "BTC", 5), vec!["XRPBTC"]);
    }
}
