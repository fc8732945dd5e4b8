// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Binance,
    Bybit,
    Okx,
    Deribit,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [
        Exchange::Binance,
        Exchange::Bybit,
        Exchange::Okx,
        Exchange::Deribit,
    ];

    /// Identifier persisted in the `exchange` column. Stable across releases.
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Bybit => "bybit",
            Exchange::Okx => "okx",
            Exchange::Deribit => "deribit",
        }
    }

    /// Case-insensitive lookup. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One normalized observation from a source adapter for a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub exchange: Exchange,
    /// 24h traded volume in BTC.
    pub base_volume: f64,
    /// 24h traded volume in USD. Change detection runs on this field.
    pub quote_volume: f64,
    /// Informational only; 0.0 when no price could be resolved.
    pub last_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive_and_trimmed() {
        assert_eq!(Exchange::from_name("Binance"), Some(Exchange::Binance));
        assert_eq!(Exchange::from_name("  OKX "), Some(Exchange::Okx));
        assert_eq!(Exchange::from_name("deribit"), Some(Exchange::Deribit));
    }

    #[test]
    fn unknown_exchange_is_none() {
        assert_eq!(Exchange::from_name("kraken"), None);
        assert_eq!(Exchange::from_name(""), None);
    }

    #[test]
    fn display_matches_persisted_identifier() {
        for ex in Exchange::ALL {
            assert_eq!(ex.to_string(), ex.as_str());
        }
    }
}
