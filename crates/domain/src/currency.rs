use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Supported currencies for payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "ARS")]
    Ars,
}

impl Currency {
    /// Returns the ISO code for the currency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Ars => "ARS",
        }
    }

    /// Parses an ISO code into a supported currency.
    pub fn parse(code: &str) -> Result<Self, DomainError> {
        match code {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "ARS" => Ok(Currency::Ars),
            other => Err(DomainError::UnsupportedCurrency(other.to_string())),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_codes() {
        assert_eq!(Currency::parse("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::parse("EUR").unwrap(), Currency::Eur);
        assert_eq!(Currency::parse("ARS").unwrap(), Currency::Ars);
    }

    #[test]
    fn rejects_unknown_codes() {
        let err = Currency::parse("BTC").unwrap_err();
        assert_eq!(err, DomainError::UnsupportedCurrency("BTC".to_string()));
    }

    #[test]
    fn serde_uses_iso_codes() {
        assert_eq!(serde_json::to_string(&Currency::Ars).unwrap(), "\"ARS\"");
        let parsed: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(parsed, Currency::Eur);
    }
}
