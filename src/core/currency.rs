use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Currency or asset code held by a custodian ("BTC", "GBP", ...).
///
/// Codes are compared and ordered lexicographically; that ordering is what
/// aggregated outputs are sorted by.
///
/// # Examples
///
/// ```
/// use custodian_sim::core::currency::CurrencyCode;
///
/// let btc = CurrencyCode::new("BTC");
/// let gbp = CurrencyCode::new("GBP");
/// assert!(btc < gbp);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Errors arising from forex lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    #[error("invalid currency pair {from} -> {to}")]
    UnknownPair { from: CurrencyCode, to: CurrencyCode },
}

/// Fixed forex table.
///
/// Every rate is expressed against a single base currency: one unit of the
/// base buys `rate` units of the code. The base itself has rate 1.
///
/// # Examples
///
/// ```
/// use custodian_sim::core::currency::{CurrencyCode, ForexTable};
/// use rust_decimal_macros::dec;
///
/// let table = ForexTable::standard();
/// let rate = table
///     .rate(&CurrencyCode::new("GBP"), &CurrencyCode::new("EUR"))
///     .unwrap();
/// assert_eq!(rate, dec!(1.125));
/// ```
#[derive(Debug, Clone)]
pub struct ForexTable {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl ForexTable {
    /// Create a table holding only the base currency.
    pub fn new(base: CurrencyCode) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(base.clone(), Decimal::ONE);
        Self { base, rates }
    }

    /// The table the simulator runs with, based on BTC.
    pub fn standard() -> Self {
        Self::new(CurrencyCode::new("BTC"))
            .with_rate(CurrencyCode::new("GBP"), dec!(40000.00))
            .with_rate(CurrencyCode::new("EUR"), dec!(45000.00))
            .with_rate(CurrencyCode::new("ETH"), dec!(14.00000000))
    }

    /// Add or replace the base-relative rate of `code`.
    ///
    /// The rate of the base currency is pinned to 1 and cannot be replaced.
    pub fn with_rate(mut self, code: CurrencyCode, rate: Decimal) -> Self {
        if code != self.base {
            self.rates.insert(code, rate);
        }
        self
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Factor converting one unit of `from` into `to`.
    ///
    /// Identical codes always yield 1, even when the code is not listed.
    pub fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let unknown = || FxError::UnknownPair {
            from: from.clone(),
            to: to.clone(),
        };
        let from_rate = self.rates.get(from).ok_or_else(unknown)?;
        let to_rate = self.rates.get(to).ok_or_else(unknown)?;
        let to_base = Decimal::ONE.checked_div(*from_rate).ok_or_else(unknown)?;
        to_base.checked_mul(*to_rate).ok_or_else(unknown)
    }

    /// Convert `amount` of `from` into `to`.
    ///
    /// The rate is exact to 28 digits; the product keeps every digit.
    pub fn convert(
        &self,
        amount: &BigDecimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<BigDecimal, FxError> {
        let rate = self.rate(from, to)?;
        Ok(amount * &to_big_decimal(rate))
    }
}

/// Lossless widening of a fixed-precision rate into an unbounded decimal.
pub fn to_big_decimal(value: Decimal) -> BigDecimal {
    BigDecimal::new(BigInt::from(value.mantissa()), i64::from(value.scale()))
}

impl Default for ForexTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s)
    }

    #[test]
    fn test_currency_code_ordering() {
        assert!(code("BTC") < code("ETH"));
        assert!(code("EUR") < code("GBP"));
        assert_eq!(code("USD"), CurrencyCode::from("USD"));
    }

    #[test]
    fn test_identity_rate_for_every_code() {
        let table = ForexTable::standard();
        for c in ["BTC", "GBP", "EUR", "ETH", "XYZ"] {
            assert_eq!(table.rate(&code(c), &code(c)).unwrap(), Decimal::ONE);
        }
    }

    #[test]
    fn test_rate_between_non_base_codes() {
        let table = ForexTable::standard();
        assert_eq!(table.rate(&code("GBP"), &code("EUR")).unwrap(), dec!(1.125));
    }

    #[test]
    fn test_rate_from_base() {
        let table = ForexTable::standard();
        assert_eq!(table.rate(&code("BTC"), &code("GBP")).unwrap(), dec!(40000));
        assert_eq!(table.rate(&code("BTC"), &code("ETH")).unwrap(), dec!(14));
    }

    #[test]
    fn test_rate_to_base() {
        let table = ForexTable::standard();
        assert_eq!(
            table.rate(&code("GBP"), &code("BTC")).unwrap(),
            dec!(0.000025)
        );
    }

    #[test]
    fn test_convert() {
        let table = ForexTable::standard();
        let converted = table
            .convert(&to_big_decimal(dec!(2)), &code("BTC"), &code("EUR"))
            .unwrap();
        assert_eq!(converted, to_big_decimal(dec!(90000)));
    }

    #[test]
    fn test_convert_beyond_fixed_precision() {
        let table = ForexTable::standard();
        let huge: BigDecimal = "123456789012345678901234567890.12345678".parse().unwrap();
        let converted = table.convert(&huge, &code("GBP"), &code("BTC")).unwrap();
        let expected: BigDecimal = "3086419725308641972530864.1972530864195".parse().unwrap();
        assert_eq!(converted, expected);
    }

    #[test]
    fn test_to_big_decimal_is_exact() {
        assert_eq!(
            to_big_decimal(dec!(-0.00000001)),
            "-0.00000001".parse::<BigDecimal>().unwrap()
        );
        assert_eq!(
            to_big_decimal(Decimal::MAX),
            "79228162514264337593543950335".parse::<BigDecimal>().unwrap()
        );
    }

    #[test]
    fn test_unknown_pair() {
        let table = ForexTable::standard();
        let err = table.rate(&code("USD"), &code("GBP")).unwrap_err();
        assert_eq!(
            err,
            FxError::UnknownPair {
                from: code("USD"),
                to: code("GBP"),
            }
        );
        assert!(table.rate(&code("GBP"), &code("USD")).is_err());
    }

    #[test]
    fn test_base_rate_is_pinned() {
        let table = ForexTable::standard().with_rate(code("BTC"), dec!(3));
        assert_eq!(table.rate(&code("BTC"), &code("GBP")).unwrap(), dec!(40000));
        assert!(table.contains(&code("BTC")));
        assert_eq!(table.base(), &code("BTC"));
    }
}
