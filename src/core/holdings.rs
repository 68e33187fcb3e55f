use crate::core::currency::CurrencyCode;
use crate::core::custodian::{Asset, Custodian, Transaction};
use bigdecimal::{BigDecimal, Zero};
use std::collections::BTreeMap;

/// Running totals per currency code.
///
/// Built per query and thrown away. Output is always ordered by code.
///
/// # Examples
///
/// ```
/// use bigdecimal::BigDecimal;
/// use custodian_sim::core::holdings::AssetList;
/// use custodian_sim::core::currency::CurrencyCode;
///
/// let mut list = AssetList::new();
/// list.add(CurrencyCode::new("USD"), &BigDecimal::from(10));
/// list.add(CurrencyCode::new("BTC"), &BigDecimal::from(1));
/// list.add(CurrencyCode::new("USD"), &BigDecimal::from(5));
///
/// let assets = list.into_assets();
/// assert_eq!(assets[0].code.as_str(), "BTC");
/// assert_eq!(assets[1].balance, BigDecimal::from(15));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssetList {
    totals: BTreeMap<CurrencyCode, BigDecimal>,
}

impl AssetList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum `value` into the entry for `code`, creating it if needed.
    pub fn add(&mut self, code: CurrencyCode, value: &BigDecimal) {
        *self.totals.entry(code).or_insert_with(BigDecimal::zero) += value;
    }

    pub fn add_asset(&mut self, asset: &Asset) {
        self.add(asset.code.clone(), &asset.balance);
    }

    pub fn add_transaction(&mut self, transaction: &Transaction) {
        self.add(transaction.asset().clone(), transaction.amount());
    }

    pub fn total(&self, code: &CurrencyCode) -> BigDecimal {
        self.totals.get(code).cloned().unwrap_or_else(BigDecimal::zero)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Materialize as `(code, total)` pairs sorted by code.
    pub fn into_assets(self) -> Vec<Asset> {
        self.totals
            .into_iter()
            .map(|(code, balance)| Asset { code, balance })
            .collect()
    }
}

/// Total balance per code across every asset of every custodian.
pub fn aggregate_holdings<'a, I>(custodians: I) -> Vec<Asset>
where
    I: IntoIterator<Item = &'a Custodian>,
{
    let mut list = AssetList::new();
    for custodian in custodians {
        for asset in custodian.assets() {
            list.add_asset(asset);
        }
    }
    list.into_assets()
}

/// Total transaction amount per code.
pub fn summarize_transactions<'a, I>(transactions: I) -> Vec<Asset>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut list = AssetList::new();
    for transaction in transactions {
        list.add_transaction(transaction);
    }
    list.into_assets()
}
