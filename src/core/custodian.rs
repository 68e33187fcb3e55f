use crate::core::currency::CurrencyCode;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Identifier of a custodian, assigned by the store starting at 1.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CustodianId(u32);

impl CustodianId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u32> for CustodianId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for CustodianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a transaction, unique within its owning custodian.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionId(u32);

impl TransactionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u32> for TransactionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a transaction moved value into or out of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// A balance in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub code: CurrencyCode,
    #[serde(with = "plain_decimal")]
    pub balance: BigDecimal,
}

impl Asset {
    pub fn new(code: impl Into<CurrencyCode>, balance: BigDecimal) -> Self {
        Self {
            code: code.into(),
            balance,
        }
    }
}

/// An immutable ledger entry.
///
/// `amount` is a magnitude; the sign lives in `direction`. The two related
/// fields are either both absent (external event) or point at the paired
/// leg on the counter-party custodian, which points back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    asset: CurrencyCode,
    #[serde(with = "plain_decimal")]
    amount: BigDecimal,
    direction: Direction,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    related_custodian_id: Option<CustodianId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    related_custodian_transaction_id: Option<TransactionId>,
}

/// Decimals travel as plain strings: `"0.00000001"`, never `"1E-8"`.
pub(crate) mod plain_decimal {
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_plain_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
        BigDecimal::deserialize(deserializer)
    }
}

/// Older snapshots wrote `0` for "no counter-party".
fn zero_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<u32>,
{
    let raw = Option::<u32>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != 0).map(T::from))
}

impl Transaction {
    /// Create an unlinked transaction. Its ID is assigned when it is added
    /// to a custodian.
    pub fn new(asset: impl Into<CurrencyCode>, amount: BigDecimal, direction: Direction) -> Self {
        Self {
            id: TransactionId::default(),
            asset: asset.into(),
            amount,
            direction,
            related_custodian_id: None,
            related_custodian_transaction_id: None,
        }
    }

    /// Link this transaction to its counter-party leg.
    pub fn with_related(mut self, custodian: CustodianId, transaction: TransactionId) -> Self {
        self.related_custodian_id = Some(custodian);
        self.related_custodian_transaction_id = Some(transaction);
        self
    }

    /// Set only the counter-party custodian.
    pub fn with_related_custodian(mut self, custodian: CustodianId) -> Self {
        self.related_custodian_id = Some(custodian);
        self
    }

    /// Set only the counter-party transaction.
    pub fn with_related_transaction(mut self, transaction: TransactionId) -> Self {
        self.related_custodian_transaction_id = Some(transaction);
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn asset(&self) -> &CurrencyCode {
        &self.asset
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn related_custodian_id(&self) -> Option<CustodianId> {
        self.related_custodian_id
    }

    pub fn related_custodian_transaction_id(&self) -> Option<TransactionId> {
        self.related_custodian_transaction_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodianError {
    #[error("custodian {custodian} holds more than one {code} asset")]
    DuplicateAsset {
        custodian: CustodianId,
        code: CurrencyCode,
    },
    #[error("custodian {custodian} has transaction {id} out of order")]
    TransactionOrder {
        custodian: CustodianId,
        id: TransactionId,
    },
}

/// A simulated account holder: a set of balances and their history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custodian {
    id: CustodianId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    assets: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    transactions: Vec<Transaction>,
}

impl Custodian {
    /// Create a custodian that has not been numbered by a store yet.
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            id: CustodianId::default(),
            assets,
            transactions: Vec::new(),
        }
    }

    /// Create a custodian with a specific ID (useful for testing / fixtures).
    pub fn with_id(id: CustodianId, assets: Vec<Asset>) -> Self {
        Self {
            id,
            assets,
            transactions: Vec::new(),
        }
    }

    pub fn id(&self) -> CustodianId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: CustodianId) {
        self.id = id;
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset(&self, code: &CurrencyCode) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.code == code)
    }

    pub(crate) fn assets_mut(&mut self) -> &mut [Asset] {
        &mut self.assets
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Look up a transaction by ID. IDs are strictly increasing, so this is
    /// a binary search.
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions
            .binary_search_by_key(&id, |t| t.id)
            .ok()
            .map(|idx| &self.transactions[idx])
    }

    /// The ID the next appended transaction will receive.
    pub fn next_transaction_id(&self) -> TransactionId {
        self.transactions
            .last()
            .map(|t| t.id.next())
            .unwrap_or(TransactionId::new(1))
    }

    /// Append a transaction, numbering it after the current last one.
    pub fn add_transaction(&mut self, mut transaction: Transaction) -> TransactionId {
        let id = self.next_transaction_id();
        transaction.id = id;
        self.transactions.push(transaction);
        id
    }

    /// A copy of this custodian without its history.
    pub fn without_transactions(&self) -> Self {
        Self {
            id: self.id,
            assets: self.assets.clone(),
            transactions: Vec::new(),
        }
    }

    /// Check the per-custodian invariants: one asset per code and strictly
    /// increasing transaction IDs starting above zero.
    pub fn validate(&self) -> Result<(), CustodianError> {
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(&asset.code) {
                return Err(CustodianError::DuplicateAsset {
                    custodian: self.id,
                    code: asset.code.clone(),
                });
            }
        }

        let mut last = TransactionId::default();
        for t in &self.transactions {
            if t.id <= last {
                return Err(CustodianError::TransactionOrder {
                    custodian: self.id,
                    id: t.id,
                });
            }
            last = t.id;
        }
        Ok(())
    }
}
