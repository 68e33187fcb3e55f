use crate::core::currency::CurrencyCode;
use crate::core::custodian::{Custodian, CustodianId, Direction, Transaction, TransactionId};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The four kinds of transaction a custodian can hold.
///
/// The numeric codes are what query strings use (`type=0..3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TransactionType {
    ExternalDeposit = 0,
    ExternalWithdrawal = 1,
    ForeignTransfer = 2,
    InternalAssetExchange = 3,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::ExternalDeposit,
        TransactionType::ExternalWithdrawal,
        TransactionType::ForeignTransfer,
        TransactionType::InternalAssetExchange,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = ClassificationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TransactionType::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(ClassificationError::UnknownType(code))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::ExternalDeposit => "external deposit",
            TransactionType::ExternalWithdrawal => "external withdrawal",
            TransactionType::ForeignTransfer => "foreign transfer",
            TransactionType::InternalAssetExchange => "internal asset exchange",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("transaction {transaction} on custodian {custodian} matches no transaction type")]
    Invalid {
        custodian: CustodianId,
        transaction: TransactionId,
    },
    #[error("exchange leg {transaction} on custodian {custodian} has no paired leg")]
    UnpairedExchange {
        custodian: CustodianId,
        transaction: TransactionId,
    },
    #[error("unknown transaction type {0}, expected 0-3")]
    UnknownType(u8),
}

/// Classify one of `custodian`'s transactions.
///
/// | related custodian | related transaction | result |
/// |---|---|---|
/// | absent | absent | deposit (`IN`) / withdrawal (`OUT`) |
/// | other custodian | any | foreign transfer |
/// | this custodian | any | internal asset exchange |
///
/// A related transaction without a related custodian is rejected.
pub fn classify(
    custodian: &Custodian,
    transaction: &Transaction,
) -> Result<TransactionType, ClassificationError> {
    match (
        transaction.related_custodian_id(),
        transaction.related_custodian_transaction_id(),
    ) {
        (None, None) => Ok(match transaction.direction() {
            Direction::In => TransactionType::ExternalDeposit,
            Direction::Out => TransactionType::ExternalWithdrawal,
        }),
        (Some(related), _) if related != custodian.id() => Ok(TransactionType::ForeignTransfer),
        (Some(_), _) => Ok(TransactionType::InternalAssetExchange),
        (None, Some(_)) => Err(ClassificationError::Invalid {
            custodian: custodian.id(),
            transaction: transaction.id(),
        }),
    }
}

/// All of `custodian`'s transactions of type `kind`, in their original order.
pub fn filter_transactions_by_type(
    custodian: &Custodian,
    kind: TransactionType,
) -> Result<Vec<&Transaction>, ClassificationError> {
    let mut matching = Vec::new();
    for t in custodian.transactions() {
        if classify(custodian, t)? == kind {
            matching.push(t);
        }
    }
    Ok(matching)
}

/// One side of an asset exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeLeg {
    pub transaction: TransactionId,
    pub code: CurrencyCode,
    #[serde(with = "crate::core::custodian::plain_decimal")]
    pub amount: BigDecimal,
}

impl ExchangeLeg {
    fn from_transaction(t: &Transaction) -> Self {
        Self {
            transaction: t.id(),
            code: t.asset().clone(),
            amount: t.amount().clone(),
        }
    }
}

/// A reconstructed internal exchange: what left one asset and what arrived
/// in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExchange {
    pub from: ExchangeLeg,
    pub to: ExchangeLeg,
}

/// Pair up the legs of every internal asset exchange on `custodian`.
///
/// Exchanges are listed in the order of their `OUT` legs.
pub fn asset_exchanges(custodian: &Custodian) -> Result<Vec<AssetExchange>, ClassificationError> {
    let by_id: HashMap<TransactionId, &Transaction> = custodian
        .transactions()
        .iter()
        .map(|t| (t.id(), t))
        .collect();

    let mut exchanges = Vec::new();
    for out in filter_transactions_by_type(custodian, TransactionType::InternalAssetExchange)? {
        if out.direction() != Direction::Out {
            continue;
        }
        let paired = out
            .related_custodian_transaction_id()
            .and_then(|id| by_id.get(&id))
            .filter(|t| t.direction() == Direction::In)
            .ok_or(ClassificationError::UnpairedExchange {
                custodian: custodian.id(),
                transaction: out.id(),
            })?;
        exchanges.push(AssetExchange {
            from: ExchangeLeg::from_transaction(out),
            to: ExchangeLeg::from_transaction(paired),
        });
    }
    Ok(exchanges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::custodian::Asset;

    fn big(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    fn custodian(id: u32) -> Custodian {
        Custodian::with_id(
            CustodianId::new(id),
            vec![Asset::new("BTC", big("10")), Asset::new("GBP", big("1000"))],
        )
    }

    #[test]
    fn test_external_deposit_and_withdrawal() {
        let c = custodian(1);
        let deposit = Transaction::new("BTC", big("1"), Direction::In);
        let withdrawal = Transaction::new("BTC", big("1"), Direction::Out);
        assert_eq!(classify(&c, &deposit).unwrap(), TransactionType::ExternalDeposit);
        assert_eq!(
            classify(&c, &withdrawal).unwrap(),
            TransactionType::ExternalWithdrawal
        );
    }

    #[test]
    fn test_foreign_transfer() {
        let c = custodian(1);
        let t = Transaction::new("BTC", big("1"), Direction::Out)
            .with_related(CustodianId::new(2), TransactionId::new(4));
        assert_eq!(classify(&c, &t).unwrap(), TransactionType::ForeignTransfer);
    }

    #[test]
    fn test_internal_exchange() {
        let c = custodian(1);
        let t = Transaction::new("GBP", big("1"), Direction::In)
            .with_related(CustodianId::new(1), TransactionId::new(1));
        assert_eq!(classify(&c, &t).unwrap(), TransactionType::InternalAssetExchange);
    }

    #[test]
    fn test_related_custodian_alone_classifies_by_custodian() {
        let c = custodian(1);
        let foreign = Transaction::new("BTC", big("1"), Direction::In)
            .with_related_custodian(CustodianId::new(2));
        let internal = Transaction::new("GBP", big("1"), Direction::Out)
            .with_related_custodian(CustodianId::new(1));
        assert_eq!(classify(&c, &foreign).unwrap(), TransactionType::ForeignTransfer);
        assert_eq!(
            classify(&c, &internal).unwrap(),
            TransactionType::InternalAssetExchange
        );
    }

    #[test]
    fn test_orphan_related_transaction_is_invalid() {
        let mut owner = custodian(5);
        let id = owner.add_transaction(
            Transaction::new("BTC", big("1"), Direction::In)
                .with_related_transaction(TransactionId::new(3)),
        );
        let t = owner.transaction(id).unwrap();
        assert_eq!(
            classify(&owner, t),
            Err(ClassificationError::Invalid {
                custodian: CustodianId::new(5),
                transaction: TransactionId::new(1),
            })
        );
        assert!(filter_transactions_by_type(&owner, TransactionType::ExternalDeposit).is_err());
    }

    #[test]
    fn test_filter_preserves_order() {
        let mut c = custodian(1);
        c.add_transaction(Transaction::new("BTC", big("1"), Direction::In));
        c.add_transaction(Transaction::new("BTC", big("2"), Direction::Out));
        c.add_transaction(Transaction::new("GBP", big("3"), Direction::In));

        let deposits = filter_transactions_by_type(&c, TransactionType::ExternalDeposit).unwrap();
        let ids: Vec<u32> = deposits.iter().map(|t| t.id().get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_asset_exchange_pairing() {
        let mut c = custodian(1);
        let me = c.id();
        c.add_transaction(
            Transaction::new("BTC", big("0.5"), Direction::Out)
                .with_related(me, TransactionId::new(2)),
        );
        c.add_transaction(
            Transaction::new("GBP", big("20000"), Direction::In)
                .with_related(me, TransactionId::new(1)),
        );
        c.add_transaction(Transaction::new("BTC", big("1"), Direction::In));
        c.add_transaction(
            Transaction::new("GBP", big("4000"), Direction::In)
                .with_related(me, TransactionId::new(5)),
        );
        c.add_transaction(
            Transaction::new("BTC", big("0.1"), Direction::Out)
                .with_related(me, TransactionId::new(4)),
        );

        let exchanges = asset_exchanges(&c).unwrap();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].from.code.as_str(), "BTC");
        assert_eq!(exchanges[0].to.amount, big("20000"));
        assert_eq!(exchanges[1].from.transaction, TransactionId::new(5));
        assert_eq!(exchanges[1].to.transaction, TransactionId::new(4));
    }

    #[test]
    fn test_unpaired_exchange() {
        let mut c = custodian(1);
        let me = c.id();
        c.add_transaction(
            Transaction::new("BTC", big("0.5"), Direction::Out)
                .with_related(me, TransactionId::new(9)),
        );
        assert_eq!(
            asset_exchanges(&c),
            Err(ClassificationError::UnpairedExchange {
                custodian: me,
                transaction: TransactionId::new(1),
            })
        );
    }

    #[test]
    fn test_type_codes() {
        for kind in TransactionType::ALL {
            assert_eq!(TransactionType::try_from(kind.code()).unwrap(), kind);
        }
        assert_eq!(
            TransactionType::try_from(4),
            Err(ClassificationError::UnknownType(4))
        );
    }
}
