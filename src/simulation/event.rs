//! Synthetic event generation.
//!
//! An event is either a two-leg movement (a transfer between custodians
//! holding the same code, or an exchange between two codes of one
//! custodian) or a single external deposit/withdrawal.
//!
//! Generation is split in two phases. Planning reads the custodians, draws
//! the random choices and computes every amount and resulting balance,
//! including forex conversion. Committing only writes. Any failure
//! therefore happens before a single balance or transaction is touched.

use crate::core::classify::TransactionType;
use crate::core::currency::{CurrencyCode, ForexTable, FxError};
use crate::core::custodian::{Custodian, CustodianId, Direction, Transaction, TransactionId};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode};
use log::debug;
use rand::Rng;
use thiserror::Error;

/// Percent chance that an event has a counter-party leg.
pub const TWO_LEG_PERCENT: u32 = 60;
/// Amounts are drawn as `0..MAX_PERCENT_EXCLUSIVE` percent of the balance.
pub const MAX_PERCENT_EXCLUSIVE: u32 = 20;
/// Deposits are this many times the drawn amount; withdrawals are 1x.
pub const DEPOSIT_MULTIPLIER: u32 = 4;
/// Fractional digits kept on balances.
pub const BALANCE_SCALE: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("no custodian holds any asset")]
    NoSource,
    #[error("no counter-party for {code} held by custodian {custodian}")]
    NoCounterparty {
        custodian: CustodianId,
        code: CurrencyCode,
    },
    #[error("forex error: {0}")]
    Fx(#[from] FxError),
}

/// One committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegRef {
    pub custodian: CustodianId,
    pub transaction: TransactionId,
}

/// What a call to [`generate_event`] recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedEvent {
    Transfer { out: LegRef, into: LegRef },
    Deposit(LegRef),
    Withdrawal(LegRef),
}

impl GeneratedEvent {
    /// How the (first) recorded transaction classifies.
    pub fn kind(&self) -> TransactionType {
        match self {
            GeneratedEvent::Transfer { out, into } if out.custodian == into.custodian => {
                TransactionType::InternalAssetExchange
            }
            GeneratedEvent::Transfer { .. } => TransactionType::ForeignTransfer,
            GeneratedEvent::Deposit(_) => TransactionType::ExternalDeposit,
            GeneratedEvent::Withdrawal(_) => TransactionType::ExternalWithdrawal,
        }
    }
}

/// Position of an asset inside a custodian slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AssetRef {
    pub custodian: usize,
    pub asset: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct PlannedLeg {
    at: AssetRef,
    code: CurrencyCode,
    amount: BigDecimal,
    balance_after: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
enum Plan {
    Transfer { out: PlannedLeg, into: PlannedLeg },
    External { leg: PlannedLeg, direction: Direction },
}

/// Generate and record one random event.
pub fn generate_event<R: Rng>(
    custodians: &mut [Custodian],
    forex: &ForexTable,
    rng: &mut R,
) -> Result<GeneratedEvent, EventError> {
    let plan = plan_event(custodians, forex, rng)?;
    Ok(commit(custodians, plan))
}

fn plan_event<R: Rng>(
    custodians: &[Custodian],
    forex: &ForexTable,
    rng: &mut R,
) -> Result<Plan, EventError> {
    let holders: Vec<usize> = custodians
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.assets().is_empty())
        .map(|(idx, _)| idx)
        .collect();
    if holders.is_empty() {
        return Err(EventError::NoSource);
    }
    let custodian = holders[rng.gen_range(0..holders.len())];
    let asset = rng.gen_range(0..custodians[custodian].assets().len());
    let source = AssetRef { custodian, asset };

    if rng.gen_range(0..100) < TWO_LEG_PERCENT {
        let candidates = counterparty_candidates(custodians, source);
        if candidates.is_empty() {
            let c = &custodians[custodian];
            return Err(EventError::NoCounterparty {
                custodian: c.id(),
                code: c.assets()[asset].code.clone(),
            });
        }
        let target = candidates[rng.gen_range(0..candidates.len())];
        let percent = rng.gen_range(0..MAX_PERCENT_EXCLUSIVE);
        return plan_transfer(custodians, forex, source, target, percent);
    }

    let percent = rng.gen_range(0..MAX_PERCENT_EXCLUSIVE);
    let withdraw = rng.gen_range(0..10) < 5;
    Ok(plan_external(custodians, source, percent, withdraw))
}

/// Every asset that may receive the other leg of an event sourced at
/// `source`: a different code on the same custodian, or the same code on a
/// different custodian.
pub(crate) fn counterparty_candidates(custodians: &[Custodian], source: AssetRef) -> Vec<AssetRef> {
    let code = &custodians[source.custodian].assets()[source.asset].code;
    let mut candidates = Vec::new();
    for (c_idx, custodian) in custodians.iter().enumerate() {
        let same_custodian = c_idx == source.custodian;
        for (a_idx, asset) in custodian.assets().iter().enumerate() {
            if same_custodian != (&asset.code == code) {
                candidates.push(AssetRef {
                    custodian: c_idx,
                    asset: a_idx,
                });
            }
        }
    }
    candidates
}

/// `percent` percent of the balance at `at`, unrounded.
fn drawn_amount(custodian: &Custodian, at: AssetRef, percent: u32) -> BigDecimal {
    &custodian.assets()[at.asset].balance * &BigDecimal::new(BigInt::from(percent), 2)
}

fn round_balance(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(BALANCE_SCALE, RoundingMode::HalfEven)
}

fn plan_transfer(
    custodians: &[Custodian],
    forex: &ForexTable,
    source: AssetRef,
    target: AssetRef,
    percent: u32,
) -> Result<Plan, EventError> {
    let from = &custodians[source.custodian];
    let to = &custodians[target.custodian];
    let from_asset = &from.assets()[source.asset];
    let to_asset = &to.assets()[target.asset];

    let out_amount = drawn_amount(from, source, percent);
    let in_amount = if from_asset.code == to_asset.code {
        out_amount.clone()
    } else {
        forex.convert(&out_amount, &from_asset.code, &to_asset.code)?
    };

    Ok(Plan::Transfer {
        out: PlannedLeg {
            at: source,
            code: from_asset.code.clone(),
            balance_after: round_balance(&from_asset.balance - &out_amount),
            amount: out_amount,
        },
        into: PlannedLeg {
            at: target,
            code: to_asset.code.clone(),
            balance_after: round_balance(&to_asset.balance + &in_amount),
            amount: in_amount,
        },
    })
}

fn plan_external(custodians: &[Custodian], source: AssetRef, percent: u32, withdraw: bool) -> Plan {
    let custodian = &custodians[source.custodian];
    let asset = &custodian.assets()[source.asset];
    let base = drawn_amount(custodian, source, percent);

    let (direction, amount, after) = if withdraw {
        let after = &asset.balance - &base;
        (Direction::Out, base, after)
    } else {
        let amount = &base * &BigDecimal::from(DEPOSIT_MULTIPLIER);
        let after = &asset.balance + &amount;
        (Direction::In, amount, after)
    };

    Plan::External {
        leg: PlannedLeg {
            at: source,
            code: asset.code.clone(),
            amount,
            balance_after: round_balance(after),
        },
        direction,
    }
}

fn commit(custodians: &mut [Custodian], plan: Plan) -> GeneratedEvent {
    match plan {
        Plan::Transfer { out, into } => {
            let out_custodian = custodians[out.at.custodian].id();
            let in_custodian = custodians[into.at.custodian].id();
            let out_id = custodians[out.at.custodian].next_transaction_id();
            let in_id = if out.at.custodian == into.at.custodian {
                out_id.next()
            } else {
                custodians[into.at.custodian].next_transaction_id()
            };
            debug!(
                "transfer {}#{} -> {}#{}: {} out, {} in",
                out_custodian, out_id, in_custodian, in_id, out.amount, into.amount
            );

            let source = &mut custodians[out.at.custodian];
            source.add_transaction(
                Transaction::new(out.code, out.amount, Direction::Out)
                    .with_related(in_custodian, in_id),
            );
            source.assets_mut()[out.at.asset].balance = out.balance_after;

            let target = &mut custodians[into.at.custodian];
            target.add_transaction(
                Transaction::new(into.code, into.amount, Direction::In)
                    .with_related(out_custodian, out_id),
            );
            target.assets_mut()[into.at.asset].balance = into.balance_after;

            GeneratedEvent::Transfer {
                out: LegRef {
                    custodian: out_custodian,
                    transaction: out_id,
                },
                into: LegRef {
                    custodian: in_custodian,
                    transaction: in_id,
                },
            }
        }
        Plan::External { leg, direction } => {
            let custodian = &mut custodians[leg.at.custodian];
            debug!(
                "external {} {}#{}: {}",
                direction,
                custodian.id(),
                custodian.next_transaction_id(),
                leg.amount
            );
            let id = custodian.add_transaction(Transaction::new(leg.code, leg.amount, direction));
            custodian.assets_mut()[leg.at.asset].balance = leg.balance_after;

            let at = LegRef {
                custodian: custodian.id(),
                transaction: id,
            };
            match direction {
                Direction::In => GeneratedEvent::Deposit(at),
                Direction::Out => GeneratedEvent::Withdrawal(at),
            }
        }
    }
}
