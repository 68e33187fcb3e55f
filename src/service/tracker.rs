//! Portfolio-tracker queries on top of a custodian source.

use crate::core::classify::{self, AssetExchange, ClassificationError, TransactionType};
use crate::core::custodian::{Asset, Custodian, CustodianId, Transaction};
use crate::core::holdings::{aggregate_holdings, summarize_transactions};
use crate::core::user::{User, UserError, UserStore};
use crate::service::client::{CustodianSource, FetchError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("user {user} has no access to custodian {custodian}")]
    Unauthorized { user: u32, custodian: CustodianId },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

/// Answers a user's questions about the custodians they own.
///
/// Every query re-fetches from `source`; nothing is cached.
pub struct Tracker<U, S> {
    users: U,
    source: S,
    deadline: Duration,
}

impl<U: UserStore, S: CustodianSource> Tracker<U, S> {
    pub fn new(users: U, source: S, deadline: Duration) -> Self {
        Self {
            users,
            source,
            deadline,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn user(&self, id: u32) -> Result<User, TrackerError> {
        Ok(self.users.get_user(id)?)
    }

    /// Total balance per currency across all of the user's custodians.
    pub fn holdings(&self, user: u32) -> Result<Vec<Asset>, TrackerError> {
        let user = self.user(user)?;
        let custodians = self
            .source
            .fetch_custodians(&user.custodians, self.deadline)?;
        Ok(aggregate_holdings(&custodians))
    }

    /// The custodian's transactions, optionally restricted to one type.
    pub fn transactions(
        &self,
        user: u32,
        custodian: CustodianId,
        kind: Option<TransactionType>,
    ) -> Result<Vec<Transaction>, TrackerError> {
        let custodian = self.accessible_custodian(user, custodian)?;
        let transactions = match kind {
            Some(kind) => classify::filter_transactions_by_type(&custodian, kind)?
                .into_iter()
                .cloned()
                .collect(),
            None => custodian.transactions().to_vec(),
        };
        Ok(transactions)
    }

    /// Like [`Tracker::transactions`], summed per currency.
    pub fn transaction_summary(
        &self,
        user: u32,
        custodian: CustodianId,
        kind: Option<TransactionType>,
    ) -> Result<Vec<Asset>, TrackerError> {
        let transactions = self.transactions(user, custodian, kind)?;
        Ok(summarize_transactions(&transactions))
    }

    pub fn asset_exchanges(
        &self,
        user: u32,
        custodian: CustodianId,
    ) -> Result<Vec<AssetExchange>, TrackerError> {
        let custodian = self.accessible_custodian(user, custodian)?;
        Ok(classify::asset_exchanges(&custodian)?)
    }

    fn accessible_custodian(&self, user: u32, id: CustodianId) -> Result<Custodian, TrackerError> {
        let user = self.user(user)?;
        if !user.can_access(id) {
            return Err(TrackerError::Unauthorized {
                user: user.id,
                custodian: id,
            });
        }
        let mut fetched = self.source.fetch_custodians(&[id], self.deadline)?;
        fetched.pop().ok_or(TrackerError::Fetch(FetchError::NotFound(id)))
    }
}
