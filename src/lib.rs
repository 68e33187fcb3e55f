//! # custodian-sim
//!
//! Simulated multi-currency custodial accounts for exercising a portfolio
//! tracker.
//!
//! A set of custodians (wallets and exchanges) holds assets in several
//! currencies. Random double-entry events move value between them, with
//! cross-currency legs converted through a fixed forex table. Every
//! transaction can be classified as a deposit, withdrawal, foreign transfer
//! or internal asset exchange.
//!
//! ## Architecture
//!
//! - **core**: currencies and forex, custodians and transactions,
//!   classification, holdings aggregation, users
//! - **simulation**: event generation, the shared ledger store with JSON
//!   snapshots, seed data and the periodic generator
//! - **service**: fetching custodians over HTTP and tracker queries
//! - **config**: runtime defaults

pub mod config;
pub mod core;
pub mod service;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::classify::{classify, filter_transactions_by_type, TransactionType};
    pub use crate::core::currency::{CurrencyCode, ForexTable};
    pub use crate::core::custodian::{Asset, Custodian, CustodianId, Direction, Transaction, TransactionId};
    pub use crate::core::holdings::{aggregate_holdings, summarize_transactions};
    pub use crate::service::client::{CustodianClient, CustodianSource};
    pub use crate::simulation::store::LedgerStore;
}
