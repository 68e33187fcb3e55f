//! Initial data for a fresh store.

use crate::core::currency::to_big_decimal;
use crate::core::custodian::{Asset, Custodian};
use crate::simulation::store::{LedgerStore, StoreError};
use log::info;
use rand::Rng;
use rust_decimal_macros::dec;

/// One BTC wallet followed by three BTC/GBP exchanges.
///
/// Every asset here has at least one counter-party, so event generation
/// over this set never runs out of candidates.
pub fn initial_custodians() -> Vec<Custodian> {
    let wallet = Custodian::new(vec![Asset::new(
        "BTC",
        to_big_decimal(dec!(10.00000001)),
    )]);
    let exchange = || {
        Custodian::new(vec![
            Asset::new("BTC", to_big_decimal(dec!(10.00000001))),
            Asset::new("GBP", to_big_decimal(dec!(100000.01))),
        ])
    };
    vec![wallet, exchange(), exchange(), exchange()]
}

/// Seed `store` if it is empty: add the initial custodians, generate
/// `events` random events and snapshot.
///
/// Returns `false` without touching the store when it already holds data.
pub fn seed_store<R: Rng>(store: &LedgerStore, events: usize, rng: &mut R) -> Result<bool, StoreError> {
    if !store.is_empty() {
        return Ok(false);
    }

    let ids = store.add_custodians(initial_custodians())?;
    for _ in 0..events {
        store.add_random_event(rng)?;
    }
    store.snapshot()?;
    info!("seeded {} custodians with {} events", ids.len(), events);
    Ok(true)
}
