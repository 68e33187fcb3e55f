//! Timer-driven event generation.

use crate::simulation::store::{LedgerStore, StoreError};
use log::{error, info};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Schedule for the periodic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between events. Zero disables generation.
    pub interval: Duration,
    /// Stop after this many ticks; `None` runs until stopped.
    pub max_ticks: Option<u64>,
}

/// Every `interval`, add one random event and snapshot the store.
///
/// Runs until `stop` is raised, `max_ticks` is reached or a tick fails. A
/// failing tick is logged and returned; the caller decides whether to go
/// on. Returns the number of completed ticks.
pub fn run_generator<R: Rng>(
    store: &LedgerStore,
    schedule: Schedule,
    stop: &AtomicBool,
    rng: &mut R,
) -> Result<u64, StoreError> {
    if schedule.interval.is_zero() {
        info!("automatic event generation disabled");
        return Ok(0);
    }

    let mut ticks = 0;
    while !stop.load(Ordering::Relaxed) {
        if schedule.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
        thread::sleep(schedule.interval);

        let tick = store
            .add_random_event(rng)
            .and_then(|_| store.snapshot());
        if let Err(err) = tick {
            error!("event tick {} failed: {}", ticks + 1, err);
            return Err(err);
        }
        ticks += 1;
    }
    info!("event generator stopped after {} ticks", ticks);
    Ok(ticks)
}
