//! Runtime settings for the simulator and the tracker client.

use std::path::PathBuf;
use std::time::Duration;

/// Settings for the custodian simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Snapshot file loaded at start-up and rewritten after every change.
    pub state_file: PathBuf,
    /// Time between automatic events. Zero disables the generator.
    pub tick_interval: Duration,
    /// RNG seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Events generated when seeding an empty store.
    pub initial_events: usize,
    /// Stop the generator after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("state.json"),
            tick_interval: Duration::from_secs(1),
            seed: None,
            initial_events: 100,
            max_ticks: None,
        }
    }
}

/// Settings for fetching custodians over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Prefix the custodian ID is appended to.
    pub custodian_url: String,
    /// Deadline for a whole batch of fetches.
    pub request_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            custodian_url: "http://localhost:9999/custodian/".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
