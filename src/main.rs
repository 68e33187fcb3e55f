//! custodian-sim CLI
//!
//! Drive the custodian simulator and query it from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Seed state.json if needed, then add one event per second
//! custodian-sim run --interval-ms 1000
//!
//! # Generate 50 events at once
//! custodian-sim generate --count 50
//!
//! # Inspect the store
//! custodian-sim data
//! custodian-sim show --id 2
//! custodian-sim holdings
//! custodian-sim transactions --id 2 --type 3 --summary
//!
//! # Query a custodian service at --url (default http://localhost:9999/custodian/)
//! custodian-sim fetch --ids 1,2,3
//! custodian-sim track --user 1
//! ```

use clap::{Parser, Subcommand};
use custodian_sim::config::{SimulatorConfig, TrackerConfig};
use custodian_sim::core::classify::{filter_transactions_by_type, TransactionType};
use custodian_sim::core::custodian::{Asset, CustodianId, Transaction};
use custodian_sim::core::holdings::{aggregate_holdings, summarize_transactions};
use custodian_sim::core::user::InMemoryUserStore;
use custodian_sim::service::client::{CustodianClient, CustodianSource};
use custodian_sim::service::tracker::Tracker;
use custodian_sim::simulation::driver::{run_generator, Schedule};
use custodian_sim::simulation::seed::seed_store;
use custodian_sim::simulation::store::{LedgerStore, StoreError};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "custodian-sim", version, about = "Simulated custodial accounts for a portfolio tracker")]
struct Cli {
    /// Snapshot file holding every custodian.
    #[arg(long, global = true, default_value = "state.json")]
    state_file: PathBuf,

    /// Seed for the random generator. Drawn from OS entropy when omitted.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Events generated when seeding an empty store.
    #[arg(long, global = true, default_value_t = 100)]
    initial_events: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed if needed, then add one random event per tick
    Run {
        /// Milliseconds between events (default 1000); 0 disables generation
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many events
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Generate a batch of random events and snapshot
    Generate {
        /// Number of events, clamped to 1..=1000
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        count: i64,
    },
    /// Print every custodian as JSON
    Data {
        /// Leave out transaction histories
        #[arg(long)]
        no_transactions: bool,
    },
    /// Print one custodian as JSON
    Show {
        #[arg(long)]
        id: u32,
    },
    /// Total balance per currency
    Holdings {
        /// Comma-separated custodian IDs; all custodians when omitted
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u32>,
    },
    /// List a custodian's transactions
    Transactions {
        #[arg(long)]
        id: u32,
        /// 0 deposit, 1 withdrawal, 2 foreign transfer, 3 asset exchange
        #[arg(long = "type")]
        kind: Option<u8>,
        /// Print per-currency totals instead of the list
        #[arg(long)]
        summary: bool,
    },
    /// Fetch custodians over HTTP and print their holdings
    Fetch {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u32>,
        #[arg(long)]
        url: Option<String>,
        /// Deadline for the whole batch, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Holdings of a tracker user, fetched over HTTP
    Track {
        #[arg(long, default_value_t = 1)]
        user: u32,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

impl Cli {
    fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            state_file: self.state_file.clone(),
            seed: self.seed,
            initial_events: self.initial_events,
            ..Default::default()
        }
    }
}

fn tracker_config(url: Option<String>, timeout_secs: Option<u64>) -> TrackerConfig {
    let defaults = TrackerConfig::default();
    TrackerConfig {
        custodian_url: url.unwrap_or(defaults.custodian_url),
        request_timeout: timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
    }
}

fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn open_store(config: &SimulatorConfig, rng: &mut StdRng) -> Result<LedgerStore, StoreError> {
    let store = LedgerStore::open(&config.state_file)?;
    seed_store(&store, config.initial_events, rng)?;
    Ok(store)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_assets(assets: &[Asset]) {
    if assets.is_empty() {
        println!("No holdings.");
    }
    for asset in assets {
        println!("  {:<6} {}", asset.code.as_str(), asset.balance.to_plain_string());
    }
}

fn print_transactions(transactions: &[&Transaction]) {
    for t in transactions {
        let related = match (t.related_custodian_id(), t.related_custodian_transaction_id()) {
            (Some(c), Some(tx)) => format!("custodian {} tx {}", c, tx),
            (Some(c), None) => format!("custodian {}", c),
            _ => "external".to_string(),
        };
        println!(
            "  #{:<5} {:<3} {:<6} {:>24}  {}",
            t.id().to_string(),
            t.direction().to_string(),
            t.asset().as_str(),
            t.amount().to_plain_string(),
            related
        );
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = cli.simulator_config();
    let mut rng = new_rng(config.seed);

    match cli.command {
        Command::Run {
            interval_ms,
            max_ticks,
        } => {
            let store = open_store(&config, &mut rng)?;
            let schedule = Schedule {
                interval: interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(config.tick_interval),
                max_ticks: max_ticks.or(config.max_ticks),
            };
            let stop = AtomicBool::new(false);
            let ticks = run_generator(&store, schedule, &stop, &mut rng)?;
            info!("{} events generated", ticks);
        }
        Command::Generate { count } => {
            let store = open_store(&config, &mut rng)?;
            let generated = store.generate_events(count, &mut rng)?;
            println!("Generated {} events.", generated);
        }
        Command::Data { no_transactions } => {
            let store = open_store(&config, &mut rng)?;
            let custodians = if no_transactions {
                store.custodians_without_transactions()
            } else {
                store.custodians()
            };
            print_json(&custodians)?;
        }
        Command::Show { id } => {
            let store = open_store(&config, &mut rng)?;
            let id = CustodianId::new(id);
            let custodian = store.get_custodian(id).ok_or(StoreError::NotFound(id))?;
            print_json(&custodian)?;
        }
        Command::Holdings { ids } => {
            let store = open_store(&config, &mut rng)?;
            let custodians = if ids.is_empty() {
                store.custodians_without_transactions()
            } else {
                let ids: Vec<CustodianId> = ids.into_iter().map(CustodianId::new).collect();
                store.get_custodians(&ids)?
            };
            println!("Holdings across {} custodians:", custodians.len());
            print_assets(&aggregate_holdings(&custodians));
        }
        Command::Transactions { id, kind, summary } => {
            let store = open_store(&config, &mut rng)?;
            let id = CustodianId::new(id);
            let custodian = store.get_custodian(id).ok_or(StoreError::NotFound(id))?;
            let transactions: Vec<&Transaction> = match kind {
                Some(code) => filter_transactions_by_type(&custodian, TransactionType::try_from(code)?)?,
                None => custodian.transactions().iter().collect(),
            };
            if summary {
                println!("Totals over {} transactions:", transactions.len());
                print_assets(&summarize_transactions(transactions.iter().copied()));
            } else {
                print_transactions(&transactions);
            }
        }
        Command::Fetch {
            ids,
            url,
            timeout_secs,
        } => {
            let tracker = tracker_config(url, timeout_secs);
            let client = CustodianClient::new(tracker.custodian_url)?;
            let ids: Vec<CustodianId> = ids.into_iter().map(CustodianId::new).collect();
            let custodians = client.fetch_custodians(&ids, tracker.request_timeout)?;
            println!("Holdings across {} custodians:", custodians.len());
            print_assets(&aggregate_holdings(&custodians));
        }
        Command::Track {
            user,
            url,
            timeout_secs,
        } => {
            let config = tracker_config(url, timeout_secs);
            let users = InMemoryUserStore::new();
            users.populate()?;
            let client = CustodianClient::new(config.custodian_url)?;
            let tracker = Tracker::new(users, client, config.request_timeout);
            println!("Holdings of user {}:", user);
            print_assets(&tracker.holdings(user)?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}
