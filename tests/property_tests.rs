use custodian_sim::core::classify::{classify, filter_transactions_by_type, TransactionType};
use custodian_sim::core::currency::{CurrencyCode, ForexTable};
use custodian_sim::core::custodian::{Asset, Custodian, CustodianId, Direction};
use custodian_sim::core::holdings::{aggregate_holdings, summarize_transactions};
use custodian_sim::simulation::event::{generate_event, GeneratedEvent};
use custodian_sim::simulation::seed::initial_custodians;
use custodian_sim::simulation::store::LedgerStore;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Seed custodians plus an ETH/EUR exchange so every forex pair shows up.
fn custodians() -> Vec<Custodian> {
    let mut custodians = initial_custodians();
    for (i, c) in custodians.iter_mut().enumerate() {
        *c = Custodian::with_id(CustodianId::new(i as u32 + 1), c.assets().to_vec());
    }
    custodians.push(Custodian::with_id(
        CustodianId::new(5),
        vec![
            Asset::new("ETH", BigDecimal::new(5_000_000_000u64.into(), 8)),
            Asset::new("EUR", BigDecimal::new(2_500_000.into(), 2)),
            Asset::new("BTC", BigDecimal::new(100_000_000.into(), 8)),
        ],
    ));
    custodians
}

/// Run `events` random events from `seed` and return the resulting state.
fn simulate(seed: u64, events: usize) -> Vec<Custodian> {
    let forex = ForexTable::standard();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut custodians = custodians();
    for _ in 0..events {
        generate_event(&mut custodians, &forex, &mut rng).unwrap();
    }
    custodians
}

fn find(custodians: &[Custodian], id: CustodianId) -> &Custodian {
    custodians.iter().find(|c| c.id() == id).unwrap()
}

proptest! {
    // ===================================================================
    // Both legs of a two-leg event point at each other.
    // ===================================================================
    #[test]
    fn two_leg_events_link_both_ways(seed in any::<u64>(), events in 1usize..150) {
        let custodians = simulate(seed, events);
        for custodian in &custodians {
            for t in custodian.transactions() {
                match (t.related_custodian_id(), t.related_custodian_transaction_id()) {
                    (Some(other_id), Some(other_tx)) => {
                        let other = find(&custodians, other_id).transaction(other_tx).unwrap();
                        prop_assert_eq!(other.related_custodian_id(), Some(custodian.id()));
                        prop_assert_eq!(other.related_custodian_transaction_id(), Some(t.id()));
                        prop_assert_ne!(other.direction(), t.direction());
                    }
                    (None, None) => {}
                    unexpected => prop_assert!(false, "half-linked transaction {:?}", unexpected),
                }
            }
        }
    }

    // ===================================================================
    // Transaction IDs are 1, 2, 3, ... on every custodian.
    // ===================================================================
    #[test]
    fn transaction_ids_strictly_increase(seed in any::<u64>(), events in 1usize..150) {
        for custodian in simulate(seed, events) {
            for (i, t) in custodian.transactions().iter().enumerate() {
                prop_assert_eq!(t.id().get() as usize, i + 1);
            }
        }
    }

    // ===================================================================
    // The credited leg is the debited amount converted at the table rate,
    // and the target balance moves by it rounded to 8 dp.
    // ===================================================================
    #[test]
    fn conversion_uses_forex_rate(seed in any::<u64>()) {
        let forex = ForexTable::standard();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut custodians = custodians();
        for _ in 0..100 {
            let before = custodians.clone();
            let event = generate_event(&mut custodians, &forex, &mut rng).unwrap();
            let GeneratedEvent::Transfer { out, into } = event else { continue };

            let out_tx = find(&custodians, out.custodian).transaction(out.transaction).unwrap().clone();
            let in_tx = find(&custodians, into.custodian).transaction(into.transaction).unwrap().clone();
            prop_assert_eq!(out_tx.direction(), Direction::Out);
            prop_assert_eq!(in_tx.direction(), Direction::In);
            prop_assert_eq!(
                in_tx.amount(),
                &forex.convert(out_tx.amount(), out_tx.asset(), in_tx.asset()).unwrap()
            );

            let balance = |set: &[Custodian], id, code: &CurrencyCode| {
                find(set, id).asset(code).unwrap().balance.clone()
            };
            let expected = (balance(&before, into.custodian, in_tx.asset()) + in_tx.amount())
                .with_scale_round(8, RoundingMode::HalfEven);
            prop_assert_eq!(balance(&custodians, into.custodian, in_tx.asset()), expected);
        }
    }

    // ===================================================================
    // Every generated transaction classifies, and the four filters
    // partition the history.
    // ===================================================================
    #[test]
    fn filters_partition_history(seed in any::<u64>(), events in 1usize..150) {
        for custodian in simulate(seed, events) {
            let mut count = 0;
            for kind in TransactionType::ALL {
                let matching = filter_transactions_by_type(&custodian, kind).unwrap();
                for t in &matching {
                    prop_assert_eq!(classify(&custodian, t).unwrap(), kind);
                }

                let mut manual: BTreeMap<CurrencyCode, BigDecimal> = BTreeMap::new();
                for t in &matching {
                    *manual.entry(t.asset().clone()).or_insert_with(BigDecimal::zero) += t.amount();
                }
                let summary: BTreeMap<CurrencyCode, BigDecimal> = summarize_transactions(matching.iter().copied())
                    .into_iter()
                    .map(|a| (a.code, a.balance))
                    .collect();
                prop_assert_eq!(summary, manual);
                count += matching.len();
            }
            prop_assert_eq!(count, custodian.transactions().len());
        }
    }

    // ===================================================================
    // Holdings are sorted by code and sum every balance.
    // ===================================================================
    #[test]
    fn holdings_sorted_and_complete(seed in any::<u64>(), events in 0usize..100) {
        let custodians = simulate(seed, events);
        let holdings = aggregate_holdings(&custodians);
        prop_assert!(holdings.windows(2).all(|w| w[0].code < w[1].code));
        for asset in &holdings {
            let total = custodians
                .iter()
                .filter_map(|c| c.asset(&asset.code))
                .fold(BigDecimal::zero(), |sum, a| sum + &a.balance);
            prop_assert_eq!(&asset.balance, &total);
        }
    }

    // ===================================================================
    // Snapshot and reload reproduce the store exactly.
    // ===================================================================
    #[test]
    fn snapshot_round_trip(seed in any::<u64>(), events in 1i64..200) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = LedgerStore::empty(&path);
        store.add_custodians(initial_custodians()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        store.generate_events(events, &mut rng).unwrap();

        let reloaded = LedgerStore::open(&path).unwrap();
        prop_assert_eq!(reloaded.custodians(), store.custodians());
    }
}

#[test]
fn forex_identity_for_every_code() {
    let forex = ForexTable::standard();
    for code in ["BTC", "GBP", "EUR", "ETH", "XYZ"] {
        let code = CurrencyCode::new(code);
        assert_eq!(forex.rate(&code, &code).unwrap(), Decimal::ONE);
    }
}
