use criterion::{black_box, criterion_group, criterion_main, Criterion};
use custodian_sim::core::classify::{filter_transactions_by_type, TransactionType};
use custodian_sim::core::currency::ForexTable;
use custodian_sim::core::holdings::{aggregate_holdings, summarize_transactions};
use custodian_sim::simulation::event::generate_event;
use custodian_sim::simulation::seed::initial_custodians;
use custodian_sim::simulation::store::LedgerStore;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_generate_event(c: &mut Criterion) {
    let forex = ForexTable::standard();
    let store = LedgerStore::empty("unused.json");
    store.add_custodians(initial_custodians()).unwrap();
    let mut custodians = store.custodians();
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("generate_event", |b| {
        b.iter(|| generate_event(black_box(&mut custodians), &forex, &mut rng))
    });
}

fn bench_store_event(c: &mut Criterion) {
    let store = LedgerStore::empty("unused.json");
    store.add_custodians(initial_custodians()).unwrap();
    let mut rng = StdRng::seed_from_u64(2);

    c.bench_function("store_add_random_event", |b| {
        b.iter(|| store.add_random_event(&mut rng))
    });
}

fn bench_filter_and_summarize(c: &mut Criterion) {
    let store = LedgerStore::empty("unused.json");
    store.add_custodians(initial_custodians()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10_000 {
        store.add_random_event(&mut rng).unwrap();
    }
    let custodians = store.custodians();

    c.bench_function("filter_summarize_10k", |b| {
        b.iter(|| {
            for custodian in &custodians {
                if let Ok(matching) =
                    filter_transactions_by_type(custodian, TransactionType::ForeignTransfer)
                {
                    black_box(summarize_transactions(matching));
                }
            }
        })
    });

    c.bench_function("aggregate_holdings", |b| {
        b.iter(|| aggregate_holdings(black_box(&custodians)))
    });
}

criterion_group!(
    benches,
    bench_generate_event,
    bench_store_event,
    bench_filter_and_summarize
);
criterion_main!(benches);
