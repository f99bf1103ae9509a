use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use std::sync::Arc;
use teashop_core::{City, OrderId, ProductId};
use teashop_geofence::{EligibilityPolicy, LatLng, LocationInput};
use teashop_infra::ledger::{InMemoryInventoryLedger, InventoryLedger};
use teashop_inventory::StockBook;

/// Deduct + compensate on the pure book (no lock, no async).
fn bench_stock_book(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock_book");
    group.throughput(Throughput::Elements(1));

    group.bench_function("deduct_then_compensate", |b| {
        let product = ProductId::new();
        let mut book = StockBook::new();
        book.restock(product, City::Riyadh, 1_000_000, Utc::now())
            .expect("restock");

        b.iter(|| {
            let order = OrderId::generate(Utc::now());
            let now = Utc::now();
            book.deduct(product, City::Riyadh, 3, &order, now).expect("deduct");
            black_box(
                book.compensate(product, City::Riyadh, 3, &order, now)
                    .expect("compensate"),
            );
        });
    });

    group.finish();
}

/// Contended deductions through the async ledger on a multi-threaded runtime.
fn bench_contended_deducts(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("ledger_contention");
    for tasks in [1usize, 8, 32] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                rt.block_on(async {
                    let ledger = Arc::new(InMemoryInventoryLedger::new());
                    let product = ProductId::new();
                    ledger
                        .restock(product, City::Jeddah, tasks as u32)
                        .await
                        .expect("restock");

                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let ledger = ledger.clone();
                            tokio::spawn(async move {
                                let order = OrderId::generate(Utc::now());
                                ledger.deduct(product, City::Jeddah, 1, &order).await
                            })
                        })
                        .collect();
                    for h in handles {
                        black_box(h.await.expect("join").expect("deduct"));
                    }
                })
            });
        });
    }
    group.finish();
}

fn bench_eligibility(c: &mut Criterion) {
    let policy = EligibilityPolicy::default();
    let input = LocationInput {
        coordinates: Some(LatLng::new(24.7136, 46.6753).expect("coords")),
        declared_city: None,
    };
    c.bench_function("eligibility_evaluate", |b| {
        b.iter(|| black_box(policy.evaluate(black_box(&input), black_box(4))))
    });
}

criterion_group!(benches, bench_stock_book, bench_contended_deducts, bench_eligibility);
criterion_main!(benches);
