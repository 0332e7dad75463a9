use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use chargeforge_core::ProductId;
use chargeforge_stock::{AdjustmentType, InMemoryStockStore, StockLedger, StockRecord};

fn bench_adjust_single_product(c: &mut Criterion) {
    c.bench_function("adjust_single_product", |b| {
        b.iter_batched(
            || {
                let ledger = StockLedger::new(Arc::new(InMemoryStockStore::new()));
                let product_id = ProductId::new();
                ledger
                    .onboard(StockRecord::limited(product_id, 1_000_000))
                    .unwrap();
                (ledger, product_id)
            },
            |(ledger, product_id)| {
                for _ in 0..1_000 {
                    ledger
                        .adjust(product_id, -1, AdjustmentType::OrderReduction, None, None)
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_adjust_across_products(c: &mut Criterion) {
    c.bench_function("adjust_across_products", |b| {
        b.iter_batched(
            || {
                let ledger = StockLedger::new(Arc::new(InMemoryStockStore::new()));
                let products: Vec<ProductId> = (0..64).map(|_| ProductId::new()).collect();
                for p in &products {
                    ledger.onboard(StockRecord::limited(*p, 1_000_000)).unwrap();
                }
                (ledger, products)
            },
            |(ledger, products)| {
                for p in &products {
                    for _ in 0..16 {
                        ledger
                            .adjust(*p, -1, AdjustmentType::OrderReduction, None, None)
                            .unwrap();
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_adjust_single_product, bench_adjust_across_products);
criterion_main!(benches);
