use chrono::Utc;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use storefront_cart::{
    CartItem, ListingStatus, PricingPolicy, ServiceFee, SupplierListing, SupplierSnapshot,
    calculate, validate,
};
use storefront_core::{BasisPoints, CartId, CartItemId, ListingId, ProductId, SupplierId};

fn cart_items(lines: u64) -> Vec<CartItem> {
    let now = Utc::now();
    (1..=lines)
        .map(|n| CartItem {
            id: CartItemId::new(n),
            cart_id: CartId::new(1),
            product_id: ProductId::new(n),
            product_name: format!("bouquet-{n}"),
            quantity: 12,
            unit_price_snapshot: 100_000,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Every product gets `suppliers` small listings so most lines must split.
fn listings(lines: u64, suppliers: u64) -> SupplierSnapshot {
    (1..=lines)
        .flat_map(|product| {
            (1..=suppliers).map(move |supplier| SupplierListing {
                listing_id: ListingId::new(product * 1_000 + supplier),
                supplier_id: SupplierId::new(supplier),
                product_id: ProductId::new(product),
                available_quantity: 5,
                unit_price: 80_000 + supplier * 1_000,
                min_order_qty: 1,
                status: ListingStatus::Active,
            })
        })
        .collect()
}

fn bench_pricing(c: &mut Criterion) {
    let policy = PricingPolicy {
        service_fee: ServiceFee::Percentage(BasisPoints::new(250)),
    };
    let mut group = c.benchmark_group("cart_pricing");

    for lines in [1u64, 10, 100] {
        let items = cart_items(lines);
        let snapshot = listings(lines, 8);

        group.bench_with_input(BenchmarkId::new("calculate", lines), &lines, |b, _| {
            b.iter(|| calculate(black_box(&items), black_box(&snapshot), &policy))
        });
        group.bench_with_input(BenchmarkId::new("validate", lines), &lines, |b, _| {
            b.iter(|| validate(black_box(&items), black_box(&snapshot)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pricing);
criterion_main!(benches);
