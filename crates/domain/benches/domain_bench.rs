use chrono::Utc;
use common::UserId;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{
    CartItem, CartView, Money, NewProduct, OrderPlacement, OrderStatus, OrderStatuses,
    PaymentEventKind, PaymentStatus, Product, reconcile,
};

fn make_product(price_cents: u32) -> Product {
    NewProduct {
        title: "Benchmark Widget".to_string(),
        description: String::new(),
        price: Money::from_cents(price_cents),
        quantity_available: 1_000,
        images: vec![],
        category: "bench".to_string(),
    }
    .into_product(UserId::new(), Utc::now())
    .unwrap()
}

fn make_cart(buyer: UserId, lines: usize) -> Vec<(CartItem, Product)> {
    (0..lines)
        .map(|i| {
            let product = make_product(100 + i as u32 * 37);
            let item = CartItem {
                buyer_id: buyer,
                product_id: product.id,
                quantity: (i % 5 + 1) as u32,
                added_at: Utc::now(),
            };
            (item, product)
        })
        .collect()
}

fn bench_order_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/order_placement");
    let buyer = UserId::new();

    for lines in [1usize, 10, 100] {
        let cart = make_cart(buyer, lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &cart, |b, cart| {
            b.iter(|| OrderPlacement::from_cart(buyer, cart, Utc::now()).unwrap());
        });
    }

    group.finish();
}

fn bench_cart_view(c: &mut Criterion) {
    let buyer = UserId::new();
    let cart = make_cart(buyer, 50);

    c.bench_function("domain/cart_view_50_lines", |b| {
        b.iter(|| CartView::build(buyer, cart.clone()).unwrap());
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let start = OrderStatuses::new(OrderStatus::Pending, PaymentStatus::Pending);

    c.bench_function("domain/reconcile_replay", |b| {
        b.iter(|| {
            let once = reconcile(start, PaymentEventKind::Succeeded).unwrap();
            reconcile(once, PaymentEventKind::Succeeded)
        });
    });
}

criterion_group!(benches, bench_order_placement, bench_cart_view, bench_reconcile);
criterion_main!(benches);
