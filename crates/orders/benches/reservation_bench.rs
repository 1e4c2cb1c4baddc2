use common::UserId;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::LineRequest;
use orders::{EditOrder, NoopNotifier, OrderService, PlaceOrder};
use store::{InMemoryStore, ProductRecord};

async fn seeded_service(lines: usize) -> OrderService<InMemoryStore, NoopNotifier> {
    let store = InMemoryStore::new();
    let mut product = ProductRecord::new("bench", "Benchmark Tee", 1999);
    for size in 0..lines {
        product = product.with_variant(format!("S{}", size), "black", u32::MAX / 2);
    }
    store.insert_product(product).await;
    OrderService::new(store, NoopNotifier)
}

fn request(lines: usize) -> Vec<LineRequest> {
    (0..lines)
        .map(|size| LineRequest::new("bench", format!("S{}", size), "black", 1))
        .collect()
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("orders/place_order");

    for lines in [1, 5, 20] {
        let service = rt.block_on(seeded_service(lines));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter(|| {
                rt.block_on(async {
                    service
                        .place_order(UserId::new(), PlaceOrder::new(request(lines)))
                        .await
                        .unwrap();
                });
            });
        });
    }

    group.finish();
}

fn bench_edit_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = rt.block_on(seeded_service(5));

    c.bench_function("orders/edit_then_cancel", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = service
                    .place_order(UserId::new(), PlaceOrder::new(request(3)))
                    .await
                    .unwrap();
                service
                    .edit_order(EditOrder::new(order.id()).with_items(request(5)))
                    .await
                    .unwrap();
                service.cancel_order(order.id()).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_place_order, bench_edit_and_cancel);
criterion_main!(benches);
