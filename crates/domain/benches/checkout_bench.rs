use common::{Money, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CheckoutSource, OrderLineRequest, OrderService};
use store::{CartStore, CatalogStore, MemoryStore, NewProduct, Product, ShippingAddress};

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Bench Way".to_string(),
        city: "Benchville".to_string(),
        state: "BM".to_string(),
        postal_code: "00000".to_string(),
        country: "Benchland".to_string(),
    }
}

async fn seed_products(store: &MemoryStore, count: usize) -> Vec<Product> {
    let mut products = Vec::with_capacity(count);
    for n in 0..count {
        products.push(
            store
                .insert_product(NewProduct {
                    name: format!("Product {n}"),
                    price: Money::from_cents(100 * (n as i64 + 1)),
                    stock: u32::MAX / 2,
                    is_active: true,
                })
                .await
                .unwrap(),
        );
    }
    products
}

fn bench_single_line_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let products = rt.block_on(seed_products(&store, 1));
    let service = OrderService::new(store);

    c.bench_function("checkout/single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(
                        UserId::new(),
                        CheckoutSource::Items(vec![OrderLineRequest {
                            product_id: products[0].id,
                            quantity: 1,
                            price: None,
                        }]),
                        address(),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_twenty_line_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let products = rt.block_on(seed_products(&store, 20));
    let service = OrderService::new(store);

    c.bench_function("checkout/twenty_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = products
                    .iter()
                    .map(|p| OrderLineRequest {
                        product_id: p.id,
                        quantity: 2,
                        price: None,
                    })
                    .collect();
                service
                    .create_order(UserId::new(), CheckoutSource::Items(lines), address())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_cart_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::new();
    let products = rt.block_on(seed_products(&store, 5));
    let service = OrderService::new(store.clone());

    c.bench_function("checkout/from_cart_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = UserId::new();
                for product in &products {
                    store.upsert_item(user, product.id, 1).await.unwrap();
                }
                service
                    .create_order(user, CheckoutSource::Cart, address())
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_single_line_checkout,
    bench_twenty_line_checkout,
    bench_cart_checkout,
);
criterion_main!(benches);
