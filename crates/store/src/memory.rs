use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartItemId, OrderId, OrderStatus, ProductId, UserId};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::model::{
    Cart, CartItem, NewOrder, NewProduct, Order, OrderFilter, OrderItem, Page, Product,
};
use crate::store::{CartStore, CatalogStore, OrderStore};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Vec<CartItem>>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory store implementation.
///
/// Backs tests and local runs with the same interface as the PostgreSQL
/// store. All state lives behind a single `RwLock`, so every multi-row
/// operation (checkout, cancellation restock) executes under one write
/// guard and is all-or-nothing, mirroring the transactional contract.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn decrement(state: &mut MemoryState, product_id: ProductId, amount: u32) -> Result<Product> {
    let product = state
        .products
        .get_mut(&product_id)
        .ok_or(StoreError::ProductNotFound(product_id))?;
    if product.stock < amount {
        return Err(StoreError::InsufficientStock {
            product_id,
            requested: amount,
            available: product.stock,
        });
    }
    product.stock -= amount;
    product.updated_at = Utc::now();
    Ok(product.clone())
}

fn increment(state: &mut MemoryState, product_id: ProductId, amount: u32) -> Result<Product> {
    let product = state
        .products
        .get_mut(&product_id)
        .ok_or(StoreError::ProductNotFound(product_id))?;
    product.stock += amount;
    product.updated_at = Utc::now();
    Ok(product.clone())
}

fn cart_of(state: &MemoryState, user_id: UserId) -> Cart {
    Cart {
        user_id,
        items: state.carts.get(&user_id).cloned().unwrap_or_default(),
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let record = Product {
            id: ProductId::new(),
            name: product.name,
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn decrement_stock(&self, id: ProductId, amount: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        decrement(&mut state, id, amount)
    }

    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        increment(&mut state, id, amount)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        state.carts.entry(user_id).or_default();
        Ok(cart_of(&state, user_id))
    }

    async fn upsert_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut state = self.state.write().await;
        let items = state.carts.entry(user_id).or_default();
        if let Some(item) = items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity += quantity;
        } else {
            items.push(CartItem {
                id: CartItemId::new(),
                product_id,
                quantity,
            });
        }
        Ok(cart_of(&state, user_id))
    }

    async fn find_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Option<CartItem>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .get(&user_id)
            .and_then(|items| items.iter().find(|i| i.id == item_id))
            .cloned())
    }

    async fn set_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut state = self.state.write().await;
        let item = state
            .carts
            .get_mut(&user_id)
            .and_then(|items| items.iter_mut().find(|i| i.id == item_id))
            .ok_or(StoreError::CartItemNotFound(item_id))?;
        item.quantity = quantity;
        Ok(cart_of(&state, user_id))
    }

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        let mut state = self.state.write().await;
        let items = state
            .carts
            .get_mut(&user_id)
            .ok_or(StoreError::CartItemNotFound(item_id))?;
        let before = items.len();
        items.retain(|i| i.id != item_id);
        if items.len() == before {
            return Err(StoreError::CartItemNotFound(item_id));
        }
        Ok(cart_of(&state, user_id))
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut state = self.state.write().await;
        state.carts.insert(user_id, Vec::new());
        Ok(cart_of(&state, user_id))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        // Validate every line against current stock before mutating anything,
        // aggregating quantities per product.
        let mut needed: HashMap<ProductId, u32> = HashMap::new();
        for item in &order.items {
            *needed.entry(item.product_id).or_insert(0) += item.quantity;
        }
        for (&product_id, &amount) in &needed {
            let product = state
                .products
                .get(&product_id)
                .ok_or(StoreError::ProductNotFound(product_id))?;
            if !product.is_active || product.stock < amount {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    requested: amount,
                    available: if product.is_active { product.stock } else { 0 },
                });
            }
        }

        for (&product_id, &amount) in &needed {
            decrement(&mut state, product_id, amount)?;
        }

        if order.clear_cart {
            state.carts.insert(order.user_id, Vec::new());
        }

        let now = Utc::now();
        let record = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItem {
                    product_id: i.product_id,
                    product_name: i.product_name,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
            shipping_address: order.shipping_address,
            status: OrderStatus::Pending,
            total: order.total,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        filter: OrderFilter,
    ) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| user_id.is_none_or(|u| o.user_id == u))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(&a.id.as_uuid()))
        });

        let total = orders.len() as u64;
        let items = orders
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: filter.page,
            limit: filter.limit,
        })
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        restock: &[(ProductId, u32)],
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(&id) {
            return Err(StoreError::OrderNotFound(id));
        }
        for &(product_id, amount) in restock {
            increment(&mut state, product_id, amount)?;
        }
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::OrderNotFound(id))
    }
}
