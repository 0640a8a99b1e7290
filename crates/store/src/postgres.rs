use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartItemId, Money, OrderId, OrderStatus, ProductId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{
    Cart, CartItem, NewOrder, NewProduct, Order, OrderFilter, OrderItem, Page, Product,
    ShippingAddress,
};
use crate::store::{CartStore, CatalogStore, OrderStore};

/// PostgreSQL-backed store implementation.
///
/// Stock decrements are conditional `WHERE stock >= $n` updates executed
/// inside the same transaction as the order rows, so two checkouts racing
/// for the last units cannot both succeed.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn load_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity
            FROM cart_items ci
            JOIN carts c ON ci.cart_id = c.id
            WHERE c.user_id = $1
            ORDER BY ci.id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_cart_item).collect()
    }

    async fn load_cart(&self, user_id: UserId) -> Result<Cart> {
        Ok(Cart {
            user_id,
            items: self.load_cart_items(user_id).await?,
        })
    }

    async fn load_order_items(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY product_name
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            by_order.entry(order_id).or_default().push(OrderItem {
                product_id: ProductId::from_uuid(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                quantity: column_u32(row, "quantity")?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            });
        }
        Ok(by_order)
    }

    /// Decrements stock for one product inside `tx`, re-checking the counter
    /// at write time. Zero affected rows means the product is missing,
    /// inactive, or short on stock; the caller's transaction is abandoned.
    async fn decrement_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        amount: u32,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = $3
            WHERE id = $1 AND is_active AND stock >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(amount))
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let row = sqlx::query("SELECT stock, is_active FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
            return match row {
                Some(row) => {
                    let is_active: bool = row.try_get("is_active")?;
                    let available = if is_active { column_u32(&row, "stock")? } else { 0 };
                    Err(StoreError::InsufficientStock {
                        product_id,
                        requested: amount,
                        available,
                    })
                }
                None => Err(StoreError::ProductNotFound(product_id)),
            };
        }
        Ok(())
    }

    async fn ensure_cart(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn column_u32(row: &PgRow, index: &str) -> Result<u32> {
    let value: i64 = row.try_get(index)?;
    u32::try_from(value).map_err(|e| {
        StoreError::Database(sqlx::Error::ColumnDecode {
            index: index.to_string(),
            source: Box::new(e),
        })
    })
}

fn column_status(row: &PgRow) -> Result<OrderStatus> {
    let value: String = row.try_get("status")?;
    value.parse().map_err(|e| {
        StoreError::Database(sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: column_u32(row, "stock")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: column_u32(row, "quantity")?,
    })
}

fn row_to_order_header(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        items: Vec::new(),
        shipping_address: ShippingAddress {
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            postal_code: row.try_get("postal_code")?,
            country: row.try_get("country")?,
        },
        status: column_status(row)?,
        total: Money::from_cents(row.try_get("total_cents")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

const ORDER_COLUMNS: &str =
    "id, user_id, status, total_cents, street, city, state, postal_code, country, created_at, updated_at";

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, name, price_cents, stock, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(product.is_active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint().is_some()
            {
                return StoreError::Duplicate {
                    entity: "product",
                    detail: db_err.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        row_to_product(&row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, is_active, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn decrement_stock(&self, id: ProductId, amount: u32) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        Self::decrement_in_tx(&mut tx, id, amount).await?;
        tx.commit().await?;

        self.get_product(id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))
    }

    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = $3
            WHERE id = $1
            RETURNING id, name, price_cents, stock, is_active, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(amount))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(StoreError::ProductNotFound(id)),
        }
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_cart(&mut tx, user_id).await?;
        tx.commit().await?;

        self.load_cart(user_id).await
    }

    async fn upsert_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_cart(&mut tx, user_id).await?;

        // Additive single-statement upsert; concurrent adds of the same
        // product sum instead of overwriting each other.
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            SELECT $2, c.id, $3, $4 FROM carts c WHERE c.user_id = $1
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Uuid::new_v4())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load_cart(user_id).await
    }

    async fn find_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity
            FROM cart_items ci
            JOIN carts c ON ci.cart_id = c.id
            WHERE c.user_id = $1 AND ci.id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn set_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = $3
            FROM carts
            WHERE cart_items.id = $2
              AND cart_items.cart_id = carts.id
              AND carts.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(item_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartItemNotFound(item_id));
        }
        self.load_cart(user_id).await
    }

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            USING carts
            WHERE cart_items.id = $2
              AND cart_items.cart_id = carts.id
              AND carts.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(item_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartItemNotFound(item_id));
        }
        self.load_cart(user_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_cart(&mut tx, user_id).await?;
        sqlx::query(
            r#"
            DELETE FROM cart_items
            USING carts
            WHERE cart_items.cart_id = carts.id AND carts.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Cart {
            user_id,
            items: Vec::new(),
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Aggregate per-product quantities, then decrement in a stable order
        // so two concurrent checkouts over the same products cannot deadlock.
        let mut needed: HashMap<ProductId, u32> = HashMap::new();
        for item in &order.items {
            *needed.entry(item.product_id).or_insert(0) += item.quantity;
        }
        let mut decrements: Vec<_> = needed.into_iter().collect();
        decrements.sort_by_key(|(id, _)| id.as_uuid());

        for (product_id, amount) in decrements {
            Self::decrement_in_tx(&mut tx, product_id, amount).await?;
        }

        let order_id = OrderId::new();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, status, total_cents,
                 street, city, state, postal_code, country,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total.cents())
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        if order.clear_cart {
            sqlx::query(
                r#"
                DELETE FROM cart_items
                USING carts
                WHERE cart_items.cart_id = carts.id AND carts.user_id = $1
                "#,
            )
            .bind(order.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
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
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = row_to_order_header(&row)?;
        let mut items = self.load_order_items(&[order.id.as_uuid()]).await?;
        order.items = items.remove(&order.id.as_uuid()).unwrap_or_default();
        Ok(Some(order))
    }

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        filter: OrderFilter,
    ) -> Result<Page<Order>> {
        // Build the WHERE clause dynamically; both filters are optional.
        let mut conditions = String::new();
        let mut param_count = 0;
        if user_id.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            conditions.push_str(&format!(" AND status = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders WHERE 1=1{conditions}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(user_id) = user_id {
            count_query = count_query.bind(user_id.as_uuid());
        }
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1{conditions} \
             ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2,
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(user_id) = user_id {
            list_query = list_query.bind(user_id.as_uuid());
        }
        if let Some(status) = filter.status {
            list_query = list_query.bind(status.as_str());
        }
        let rows = list_query
            .bind(i64::from(filter.limit))
            .bind(filter.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = rows
            .iter()
            .map(row_to_order_header)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let mut items = self.load_order_items(&ids).await?;
        for order in &mut orders {
            order.items = items.remove(&order.id.as_uuid()).unwrap_or_default();
        }

        Ok(Page {
            items: orders,
            total: total as u64,
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
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }

        for &(product_id, amount) in restock {
            let result = sqlx::query(
                "UPDATE products SET stock = stock + $2, updated_at = $3 WHERE id = $1",
            )
            .bind(product_id.as_uuid())
            .bind(i64::from(amount))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::ProductNotFound(product_id));
            }
        }

        tx.commit().await?;

        self.get_order(id).await?.ok_or(StoreError::OrderNotFound(id))
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }
}
