//! `PostgreSQL` backend for the order store.
//!
//! Queries use the runtime sqlx API with `FromRow` row structs. The
//! placement unit of work maps onto a database transaction: product reads
//! take a row lock (`FOR UPDATE`) so the stock check stays valid until
//! commit, and the decrement itself carries a `stock >= $n` guard as a
//! second line of defense against ever writing a negative value.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use cartwright_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::{Catalog, Ledger, NewOrder, NewOrderItem, OrderStore, OrderTx, RepositoryError};
use crate::models::{Order, OrderItem, Product};

const SELECT_ORDER: &str = "\
    SELECT id, user_id, status, subtotal, shipping_cost, tax, total, \
           shipping_address, payment_method, tracking_number, created_at, updated_at \
    FROM orders WHERE id = $1";

/// Order store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the items of an order, oldest first, with product snapshots.
    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, price, created_at, updated_at \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let product_ids: Vec<i32> = rows.iter().map(|r| r.product_id.as_i32()).collect();
        let products: Vec<Product> = sqlx::query_as(
            "SELECT id, title, description, price, category, image_url, rating, stock, \
                    created_at, updated_at \
             FROM products WHERE id = ANY($1)",
        )
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await?;
        let by_id: BTreeMap<ProductId, Product> =
            products.into_iter().map(|p| (p.id, p)).collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = by_id.get(&row.product_id).cloned();
                row.into_item(product)
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgOrderTx { tx }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(SELECT_ORDER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self.load_items(row.id).await?;
                Ok(Some(row.into_order(items)))
            }
            None => Ok(None),
        }
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            "UPDATE orders \
             SET status = $2, \
                 tracking_number = COALESCE($3, tracking_number), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, user_id, status, subtotal, shipping_cost, tax, total, \
                       shipping_address, payment_method, tracking_number, created_at, updated_at",
        )
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(row.id).await?;
                Ok(Some(row.into_order(items)))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

/// A placement unit of work mapped onto a database transaction.
///
/// Dropping this without `commit` rolls the transaction back.
struct PgOrderTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Catalog for PgOrderTx {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        // FOR UPDATE keeps the stock value we check against stable until commit
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, title, description, price, category, image_url, rating, stock, \
                    created_at, updated_at \
             FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products \
             SET stock = stock - $2, updated_at = now() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Ledger for PgOrderTx {
    async fn insert_order_with_items(
        &mut self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(
            "INSERT INTO orders \
                 (user_id, status, subtotal, shipping_cost, tax, total, \
                  shipping_address, payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, status, subtotal, shipping_cost, tax, total, \
                       shipping_address, payment_method, tracking_number, created_at, updated_at",
        )
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.tax)
        .bind(order.total)
        .bind(&order.shipping_address)
        .bind(&order.payment_method)
        .fetch_one(&mut *self.tx)
        .await?;

        let mut persisted = Vec::with_capacity(items.len());
        for item in items {
            let item_row: OrderItemRow = sqlx::query_as(
                "INSERT INTO order_items (order_id, product_id, quantity, price) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, order_id, product_id, quantity, price, created_at, updated_at",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .fetch_one(&mut *self.tx)
            .await?;
            persisted.push(item_row.into_item(None));
        }

        Ok(row.into_order(persisted))
    }
}

#[async_trait]
impl OrderTx for PgOrderTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    shipping_address: serde_json::Value,
    payment_method: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderItemRow {
    fn into_item(self, product: Option<Product>) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            product,
            quantity: self.quantity,
            price: self.price,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
