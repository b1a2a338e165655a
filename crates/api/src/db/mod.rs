//! Persistence contracts and backends.
//!
//! The order workflow talks to storage through two narrow contracts:
//!
//! - [`Catalog`] - product lookup and the atomic, floor-at-zero stock
//!   decrement (the one primitive that keeps stock from going negative
//!   under concurrent placement)
//! - [`Ledger`] - the all-or-nothing order + items insert
//!
//! Both are scoped to an [`OrderTx`] unit of work obtained from an
//! [`OrderStore`]. Dropping a unit of work without calling `commit`
//! discards every staged effect, which is what makes a failed stock check
//! partway through a multi-line cart leave no trace.
//!
//! Two backends exist: [`postgres::PgOrderStore`] for production and
//! [`memory::InMemoryOrderStore`] for tests and local development.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartwright_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::models::{Order, Product};

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// An order row to be inserted, totals already derived by the workflow.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
}

/// An order line to be inserted, with the price captured at purchase time.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

/// Product lookup and stock mutation, scoped to a unit of work.
#[async_trait]
pub trait Catalog: Send {
    /// Look up a product by id.
    ///
    /// Backends must ensure the returned stock value stays valid for the
    /// rest of the unit of work (Postgres locks the row, the memory store
    /// holds the store lock).
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Atomically decrement a product's stock, refusing to go below zero.
    ///
    /// Returns `false` if the product is missing or has less than
    /// `quantity` in stock; in that case nothing is changed.
    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError>;
}

/// Order persistence, scoped to a unit of work.
#[async_trait]
pub trait Ledger: Send {
    /// Insert an order and its items as one aggregate, returning the
    /// persisted order with generated ids and timestamps.
    ///
    /// Item product snapshots are left unset; callers resolve them.
    async fn insert_order_with_items(
        &mut self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, RepositoryError>;
}

/// A unit of work over the catalog and the order ledger.
///
/// Nothing done through this handle is visible to other callers until
/// `commit` returns. Dropping the handle rolls everything back.
#[async_trait]
pub trait OrderTx: Catalog + Ledger + Send {
    /// Commit every staged effect.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Storage backend for the order workflow.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Begin a unit of work.
    async fn begin(&self) -> Result<Box<dyn OrderTx>, RepositoryError>;

    /// Fetch an order with its items and current product snapshots.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Update an order's status (and tracking number, when provided).
    ///
    /// Returns the updated order, or `None` if no such order exists.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Verify the backend is reachable. Used by the readiness endpoint.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Attach current product snapshots to an order's items.
///
/// A missing product leaves the snapshot as `None`; the item keeps its
/// captured price either way.
pub(crate) fn attach_snapshots(
    order: &mut Order,
    products: &std::collections::BTreeMap<ProductId, Product>,
) {
    for item in &mut order.items {
        item.product = products.get(&item.product_id).cloned();
    }
}
