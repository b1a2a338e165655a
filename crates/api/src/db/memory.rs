//! In-memory backend for the order store.
//!
//! Used by tests and local development where `PostgreSQL` is not required.
//! A unit of work takes the store-wide lock for its whole lifetime and
//! mutates a staged copy of the state; `commit` swaps the copy in. That
//! gives the same observable semantics as the database transaction:
//! concurrent placements serialize, and a dropped unit of work leaves no
//! trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use cartwright_core::{OrderId, OrderItemId, OrderStatus, ProductId};

use super::{
    Catalog, Ledger, NewOrder, NewOrderItem, OrderStore, OrderTx, RepositoryError,
    attach_snapshots,
};
use crate::models::{Order, OrderItem, Product};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_order_id: i32,
    next_item_id: i32,
}

/// Thread-safe in-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl InMemoryOrderStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product. Test/seeding helper.
    pub async fn put_product(&self, product: Product) {
        let mut state = self.inner.lock().await;
        state.products.insert(product.id, product);
    }

    /// Read a product's current stock. Test helper.
    pub async fn product_stock(&self, id: ProductId) -> Option<i32> {
        let state = self.inner.lock().await;
        state.products.get(&id).map(|p| p.stock)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, RepositoryError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.inner.lock().await;
        Ok(state.orders.get(&id).map(|order| {
            let mut order = order.clone();
            attach_snapshots(&mut order, &state.products);
            order
        }))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.inner.lock().await;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };

        order.status = status;
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking);
        }
        order.updated_at = Utc::now();

        let mut order = order.clone();
        attach_snapshots(&mut order, &state.products);
        Ok(Some(order))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// A unit of work holding the store lock.
///
/// `guard` keeps every other caller out until this is dropped or
/// committed; `staged` is the copy all mutations apply to.
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl Catalog for MemoryTx {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let Some(product) = self.staged.products.get_mut(&id) else {
            return Ok(false);
        };
        if product.stock < quantity {
            return Ok(false);
        }

        product.stock -= quantity;
        product.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl Ledger for MemoryTx {
    async fn insert_order_with_items(
        &mut self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, RepositoryError> {
        let now = Utc::now();

        self.staged.next_order_id += 1;
        let order_id = OrderId::new(self.staged.next_order_id);

        let items = items
            .into_iter()
            .map(|item| {
                self.staged.next_item_id += 1;
                OrderItem {
                    id: OrderItemId::new(self.staged.next_item_id),
                    order_id,
                    product_id: item.product_id,
                    product: None,
                    quantity: item.quantity,
                    price: item.price,
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect();

        let order = Order {
            id: order_id,
            user_id: order.user_id,
            status: order.status,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            tax: order.tax,
            total: order.total,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            tracking_number: None,
            created_at: now,
            updated_at: now,
            items,
        };

        self.staged.orders.insert(order_id, order.clone());
        Ok(order)
    }
}

#[async_trait]
impl OrderTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use cartwright_core::UserId;

    use super::*;

    fn product(id: i32, price: &str, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: None,
            price: price.parse().expect("valid decimal"),
            category: "test".to_owned(),
            image_url: None,
            rating: 0.0,
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn new_order(user: i32) -> NewOrder {
        NewOrder {
            user_id: UserId::new(user),
            status: OrderStatus::Processing,
            subtotal: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            shipping_address: serde_json::json!({"city": "Portland"}),
            payment_method: "card".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_dropped_tx_discards_staged_changes() {
        let store = InMemoryOrderStore::new();
        store.put_product(product(1, "10.00", 5)).await;

        {
            let mut tx = store.begin().await.expect("begin");
            assert!(tx.decrement_stock(ProductId::new(1), 3).await.expect("decrement"));
            // dropped without commit
        }

        assert_eq!(store.product_stock(ProductId::new(1)).await, Some(5));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_changes() {
        let store = InMemoryOrderStore::new();
        store.put_product(product(1, "10.00", 5)).await;

        let mut tx = store.begin().await.expect("begin");
        assert!(tx.decrement_stock(ProductId::new(1), 3).await.expect("decrement"));
        tx.commit().await.expect("commit");

        assert_eq!(store.product_stock(ProductId::new(1)).await, Some(2));
    }

    #[tokio::test]
    async fn test_decrement_refuses_to_go_negative() {
        let store = InMemoryOrderStore::new();
        store.put_product(product(1, "10.00", 2)).await;

        let mut tx = store.begin().await.expect("begin");
        assert!(!tx.decrement_stock(ProductId::new(1), 3).await.expect("decrement"));
        tx.commit().await.expect("commit");

        assert_eq!(store.product_stock(ProductId::new(1)).await, Some(2));
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryOrderStore::new();
        store.put_product(product(1, "10.00", 10)).await;

        let mut tx = store.begin().await.expect("begin");
        let items = vec![NewOrderItem {
            product_id: ProductId::new(1),
            quantity: 1,
            price: Decimal::new(1000, 2),
        }];
        let order = tx
            .insert_order_with_items(new_order(7), items)
            .await
            .expect("insert");
        tx.commit().await.expect("commit");

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].order_id, order.id);

        let fetched = store.get_order(order.id).await.expect("get").expect("some");
        assert_eq!(fetched.user_id, UserId::new(7));
        assert!(fetched.items[0].product.is_some());
    }
}
