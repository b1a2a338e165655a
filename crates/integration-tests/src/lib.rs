//! Shared helpers for Cartwright integration tests.
//!
//! Tests drive the real axum router over the in-memory store, so the full
//! HTTP surface is exercised without `PostgreSQL` or a running process.

use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use secrecy::SecretString;

use cartwright_api::config::ApiConfig;
use cartwright_api::db::InMemoryOrderStore;
use cartwright_api::models::Product;
use cartwright_api::routes;
use cartwright_api::state::AppState;
use cartwright_core::ProductId;

/// A router and its backing store, ready for `oneshot` requests.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryOrderStore>,
}

/// Build a test application over a fresh in-memory store.
#[must_use]
pub fn test_app() -> TestApp {
    let config = ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
    };

    let store = Arc::new(InMemoryOrderStore::new());
    let state = AppState::new(config, Arc::clone(&store) as _);

    TestApp {
        router: routes::router(state),
        store,
    }
}

/// Build a catalog product for seeding.
#[must_use]
pub fn product(id: i32, price: &str, stock: i32) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        description: Some("integration test product".to_owned()),
        price: price.parse().expect("valid decimal"),
        category: "test".to_owned(),
        image_url: None,
        rating: 4.0,
        stock,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
