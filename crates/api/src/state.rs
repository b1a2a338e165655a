//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::OrderStore;
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the order store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn OrderStore>,
    orders: OrderService,
}

impl AppState {
    /// Create a new application state over a store backend.
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn OrderStore>) -> Self {
        let orders = OrderService::new(Arc::clone(&store));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                orders,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the order store backend.
    #[must_use]
    pub fn store(&self) -> &dyn OrderStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use crate::db::InMemoryOrderStore;

    use super::*;

    #[test]
    fn test_config_survives_state_construction() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().expect("valid ip"),
            port: 8123,
            cors_origin: Some("https://shop.example".to_owned()),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let state = AppState::new(config, Arc::new(InMemoryOrderStore::new()));
        assert_eq!(state.config().port, 8123);
        assert_eq!(
            state.config().cors_origin.as_deref(),
            Some("https://shop.example")
        );
    }
}
