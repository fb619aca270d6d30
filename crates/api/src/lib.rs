//! HTTP API server for the order fulfillment system.
//!
//! Provides REST endpoints for products and orders, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use document_store::{DocumentStore, InMemoryDocumentStore, JsonFileStore, StoreError};
use domain::inventory::{LOCKS_COLLECTION, PRODUCTS_COLLECTION};
use domain::order::ORDERS_COLLECTION;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::FulfillmentSystem;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, StorageBackend};
use routes::AppState;

/// Store type used by the binary, chosen at runtime.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/api/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/orders/{id}/saga", get(routes::orders::saga_status::<S>))
        .route(
            "/api/products",
            post(routes::products::add::<S>).get(routes::products::list::<S>),
        )
        .route("/api/products/{sku}", get(routes::products::get::<S>))
        .route(
            "/api/products/{sku}/quantity",
            patch(routes::products::adjust_quantity::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Starts the fulfillment system over `store` and wraps it in handler state.
pub fn build_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        system: FulfillmentSystem::start(store),
        completion_timeout: config.order_completion_timeout,
    })
}

/// Opens the storage backend selected by `config`.
pub async fn open_store(config: &Config) -> Result<SharedStore, StoreError> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        StorageBackend::File => {
            let store = JsonFileStore::open(&config.data_dir)
                .await?
                .with_file_name(PRODUCTS_COLLECTION, config.inventory_file_name.clone())
                .with_file_name(LOCKS_COLLECTION, config.inventory_locks_file_name.clone())
                .with_file_name(ORDERS_COLLECTION, config.orders_file_name.clone());
            Ok(Arc::new(store))
        }
    }
}
