use std::sync::Arc;

use document_store::DocumentStore;
use domain::{Dispatcher, InventoryLedger, OrderService, OrderStore, ProductCatalog};

use crate::coordinator::FulfillmentSaga;
use crate::finalizer::StatusFinalizer;
use crate::listeners::register_listeners;

/// The fully wired fulfillment system over one document store.
///
/// All components share the same dispatcher and, through the ledger, the same
/// per-SKU guards.
pub struct FulfillmentSystem<S> {
    dispatcher: Dispatcher,
    catalog: ProductCatalog<S>,
    orders: OrderService<S>,
    saga: Arc<FulfillmentSaga<S>>,
}

impl<S: DocumentStore + Clone + 'static> FulfillmentSystem<S> {
    /// Builds every component and registers the listeners.
    ///
    /// Spawns the dispatch worker, so it must be called inside a tokio runtime.
    pub fn start(store: S) -> Self {
        let dispatcher = Dispatcher::start();

        let ledger = InventoryLedger::new(store.clone(), dispatcher.clone());
        let order_store = OrderStore::new(store);

        let saga = Arc::new(FulfillmentSaga::new(ledger.clone(), dispatcher.clone()));
        let finalizer = Arc::new(StatusFinalizer::new(order_store.clone(), dispatcher.clone()));
        register_listeners(&dispatcher, saga.clone(), finalizer);

        tracing::info!("fulfillment system started");

        Self {
            catalog: ProductCatalog::new(ledger),
            orders: OrderService::new(order_store, dispatcher.clone()),
            dispatcher,
            saga,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn catalog(&self) -> &ProductCatalog<S> {
        &self.catalog
    }

    pub fn ledger(&self) -> &InventoryLedger<S> {
        self.catalog.ledger()
    }

    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    pub fn saga(&self) -> &FulfillmentSaga<S> {
        &self.saga
    }

    /// Waits until every in-flight saga and notification has been handled.
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await;
    }
}
