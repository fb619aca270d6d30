use std::sync::Arc;

use document_store::DocumentStore;
use domain::{Dispatcher, EventName};

use crate::coordinator::FulfillmentSaga;
use crate::finalizer::StatusFinalizer;

/// Subscribes the saga to placements and the finalizer to saga milestones.
pub fn register_listeners<S: DocumentStore + 'static>(
    dispatcher: &Dispatcher,
    saga: Arc<FulfillmentSaga<S>>,
    finalizer: Arc<StatusFinalizer<S>>,
) {
    dispatcher.subscribe(EventName::OrderPlaced, saga);
    dispatcher.subscribe(EventName::OrderProcessed, finalizer.clone());
    dispatcher.subscribe(EventName::OrderProcessingFailed, finalizer);
    tracing::debug!("fulfillment listeners registered");
}
