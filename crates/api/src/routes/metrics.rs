//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers descriptions for the metrics the service emits.
pub fn describe() {
    metrics::describe_counter!("orders_placed_total", "Orders accepted for fulfillment");
    metrics::describe_counter!("saga_executions_total", "Fulfillment sagas started");
    metrics::describe_counter!("saga_processed", "Fulfillment sagas that committed every item");
    metrics::describe_counter!("saga_failed", "Fulfillment sagas that ended in compensation");
    metrics::describe_histogram!(
        "saga_duration_seconds",
        metrics::Unit::Seconds,
        "Time from order placement notification to saga outcome"
    );
    metrics::describe_counter!("inventory_reservations_total", "Stock reservation attempts");
    metrics::describe_counter!(
        "inventory_reservations_rejected",
        "Stock reservations refused for missing stock or product"
    );
    metrics::describe_counter!("notifications_published_total", "Notifications published, by event");
    metrics::describe_counter!(
        "notification_handler_failures_total",
        "Notification handlers that returned an error, by event"
    );
    metrics::describe_counter!(
        "document_store_conflict_retries_total",
        "Collection writes retried after a version conflict"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
