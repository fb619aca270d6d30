//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::time::Duration;

use saga::FulfillmentSystem;
use serde::Serialize;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub system: FulfillmentSystem<S>,
    /// How long `POST /api/orders?wait=true` waits for completion.
    pub completion_timeout: Duration,
}

/// Success envelope: `{"success": true, "message"?: "...", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            data,
        }
    }
}
