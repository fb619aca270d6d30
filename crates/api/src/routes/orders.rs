//! Order placement and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{CustomerId, OrderId};
use document_store::DocumentStore;
use domain::{Money, Order, OrderItem, PaymentMethod, PlaceOrder};
use saga::SagaInstance;
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub payment_amount: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderParams {
    #[serde(default)]
    pub wait: bool,
}

// -- Handlers --

/// POST /api/orders: place an order.
///
/// Answers 202 with the PENDING order right away. With `?wait=true` it
/// answers 200 once the order reaches its final status.
#[tracing::instrument(skip_all)]
pub async fn place<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<PlaceOrderParams>, QueryRejection>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let Json(req) = payload?;

    let cmd = PlaceOrder::new(
        CustomerId::new(req.customer_id),
        req.items,
        req.payment_method,
        req.payment_amount,
    );

    if params.wait {
        let order = state
            .system
            .orders()
            .place_and_wait(cmd, state.completion_timeout)
            .await?;
        let body = ApiResponse::with_message("Order has been processed.", order);
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        let order = state.system.orders().place_order(cmd).await?;
        let body = ApiResponse::with_message("Order received and is being processed.", order);
        Ok((StatusCode::ACCEPTED, Json(body)).into_response())
    }
}

/// GET /api/orders: list every order.
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state.system.orders().orders().list().await?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// GET /api/orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.system.orders().orders().get(order_id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// GET /api/orders/{id}/saga: inspect the fulfillment saga of an order.
#[tracing::instrument(skip(state))]
pub async fn saga_status<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SagaInstance>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let saga = state
        .system
        .saga()
        .get_saga(order_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No saga found for order {id}")))?;
    Ok(Json(ApiResponse::ok(saga)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
