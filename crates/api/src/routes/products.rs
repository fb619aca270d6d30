//! Direct product management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::Sku;
use document_store::DocumentStore;
use domain::{NewProduct, Product};
use serde::Deserialize;

use super::{ApiResponse, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct QuantityChangeRequest {
    /// Signed change applied to the current quantity.
    pub change: i64,
}

/// POST /api/products: add a product.
#[tracing::instrument(skip_all)]
pub async fn add<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let Json(input) = payload?;
    let product = state.system.catalog().add_product(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

/// GET /api/products: list every product.
pub async fn list<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let products = state.system.catalog().list_products().await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// GET /api/products/{sku}: load one product.
pub async fn get<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = state.system.catalog().get_product(&Sku::new(sku)).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// PATCH /api/products/{sku}/quantity: apply a signed stock change.
#[tracing::instrument(skip(state, payload))]
pub async fn adjust_quantity<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
    payload: Result<Json<QuantityChangeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let Json(req) = payload?;
    let product = state
        .system
        .catalog()
        .adjust_quantity(&Sku::new(sku), req.change)
        .await?;
    Ok(Json(ApiResponse::ok(product)))
}
