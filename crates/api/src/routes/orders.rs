//! Order intake and order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerRef, ItemId, OrderId};
use domain::Order;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub items: Vec<u32>,
}

/// POST /orders: accepts an order and starts its fulfillment.
#[tracing::instrument(skip(state, req), fields(customer = %req.customer, items = req.items.len()))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let items = req.items.into_iter().map(ItemId::new).collect();
    let order = state
        .intake
        .create_order(CustomerRef::new(req.customer), items)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: lists every order held by Order Intake.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.intake.list_orders().await?))
}

/// GET /orders/{id}: returns one order with its mirrored status.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id =
        OrderId::parse(&id).ok_or_else(|| ApiError::BadRequest(format!("Invalid order ID: {id}")))?;
    state
        .intake
        .get_order(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))
}
