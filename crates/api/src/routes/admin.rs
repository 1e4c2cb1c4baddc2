//! Privileged order management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{OrderMetadata, OrderStatus};
use orders::{EditOrder, OrderView};
use serde::Deserialize;
use store::{OrderQuery, Store};

use super::auth::Admin;
use super::orders::{AppState, LineItemRequest, into_lines, parse_order_id};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EditOrderRequest {
    #[serde(default)]
    pub items: Option<Vec<LineItemRequest>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub shipping_company: Option<String>,
    #[serde(default)]
    pub admin_comment: Option<String>,
}

fn parse_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .parse()
        .map_err(|e: domain::OrderError| ApiError::BadRequest(e.to_string()))
}

/// GET /admin/orders — list all orders, optionally filtered by status.
#[tracing::instrument(skip(state, _admin))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Admin,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(ref status) = params.status {
        query = query.status(parse_status(status)?.as_str());
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let views = state.order_service.list_all_order_views(query).await?;
    Ok(Json(views))
}

/// PATCH /admin/orders/{id} — edit items, status or shipping metadata.
#[tracing::instrument(skip(state, _admin, req))]
pub async fn edit<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Admin,
    Path(id): Path<String>,
    Json(req): Json<EditOrderRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let status = req.status.as_deref().map(parse_status).transpose()?;

    let mut cmd = EditOrder::new(order_id).with_metadata(OrderMetadata {
        status,
        tracking_number: req.tracking_number,
        shipping_company: req.shipping_company,
        admin_comment: req.admin_comment,
    });
    if let Some(items) = req.items {
        cmd = cmd.with_items(into_lines(items)?);
    }

    let order = state.order_service.edit_order(cmd).await?;
    Ok(Json(state.order_service.view(&order).await?))
}

/// POST /admin/orders/{id}/cancel — cancel a pending order.
#[tracing::instrument(skip(state, _admin))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.cancel_order(order_id).await?;
    Ok(Json(state.order_service.view(&order).await?))
}
