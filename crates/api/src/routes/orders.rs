//! Customer-facing order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{ChangeNotifier, LineRequest, ShippingInfo};
use orders::{OrderService, OrderView, Page, PlaceOrder};
use serde::{Deserialize, Serialize};
use store::Store;

use super::auth::Caller;
use crate::error::ApiError;

/// Notifier shared by every request handler.
pub type SharedNotifier = Arc<dyn ChangeNotifier>;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub order_service: OrderService<S, SharedNotifier>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub size_id: String,
    pub color_id: String,
    pub quantity: i64,
}

impl LineItemRequest {
    fn into_line(self) -> Result<LineRequest, ApiError> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Invalid quantity {} for product {} (must be greater than 0)",
                    self.quantity, self.product_id
                ))
            })?;
        Ok(LineRequest::new(
            self.product_id,
            self.size_id,
            self.color_id,
            quantity,
        ))
    }
}

/// Converts request lines, rejecting non-positive quantities.
pub fn into_lines(items: Vec<LineItemRequest>) -> Result<Vec<LineRequest>, ApiError> {
    items.into_iter().map(LineItemRequest::into_line).collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: OrderId,
    pub order: OrderView,
}

// -- Handlers --

/// POST /orders — place an order for the caller.
#[tracing::instrument(skip(state, req), fields(user_id = %caller.user_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let mut cmd = PlaceOrder::new(into_lines(req.items)?);
    if let Some(shipping_info) = req.shipping_info {
        cmd = cmd.with_shipping_info(shipping_info);
    }

    let order = state
        .order_service
        .place_order(caller.user_id, cmd)
        .await?;
    let view = state.order_service.view(&order).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: order.id(),
            order: view,
        }),
    ))
}

/// GET /orders — list the caller's orders, newest first.
#[tracing::instrument(skip(state), fields(user_id = %caller.user_id))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Query(page): Query<Page>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let views = state
        .order_service
        .list_user_order_views(caller.user_id, page)
        .await?;
    Ok(Json(views))
}

/// GET /orders/{id} — one of the caller's orders. Admins may read any order.
#[tracing::instrument(skip(state), fields(user_id = %caller.user_id))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let view = if caller.is_admin {
        state.order_service.get_order_view(order_id).await?
    } else {
        state
            .order_service
            .get_order_view_for(caller.user_id, order_id)
            .await?
    };
    Ok(Json(view))
}

pub fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i64) -> LineItemRequest {
        LineItemRequest {
            product_id: "tee".to_string(),
            size_id: "M".to_string(),
            color_id: "red".to_string(),
            quantity,
        }
    }

    #[test]
    fn test_into_lines_rejects_non_positive_quantities() {
        assert!(into_lines(vec![line(2)]).is_ok());
        assert!(matches!(
            into_lines(vec![line(2), line(0)]),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            into_lines(vec![line(-3)]),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_order_id() {
        let id = OrderId::new();
        assert_eq!(parse_order_id(&id.to_string()).unwrap(), id);
        assert!(parse_order_id("not-a-uuid").is_err());
    }
}
