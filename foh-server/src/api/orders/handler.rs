//! Order Handlers
//!
//! 客人下单凭活跃会话令牌；桌号永远从令牌推导，
//! 请求体里的桌号不可信也不接受。

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use shared::event::ServerEvent;
use shared::models::{OrderItem, OrderStatus, OrderStatusPatch};
use shared::response::{ApiResponse, OrderBody, OrderListBody};

use crate::core::ServerState;
use crate::db::models::OrderCreate;
use crate::utils::error::{AppError, AppResult, ok_message};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub session_token: String,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

fn validate_items(items: &[OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(AppError::validation("Item name cannot be empty"));
        }
        if item.quantity == 0 {
            return Err(AppError::validation("Item quantity must be positive"));
        }
        if item.price < 0.0 || !item.price.is_finite() {
            return Err(AppError::validation("Item price must be a non-negative number"));
        }
    }
    Ok(())
}

/// 客人下单 (公开，凭会话令牌)
pub async fn place(
    State(state): State<ServerState>,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderBody>>> {
    let table_number = state.sessions.table_for_token(&req.session_token).await?;
    validate_items(&req.items)?;

    let total_amount: f64 = req.items.iter().map(|i| i.line_total()).sum();
    let now = Utc::now().timestamp_millis();
    let record = state
        .orders
        .create(OrderCreate {
            table_number,
            items: req.items,
            status: OrderStatus::Pending,
            total_amount,
            created_at: now,
            updated_at: now,
        })
        .await?;

    let order = record.into_shared();
    tracing::info!(order = %order.id, table = table_number, total = total_amount, "Order placed");
    state
        .bus
        .emit_order_event(table_number, &ServerEvent::NewOrder(order.clone()));
    Ok(Json(ApiResponse::ok(OrderBody { order })))
}

/// 某桌台的订单列表 (公开；客人看板与员工看板共用)
pub async fn by_table(
    State(state): State<ServerState>,
    Path(table_number): Path<u32>,
) -> AppResult<Json<ApiResponse<OrderListBody>>> {
    let records = state.orders.find_by_table(table_number).await?;
    let orders = records.into_iter().map(|r| r.into_shared()).collect();
    Ok(Json(ApiResponse::ok(OrderListBody { orders })))
}

/// 员工更新订单状态
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderBody>>> {
    let record = state
        .orders
        .update_status(&id, req.status, Utc::now().timestamp_millis())
        .await?;

    let order = record.into_shared();
    tracing::info!(order = %order.id, status = %order.status, "Order status updated");
    state.bus.emit_order_event(
        order.table_number,
        &ServerEvent::OrderStatusUpdated(OrderStatusPatch {
            id: order.id.clone(),
            status: order.status,
            updated_at: order.updated_at,
        }),
    );
    Ok(Json(ApiResponse::ok(OrderBody { order })))
}

/// 员工删除订单
pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let record = state
        .orders
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", id)))?;

    state.orders.delete(&id).await?;
    tracing::info!(order = %id, table = record.table_number, "Order deleted");
    state.bus.emit_order_event(
        record.table_number,
        &ServerEvent::OrderDeleted { id: id.clone() },
    );
    Ok(ok_message("Order deleted"))
}
