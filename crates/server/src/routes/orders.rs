use axum::{
    Router,
    body::Bytes,
    extract::{Json, Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post, put},
};
use db::models::{
    loading_plan::OptimizationResult,
    order::{Order, OrderDetail, OrderStatus, OrderSummary},
    order_data::{LineItem, OrderData},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOcrPayload {
    #[serde(alias = "raw_ocr_data")]
    pub raw_ocr_data: OrderData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineItemsPayload {
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
}

async fn load_order(pool: &SqlitePool, id: Uuid) -> Result<Order, ApiError> {
    Order::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<OrderSummary>>>, ApiError> {
    let orders = Order::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(
        orders.into_iter().map(OrderSummary::from).collect(),
    )))
}

/// POST /api/orders
/// Body is the raw PDF. The order starts out `pending`.
pub async fn upload_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, ResponseJson<ApiResponse<OrderSummary>>), ApiError> {
    let key = state.documents.put_pdf(&body).await?;
    let order = Order::create(&state.db.pool, Uuid::new_v4(), &key).await?;
    info!(order_id = %order.id, document = %key, "Order uploaded");

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(OrderSummary::from(order))),
    ))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<OrderDetail>>, ApiError> {
    let order = load_order(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(OrderDetail::from(order))))
}

/// GET /api/orders/{id}/document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = load_order(&state.db.pool, id).await?;
    let bytes = state.documents.get(&order.document_path).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

/// POST /api/orders/{id}/ocr
/// Store the OCR extraction for the order and mark it completed.
pub async fn store_ocr(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StoreOcrPayload>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<OrderDetail>>, ApiError> {
    let Json(payload) = payload?;
    let order = Order::update_ocr_data(
        &state.db.pool,
        id,
        &payload.raw_ocr_data,
        Some(OrderStatus::Completed),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    info!(
        order_id = %id,
        line_items = payload.raw_ocr_data.line_items.len(),
        "Stored OCR data"
    );
    Ok(ResponseJson(ApiResponse::success(OrderDetail::from(order))))
}

/// PUT /api/orders/{id}/line-items
/// Replace the line items. `totalPallets` is recomputed for every item; the
/// value sent by the client is ignored.
pub async fn update_line_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateLineItemsPayload>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<OrderDetail>>, ApiError> {
    let Json(payload) = payload?;
    let order = load_order(&state.db.pool, id).await?;

    let mut data = order.parsed_ocr_data().unwrap_or_default();
    data.line_items = payload.line_items;
    let data = data.with_recomputed_pallets();

    let order = Order::update_ocr_data(&state.db.pool, id, &data, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(OrderDetail::from(order))))
}

/// PUT /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusPayload>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<OrderSummary>>, ApiError> {
    let Json(payload) = payload?;
    let order = Order::update_status(&state.db.pool, id, payload.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(OrderSummary::from(order))))
}

/// GET /api/orders/{id}/loading
pub async fn get_loading_instructions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<OptimizationResult>>, ApiError> {
    let order = load_order(&state.db.pool, id).await?;
    let plan = order
        .parsed_loading_instructions()
        .ok_or_else(|| ApiError::NotFound("No loading instructions for this order".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(upload_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/document", get(get_document))
        .route("/orders/{id}/ocr", post(store_ocr))
        .route("/orders/{id}/line-items", put(update_line_items))
        .route("/orders/{id}/status", put(update_status))
        .route("/orders/{id}/loading", get(get_loading_instructions))
}
