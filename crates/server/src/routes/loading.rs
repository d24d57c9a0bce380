use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{
    lenient,
    loading_plan::OptimizationResult,
    order_data::LineItem,
};
use serde::Deserialize;
use services::services::loading_optimizer::{
    LoadingError, OptimizationRequest, RegenerationFragment, RegenerationRequest,
    RegenerationScope,
};
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// Body of POST /api/optimize-loading. Shape checks beyond JSON syntax are
/// left to [`OptimizationRequest::validate`] so they surface as 400s with
/// the pipeline's messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeLoadingPayload {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(default)]
    pub num_trucks: Option<i64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub allow_stacking: bool,
}

impl OptimizeLoadingPayload {
    fn into_request(self) -> OptimizationRequest {
        OptimizationRequest {
            line_items: self.line_items.unwrap_or_default(),
            // Negative and out-of-range counts become 0 and fail validation
            num_trucks: self
                .num_trucks
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            allow_stacking: self.allow_stacking,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateInstructionsPayload {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub truck_index: Option<i64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub current_plan: Option<OptimizationResult>,
    #[serde(default)]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_full_regeneration: bool,
}

impl RegenerateInstructionsPayload {
    fn into_request(self) -> Result<RegenerationRequest, LoadingError> {
        let scope = if self.is_full_regeneration {
            RegenerationScope::Full
        } else {
            let index = self
                .truck_index
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| {
                    LoadingError::Validation(
                        "truckIndex is required unless isFullRegeneration is set".to_string(),
                    )
                })?;
            RegenerationScope::Truck(index)
        };

        Ok(RegenerationRequest {
            scope,
            feedback: self.feedback.unwrap_or_default(),
            current_plan: self.current_plan.unwrap_or_default(),
            line_items: self.line_items.unwrap_or_default(),
        })
    }
}

/// POST /api/optimize-loading
/// Plan every truck; with `orderId` the plan is also stored on the order.
pub async fn optimize_loading(
    State(state): State<AppState>,
    payload: Result<Json<OptimizeLoadingPayload>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<OptimizationResult>>, ApiError> {
    let optimizer = state.optimizer().map_err(ApiError::Optimize)?;
    let Json(payload) = payload?;

    let order_id = payload.order_id;
    let request = payload.into_request();

    let result = match order_id {
        Some(id) => optimizer.optimize_order(&state.db.pool, id, &request).await,
        None => optimizer.optimize(&request).await,
    }
    .map_err(ApiError::Optimize)?;

    Ok(ResponseJson(ApiResponse::success(result)))
}

/// POST /api/regenerate-instructions
/// Returns the replacement truck, or the whole new plan for a full
/// regeneration.
pub async fn regenerate_instructions(
    State(state): State<AppState>,
    payload: Result<Json<RegenerateInstructionsPayload>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<RegenerationFragment>>, ApiError> {
    let optimizer = state.optimizer().map_err(ApiError::Regenerate)?;
    let Json(payload) = payload?;

    let order_id = payload.order_id;
    let request = payload.into_request().map_err(ApiError::Regenerate)?;

    let outcome = match order_id {
        Some(id) => optimizer.regenerate_order(&state.db.pool, id, request).await,
        None => optimizer.regenerate(&request).await,
    }
    .map_err(ApiError::Regenerate)?;

    Ok(ResponseJson(ApiResponse::success(outcome.into_fragment())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/optimize-loading", post(optimize_loading))
        .route("/regenerate-instructions", post(regenerate_instructions))
}
