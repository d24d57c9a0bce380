use axum::{Router, response::Json as ResponseJson, routing::get};
use utils::response::ApiResponse;

use crate::AppState;

pub mod loading;
pub mod orders;

/// GET /api/health
pub async fn health_check() -> ResponseJson<ApiResponse<&'static str>> {
    ResponseJson(ApiResponse::success("OK"))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .merge(orders::router(state))
        .merge(loading::router(state))
}
