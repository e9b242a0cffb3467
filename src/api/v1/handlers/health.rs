/*
 * Responsibility
 * - GET /health, GET /api/v1/ping (疎通用)
 * - どちらも既定の skip paths で認証を通さない
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub async fn ping() -> &'static str {
    "pong"
}
