/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 認証は app.rs で router 全体に layer する (bypass は skip paths で決める)
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{
    health::ping,
    otp::{get_key, get_passcode, validate, whoami},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/key", get(get_key))
        .route("/passcode", get(get_passcode))
        .route("/validate", get(validate))
        .route("/whoami", get(whoami))
}
