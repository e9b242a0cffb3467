/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::services::otp::OtpService;

#[derive(Clone)]
pub struct AppState {
    pub otp: Arc<OtpService>,
}

impl AppState {
    pub fn new(otp: Arc<OtpService>) -> Self {
        Self { otp }
    }
}
