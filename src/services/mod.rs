/*
 * Responsibility
 * - ドメインロジック (OTP) と、設定からの auth middleware 組み立て
 */
pub mod auth;
pub mod otp;
