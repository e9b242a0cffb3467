/*
 * Responsibility
 * - 永続化層 (embedded SQLite の kv テーブル)
 * - bucket 単位の key prefix と、OTP account の保存/取得
 */
pub mod account_repo;
pub mod error;
pub mod kv;

pub use account_repo::{AccountRepo, AccountRow, AccountStore};
pub use kv::{Bucket, Store};
