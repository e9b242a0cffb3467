/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("data directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("value encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("value decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
