//! Embedded key/value store over SQLite.
//!
//! Notes:
//! - A single `kv` table holds every bucket; buckets only prefix their keys (`"<bucket>:"`).
//! - An empty data path or `:memory:` opens a private in-memory database that lives as long
//!   as the pool (one connection, never recycled).
use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::repos::error::RepoError;

pub const DB_FILE_NAME: &str = "otpd.db";

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn open(data_path: &str) -> Result<Self, RepoError> {
        let data_path = data_path.trim();
        let pool = if data_path.is_empty() || data_path == ":memory:" {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            tokio::fs::create_dir_all(data_path).await?;
            let options = SqliteConnectOptions::new()
                .filename(Path::new(data_path).join(DB_FILE_NAME))
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let location = if data_path.is_empty() { ":memory:" } else { data_path };
        tracing::info!(path = %location, "store opened");

        Ok(Self { pool })
    }

    pub fn bucket(&self, name: &str) -> Bucket {
        Bucket {
            prefix: format!("{name}:"),
            pool: self.pool.clone(),
        }
    }
}

/// Key namespace inside the store.
#[derive(Clone, Debug)]
pub struct Bucket {
    prefix: String,
    pool: SqlitePool,
}

impl Bucket {
    fn key(&self, k: &str) -> String {
        format!("{}{}", self.prefix, k)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub async fn get(&self, k: &str) -> Result<Option<Vec<u8>>, RepoError> {
        let value = sqlx::query_scalar::<_, Vec<u8>>(
            r#"
            SELECT value FROM kv WHERE key = ?1
            "#,
        )
        .bind(self.key(k))
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    pub async fn has(&self, k: &str) -> Result<bool, RepoError> {
        let found = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(1) FROM kv WHERE key = ?1
            "#,
        )
        .bind(self.key(k))
        .fetch_one(&self.pool)
        .await?;

        Ok(found > 0)
    }

    /// Insert or overwrite.
    pub async fn set(&self, k: &str, v: &[u8]) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(self.key(k))
        .bind(v)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns whether a value was removed.
    pub async fn delete(&self, k: &str) -> Result<bool, RepoError> {
        let done = sqlx::query(
            r#"
            DELETE FROM kv WHERE key = ?1
            "#,
        )
        .bind(self.key(k))
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buckets_do_not_share_keys() {
        let store = Store::open("").await.unwrap();
        let otp = store.bucket("otp");
        let other = store.bucket("other");

        otp.set("alice", b"one").await.unwrap();
        assert_eq!(otp.get("alice").await.unwrap().as_deref(), Some(&b"one"[..]));
        assert!(otp.has("alice").await.unwrap());
        assert!(other.get("alice").await.unwrap().is_none());
        assert!(!other.has("alice").await.unwrap());
        assert_eq!(otp.prefix(), "otp:");
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_reports_removal() {
        let store = Store::open(":memory:").await.unwrap();
        let bucket = store.bucket("otp");

        bucket.set("bob", b"first").await.unwrap();
        bucket.set("bob", b"second").await.unwrap();
        assert_eq!(bucket.get("bob").await.unwrap(), Some(b"second".to_vec()));

        assert!(bucket.delete("bob").await.unwrap());
        assert!(!bucket.delete("bob").await.unwrap());
        assert!(bucket.get("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("otpd-kv-{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();

        {
            let store = Store::open(&path).await.unwrap();
            store.bucket("otp").set("carol", b"v").await.unwrap();
        }
        let store = Store::open(&path).await.unwrap();
        assert_eq!(
            store.bucket("otp").get("carol").await.unwrap(),
            Some(b"v".to_vec())
        );

        let _ = std::fs::remove_dir_all(dir);
    }
}
