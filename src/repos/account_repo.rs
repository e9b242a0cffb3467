/*
 * Responsibility
 * - OTP account の永続化 ("otp" bucket)
 * - 値は MessagePack で encode して保存
 * - service 層は AccountStore trait 越しに使う (テストで差し替え可能)
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repos::error::RepoError;
use crate::repos::kv::{Bucket, Store};

pub const ACCOUNT_BUCKET: &str = "otp";

/// Persisted account.
///
/// `otp` is the otpauth:// URL; it carries the secret, issuer and account name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub otp: String,
    pub name: String,
    pub qr_code: String,
}

#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    async fn get(&self, name: &str) -> Result<Option<AccountRow>, RepoError>;

    // Insert or replace the row stored under `row.name`.
    async fn save(&self, row: &AccountRow) -> Result<(), RepoError>;

    async fn has(&self, name: &str) -> Result<bool, RepoError>;

    // Returns whether an account was removed.
    async fn delete(&self, name: &str) -> Result<bool, RepoError>;
}

#[derive(Clone, Debug)]
pub struct AccountRepo {
    bucket: Bucket,
}

impl AccountRepo {
    pub fn new(store: &Store) -> Self {
        Self {
            bucket: store.bucket(ACCOUNT_BUCKET),
        }
    }
}

#[async_trait]
impl AccountStore for AccountRepo {
    async fn get(&self, name: &str) -> Result<Option<AccountRow>, RepoError> {
        match self.bucket.get(name).await? {
            Some(raw) => Ok(Some(rmp_serde::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, row: &AccountRow) -> Result<(), RepoError> {
        let raw = rmp_serde::to_vec_named(row)?;
        self.bucket.set(&row.name, &raw).await
    }

    async fn has(&self, name: &str) -> Result<bool, RepoError> {
        self.bucket.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, RepoError> {
        self.bucket.delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> AccountRow {
        AccountRow {
            otp: format!("otpauth://totp/otpd:{name}?secret=JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP&issuer=otpd"),
            name: name.to_string(),
            qr_code: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn saves_and_loads_accounts() {
        let store = Store::open("").await.unwrap();
        let repo = AccountRepo::new(&store);

        assert!(repo.get("alice").await.unwrap().is_none());
        assert!(!repo.has("alice").await.unwrap());

        repo.save(&row("alice")).await.unwrap();
        assert_eq!(repo.get("alice").await.unwrap(), Some(row("alice")));
        assert!(repo.has("alice").await.unwrap());

        assert!(repo.delete("alice").await.unwrap());
        assert!(repo.get("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rows_live_in_the_otp_bucket() {
        let store = Store::open("").await.unwrap();
        let repo = AccountRepo::new(&store);
        repo.save(&row("bob")).await.unwrap();

        let raw = store.bucket(ACCOUNT_BUCKET).get("bob").await.unwrap().unwrap();
        let decoded: AccountRow = rmp_serde::from_slice(&raw).unwrap();
        assert_eq!(decoded.name, "bob");
        assert!(store.bucket("other").get("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_values_surface_as_decode_errors() {
        let store = Store::open("").await.unwrap();
        store.bucket(ACCOUNT_BUCKET).set("broken", &[0xc1]).await.unwrap();

        let repo = AccountRepo::new(&store);
        assert!(matches!(repo.get("broken").await, Err(RepoError::Decode(_))));
    }
}
