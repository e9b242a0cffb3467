/*
 * Responsibility
 * - OTP account の発行 (secret 生成 → key → QR → 保存)
 * - 現在の passcode 生成、passcode 検証
 * - 永続化は AccountStore 越し
 */
pub mod account;
pub mod totp;

use std::sync::Arc;
use std::time::SystemTimeError;

use thiserror::Error;

use crate::repos::AccountStore;
use crate::repos::error::RepoError;

pub use account::Account;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("no valid account found")]
    AccountNotFound,
    #[error("invalid account: {0}")]
    InvalidAccount(String),
    #[error("invalid otp secret: {0}")]
    Secret(String),
    #[error("invalid otp key: {0}")]
    Key(String),
    #[error("qr code rendering failed: {0}")]
    QrCode(String),
    #[error("system clock error: {0}")]
    Clock(#[from] SystemTimeError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct OtpService {
    accounts: Arc<dyn AccountStore>,
    issuer: String,
}

impl OtpService {
    pub fn new(accounts: Arc<dyn AccountStore>, issuer: impl Into<String>) -> Self {
        Self {
            accounts,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Existing account for `name`, or a freshly issued and persisted one.
    pub async fn key(&self, name: &str) -> Result<Account, OtpError> {
        if let Some(row) = self.accounts.get(name).await? {
            return Ok(row.into());
        }

        let secret = totp::generate_secret();
        let key = totp::generate_key(name, &secret, &self.issuer)?;
        let qr = totp::qr_code(&key)?;
        let account = Account::new(&key, name, qr);

        self.accounts.save(&(&account).into()).await?;
        tracing::info!(name = %name, issuer = %self.issuer, "otp account issued");

        Ok(account)
    }

    pub async fn account(&self, name: &str) -> Result<Account, OtpError> {
        self.accounts
            .get(name)
            .await?
            .map(Account::from)
            .ok_or(OtpError::AccountNotFound)
    }

    pub async fn passcode(&self, name: &str) -> Result<String, OtpError> {
        let key = self.account(name).await?.key()?;
        totp::passcode(&key)
    }

    pub async fn validate(&self, name: &str, passcode: &str) -> Result<bool, OtpError> {
        let key = self.account(name).await?.key()?;
        let valid = totp::validate(&key, passcode)?;
        tracing::debug!(name = %name, valid, "passcode checked");
        Ok(valid)
    }
}
