use serde::Serialize;
use totp_rs::TOTP;

use super::OtpError;
use super::totp::from_url_error;
use crate::repos::AccountRow;

/// An OTP account as handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// otpauth:// URL
    pub otp: String,
    pub name: String,
    /// `data:image/png;base64,...`
    pub qr_code: String,
}

impl Account {
    pub fn new(key: &TOTP, name: impl Into<String>, qr_code: String) -> Self {
        Self {
            otp: key.get_url(),
            name: name.into(),
            qr_code,
        }
    }

    /// Parse the stored URL back into a key.
    pub fn key(&self) -> Result<TOTP, OtpError> {
        TOTP::from_url(&self.otp).map_err(from_url_error)
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            otp: row.otp,
            name: row.name,
            qr_code: row.qr_code,
        }
    }
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            otp: account.otp.clone(),
            name: account.name.clone(),
            qr_code: account.qr_code.clone(),
        }
    }
}
