//! TOTP primitives (RFC 6238: SHA1, 6 digits, 30 second step, one step of skew).
use totp_rs::{Algorithm, Secret, TOTP, TotpUrlError};

use super::OtpError;

pub const DIGITS: usize = 6;
pub const STEP_SECONDS: u64 = 30;
pub const SKEW: u8 = 1;

const QR_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// 20 random bytes, base32 without padding.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

pub fn generate_key(account_name: &str, secret: &str, issuer: &str) -> Result<TOTP, OtpError> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| OtpError::Secret(format!("{e:?}")))?;

    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECONDS,
        bytes,
        Some(issuer.to_string()),
        account_name.to_string(),
    )
    .map_err(from_url_error)
}

/// PNG QR code of the otpauth URL as a `data:` URL.
pub fn qr_code(key: &TOTP) -> Result<String, OtpError> {
    let png = key.get_qr_base64().map_err(OtpError::QrCode)?;
    Ok(format!("{QR_DATA_URL_PREFIX}{png}"))
}

/// Code for the current time step.
pub fn passcode(key: &TOTP) -> Result<String, OtpError> {
    Ok(key.generate_current()?)
}

/// Accepts codes from the current step and `SKEW` steps around it.
pub fn validate(key: &TOTP, passcode: &str) -> Result<bool, OtpError> {
    Ok(key.check_current(passcode.trim())?)
}

pub(crate) fn from_url_error(e: TotpUrlError) -> OtpError {
    match e {
        TotpUrlError::AccountName(_) => OtpError::InvalidAccount(e.to_string()),
        other => OtpError::Key(other.to_string()),
    }
}
