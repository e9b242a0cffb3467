/*
 * Responsibility
 * - OTP API の request (query) / response DTO
 * - 入力チェック (name / passcode の空文字) は validate 系メソッドで行う
 */
use serde::{Deserialize, Serialize};

use crate::middleware::auth::{AuthContext, AuthResult, Claims, Identity};
use crate::services::otp::Account;

pub const NAME_REQUIRED: &str = "the name cannot be empty";
pub const PASSCODE_REQUIRED: &str = "the passcode cannot be empty";

#[derive(Debug, Default, Deserialize)]
pub struct AccountQuery {
    pub name: Option<String>,
}

impl AccountQuery {
    /// Explicit `name`, else the authenticated username.
    pub fn resolve_name<'a>(&'a self, auth: Option<&'a AuthContext>) -> Result<&'a str, &'static str> {
        non_empty(self.name.as_deref())
            .or_else(|| auth.and_then(|ctx| ctx.result().username()).filter(|n| !n.is_empty()))
            .ok_or(NAME_REQUIRED)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    pub name: Option<String>,
    pub passcode: Option<String>,
}

impl ValidateQuery {
    pub fn validate(&self) -> Result<(&str, &str), &'static str> {
        let name = non_empty(self.name.as_deref()).ok_or(NAME_REQUIRED)?;
        let passcode = non_empty(self.passcode.as_deref()).ok_or(PASSCODE_REQUIRED)?;
        Ok((name, passcode))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub otp: String,
    pub name: String,
    pub qr_code: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            otp: account.otp,
            name: account.name,
            qr_code: account.qr_code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PasscodeResponse {
    pub name: String,
    pub passcode: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub name: String,
    pub valid: bool,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub context_key: String,
    pub schema: &'static str,
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}

impl From<AuthContext> for WhoAmIResponse {
    fn from(ctx: AuthContext) -> Self {
        let context_key = ctx.key().to_string();
        let username = ctx.result().username().map(str::to_string);
        match ctx.into_result() {
            AuthResult::Basic(identity) => Self {
                context_key,
                schema: "Basic",
                username,
                identity: Some(identity),
                claims: None,
            },
            AuthResult::Bearer(claims) => Self {
                context_key,
                schema: "Bearer",
                username,
                identity: None,
                claims: Some(claims),
            },
        }
    }
}
