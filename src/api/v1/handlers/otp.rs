/*
 * Responsibility
 * - GET /key, /passcode, /validate, /whoami
 * - Query を DTO で受け、入力チェック → OtpService 呼び出し
 * - name 省略時は認証済みユーザー名を使う (/key, /passcode)
 */
use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    api::v1::dto::otp::{
        AccountQuery, AccountResponse, PasscodeResponse, ValidateQuery, ValidateResponse,
        WhoAmIResponse,
    },
    error::AppError,
    middleware::auth::{Authenticated, MaybeAuthenticated},
    state::AppState,
};

pub async fn get_key(
    State(state): State<AppState>,
    MaybeAuthenticated(auth): MaybeAuthenticated,
    Query(q): Query<AccountQuery>,
) -> Result<Json<AccountResponse>, AppError> {
    let name = q
        .resolve_name(auth.as_ref())
        .map_err(|m| AppError::bad_request("NAME_REQUIRED", m))?;

    let account = state.otp.key(name).await?;
    Ok(Json(account.into()))
}

pub async fn get_passcode(
    State(state): State<AppState>,
    MaybeAuthenticated(auth): MaybeAuthenticated,
    Query(q): Query<AccountQuery>,
) -> Result<Json<PasscodeResponse>, AppError> {
    let name = q
        .resolve_name(auth.as_ref())
        .map_err(|m| AppError::bad_request("NAME_REQUIRED", m))?;

    let passcode = state.otp.passcode(name).await?;
    Ok(Json(PasscodeResponse {
        name: name.to_string(),
        passcode,
    }))
}

pub async fn validate(
    State(state): State<AppState>,
    Query(q): Query<ValidateQuery>,
) -> Result<Json<ValidateResponse>, AppError> {
    let (name, passcode) = q
        .validate()
        .map_err(|m| AppError::bad_request("INVALID_QUERY", m))?;

    let valid = state.otp.validate(name, passcode).await?;
    Ok(Json(ValidateResponse {
        name: name.to_string(),
        valid,
    }))
}

pub async fn whoami(Authenticated(ctx): Authenticated) -> Json<WhoAmIResponse> {
    Json(ctx.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api;
    use crate::repos::{AccountRepo, Store};
    use crate::services::otp::OtpService;
    use crate::state::AppState;

    async fn app() -> Router {
        let store = Store::open("").await.unwrap();
        let otp = OtpService::new(Arc::new(AccountRepo::new(&store)), "otpd");
        api::v1::routes().with_state(AppState::new(Arc::new(otp)))
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let res = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn key_is_stable_per_name() {
        let app = app().await;
        let (status, first) = get(&app, "/key?name=alice").await;
        assert_eq!(status, StatusCode::OK);
        assert!(first["qr_code"].as_str().unwrap().starts_with("data:image/png;base64,"));

        let (_, second) = get(&app, "/key?name=alice").await;
        assert_eq!(first["otp"], second["otp"]);
    }

    #[tokio::test]
    async fn passcode_for_unknown_account_is_bad_request() {
        let app = app().await;
        let (status, body) = get(&app, "/passcode?name=ghost").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "no valid account found");
    }

    #[tokio::test]
    async fn validate_checks_inputs_then_code() {
        let app = app().await;

        let (status, body) = get(&app, "/validate?name=alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "the passcode cannot be empty");

        let (status, body) = get(&app, "/validate?passcode=123456").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "the name cannot be empty");

        let (status, _) = get(&app, "/validate?name=ghost&passcode=123456").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        get(&app, "/key?name=alice").await;
        let (_, body) = get(&app, "/passcode?name=alice").await;
        let code = body["passcode"].as_str().unwrap().to_string();

        let (status, body) = get(&app, &format!("/validate?name=alice&passcode={code}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (_, body) = get(&app, "/validate?name=alice&passcode=abcdef").await;
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn whoami_requires_authentication() {
        let app = app().await;
        let (status, body) = get(&app, "/whoami").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn account_names_with_colons_are_rejected() {
        let app = app().await;
        let (status, body) = get(&app, "/key?name=a:b").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ACCOUNT");
    }
}
