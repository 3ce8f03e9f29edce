//! Usage: Authentication handshake endpoints (login, register, OTP verify/resend, logout).
//!
//! Handshake failures propagate directly; the refresh pipeline never runs for
//! these paths. Every successful handshake installs a full session in the
//! token store before returning.

pub(crate) mod role;

use serde::Serialize;
use serde_json::Value;

use crate::client::dispatcher::{parse_error_details, ApiRequest};
use crate::client::MedikartClient;
use crate::session::{AuthUser, Session};
use crate::shared::error::{codes, AppError, AppResult};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const VERIFY_CODE_PATH: &str = "/auth/verify-code";
const RESEND_CODE_PATH: &str = "/auth/resend-code";
const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

impl MedikartClient {
    /// Exchange credentials for a session. On success the token store holds
    /// the new session before this returns.
    pub async fn login(&self, credentials: &LoginRequest) -> AppResult<Session> {
        self.handshake(LOGIN_PATH, credentials).await
    }

    /// Create an account. The backend signs the user in as part of
    /// registration, so this installs a session exactly like `login`.
    pub async fn register(&self, registration: &RegisterRequest) -> AppResult<Session> {
        self.handshake(REGISTER_PATH, registration).await
    }

    /// Complete an OTP challenge.
    pub async fn verify_code(&self, verification: &VerifyCodeRequest) -> AppResult<Session> {
        self.handshake(VERIFY_CODE_PATH, verification).await
    }

    /// Ask the backend to send a fresh OTP.
    pub async fn resend_code(&self, email: &str) -> AppResult<()> {
        let request =
            ApiRequest::post_json(RESEND_CODE_PATH, &serde_json::json!({ "email": email }))?;
        self.execute(request)
            .await?
            .expect_success(codes::AUTH_FAILED)?;
        Ok(())
    }

    /// End the session. The store is cleared even when the backend call
    /// fails; a dead session on the server is harmless, a live one in the
    /// client is not.
    pub async fn logout(&self) -> AppResult<()> {
        let request = ApiRequest::post_json(LOGOUT_PATH, &serde_json::json!({}))?;
        let backend_result = self.execute(request).await;
        self.store().clear()?;
        if let Err(err) = backend_result {
            tracing::warn!(error = %err, "logout request failed after local session clear");
        }
        Ok(())
    }

    async fn handshake<T: Serialize>(&self, path: &str, payload: &T) -> AppResult<Session> {
        let request = ApiRequest::post_json(path, payload)?;
        let response = self.execute(request).await?;

        if !response.is_success() {
            let (_, message) = parse_error_details(&response.body);
            let detail = message.unwrap_or_else(|| {
                format!("handshake rejected with status={}", response.status.as_u16())
            });
            return Err(AppError::new(codes::AUTH_FAILED, detail));
        }

        let session = parse_session_payload(&response.value()?)?;
        self.store().set_session(session.clone())?;
        Ok(session)
    }
}

/// Parse the backend's handshake payload
/// (`{ user_id, full_name, email, role, accessToken, refreshToken? }`).
fn parse_session_payload(value: &Value) -> AppResult<Session> {
    let required = |key: &str| -> AppResult<String> {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::new(
                    codes::INTERNAL_ERROR,
                    format!("handshake response missing {key}"),
                )
            })
    };

    let role = value
        .get("role")
        .cloned()
        .ok_or_else(|| AppError::new(codes::INTERNAL_ERROR, "handshake response missing role"))?;
    let role = serde_json::from_value(role)
        .map_err(|e| format!("INTERNAL_ERROR: handshake response has unknown role: {e}"))?;

    let refresh_token = value
        .get("refreshToken")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(Session {
        access_token: required("accessToken")?,
        refresh_token,
        user: AuthUser {
            id: required("user_id")?,
            display_name: required("full_name")?,
            email: required("email")?,
            role,
        },
    })
}
