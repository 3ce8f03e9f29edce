//! Usage: Unified client error model (maps failures to `CODE: message` strings).

use std::sync::Arc;

pub type AppResult<T> = Result<T, AppError>;

/// Error codes callers branch on to tell failure classes apart.
pub mod codes {
    /// Bad credentials or a rejected handshake request.
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    /// The refresh exchange failed; the session is gone and the user must sign in again.
    pub const AUTH_RELOGIN_REQUIRED: &str = "AUTH_RELOGIN_REQUIRED";
    /// Transport-level failure (DNS, TLS, connect, read).
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// The backend rejected the request payload.
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    /// Session persistence read/write failure.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the session must be re-established before anything else succeeds.
    pub fn requires_relogin(&self) -> bool {
        self.code == codes::AUTH_RELOGIN_REQUIRED
    }
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(':')?;
    let code = maybe_code.trim();
    if code.is_empty() {
        return None;
    }
    let mut chars = code.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AppError::new(code.to_string(), message.to_string());
        }
        AppError::new(codes::INTERNAL_ERROR, value)
    }
}

impl From<&'static str> for AppError {
    fn from(value: &'static str) -> Self {
        AppError::from(value.to_string())
    }
}

impl From<AppError> for String {
    fn from(value: AppError) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_parses_coded_message() {
        let err = AppError::from("AUTH_FAILED: invalid credentials".to_string());
        assert_eq!(err.code(), codes::AUTH_FAILED);
        assert_eq!(err.message(), "invalid credentials");
    }

    #[test]
    fn from_string_without_code_falls_back_to_internal() {
        let err = AppError::from("something broke".to_string());
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
        assert_eq!(err.message(), "something broke");
    }

    #[test]
    fn lowercase_prefix_is_not_mistaken_for_a_code() {
        let err = AppError::from("failed: details".to_string());
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
    }

    #[test]
    fn requires_relogin_only_for_relogin_code() {
        assert!(AppError::new(codes::AUTH_RELOGIN_REQUIRED, "expired").requires_relogin());
        assert!(!AppError::new(codes::AUTH_FAILED, "nope").requires_relogin());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = AppError::new(codes::NETWORK_ERROR, "connect timed out");
        assert_eq!(err.to_string(), "NETWORK_ERROR: connect timed out");
    }
}
