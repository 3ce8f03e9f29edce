//! Usage: Single owner of the current session (read access + three narrow mutations).

use std::sync::{Arc, Mutex};

use crate::session::persistence::SessionPersistence;
use crate::session::{AuthUser, Session};
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::security::mask_token;

/// Holds the current session and keeps the injected persistence in sync.
///
/// Mutations are atomic from the caller's perspective: persistence is written
/// first, and the in-memory state only commits when that write succeeded, so a
/// token is never observable without its user (or vice versa).
pub struct TokenStore {
    inner: Mutex<Option<Session>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl TokenStore {
    /// Construct the store, restoring any persisted session.
    pub fn open(persistence: Arc<dyn SessionPersistence>) -> AppResult<Self> {
        let restored = persistence.load()?;
        if let Some(session) = restored.as_ref() {
            tracing::debug!(
                user_id = %session.user.id,
                token = %mask_token(&session.access_token),
                "restored persisted session"
            );
        }
        Ok(Self {
            inner: Mutex::new(restored),
            persistence,
        })
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .lock_or_recover()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .lock_or_recover()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner
            .lock_or_recover()
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock_or_recover().is_some()
    }

    /// Install a freshly authenticated session (login, registration, OTP verify).
    pub fn set_session(&self, session: Session) -> AppResult<()> {
        let mut guard = self.inner.lock_or_recover();
        self.persistence.save(&session)?;
        tracing::info!(
            user_id = %session.user.id,
            role = ?session.user.role,
            token = %mask_token(&session.access_token),
            "session established"
        );
        *guard = Some(session);
        Ok(())
    }

    /// Rotate tokens after a successful refresh exchange. Never touches `user`.
    ///
    /// Only the refresh coordinator calls this.
    pub(crate) fn update_access_token(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> AppResult<()> {
        let mut guard = self.inner.lock_or_recover();
        let current = guard.as_ref().ok_or_else(|| {
            AppError::new(
                codes::AUTH_RELOGIN_REQUIRED,
                "cannot rotate tokens without an active session",
            )
        })?;

        let mut updated = current.clone();
        updated.access_token = access_token.to_string();
        if let Some(rotated) = refresh_token.map(str::trim).filter(|v| !v.is_empty()) {
            updated.refresh_token = Some(rotated.to_string());
        }

        self.persistence.save(&updated)?;
        tracing::debug!(
            token = %mask_token(access_token),
            rotated_refresh = refresh_token.is_some(),
            "access token rotated"
        );
        *guard = Some(updated);
        Ok(())
    }

    /// Drop the session everywhere: persisted state and memory.
    pub fn clear(&self) -> AppResult<()> {
        let mut guard = self.inner.lock_or_recover();
        self.persistence.clear()?;
        if guard.take().is_some() {
            tracing::info!("session cleared");
        }
        Ok(())
    }
}
