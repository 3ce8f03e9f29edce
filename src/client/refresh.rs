//! Usage: Single-flight token refresh coordination.
//!
//! At most one refresh exchange is outstanding per session. Requests that fail
//! authorization while an exchange is in flight are queued and settled together
//! when it completes: replayed with the new token on success, rejected as a
//! group on failure. A failed exchange ends the session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::client::dispatcher::{
    parse_error_details, sanitize_body_snippet, ApiRequest, ApiResponse, RequestDispatcher,
    REFRESH_PATH,
};
use crate::session::store::TokenStore;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::security::mask_token;

/// Notified when a refresh failure destroys the session. The hosting
/// environment decides how to move the user to the sign-in entry point; the
/// default sink only logs.
pub trait SessionExpiredSink: Send + Sync {
    fn on_session_expired(&self, sign_in_path: &str);
}

pub struct LoggingSessionExpiredSink;

impl SessionExpiredSink for LoggingSessionExpiredSink {
    fn on_session_expired(&self, sign_in_path: &str) {
        tracing::warn!(sign_in_path, "session expired; host should redirect to sign-in");
    }
}

#[derive(Debug, Clone)]
struct RefreshedTokens {
    access_token: String,
    refresh_token: Option<String>,
}

struct PendingEntry {
    request: ApiRequest,
    tx: oneshot::Sender<AppResult<ApiResponse>>,
}

#[derive(Default)]
struct CoordinatorState {
    refreshing: bool,
    queue: VecDeque<PendingEntry>,
}

pub(crate) struct RefreshCoordinator {
    state: Mutex<CoordinatorState>,
    store: Arc<TokenStore>,
    dispatcher: Arc<RequestDispatcher>,
    http: reqwest::Client,
    sign_in_path: String,
    sink: Arc<dyn SessionExpiredSink>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        store: Arc<TokenStore>,
        dispatcher: Arc<RequestDispatcher>,
        http: reqwest::Client,
        sign_in_path: String,
        sink: Arc<dyn SessionExpiredSink>,
    ) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            store,
            dispatcher,
            http,
            sign_in_path,
            sink,
        }
    }

    /// Queue a request that just failed authorization and wait for the shared
    /// outcome. The first caller to arrive while idle drives the exchange; its
    /// own request settles through the same queue drain as everyone else's.
    pub(crate) async fn join(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        let drive = {
            let mut state = self.state.lock_or_recover();
            state.queue.push_back(PendingEntry { request, tx });
            if state.refreshing {
                false
            } else {
                state.refreshing = true;
                true
            }
        };

        if drive {
            self.run_refresh_cycle().await;
        }

        rx.await.map_err(|_| {
            AppError::new(
                codes::INTERNAL_ERROR,
                "refresh coordinator dropped a queued request",
            )
        })?
    }

    async fn run_refresh_cycle(&self) {
        let outcome = match self.exchange_refresh_token().await {
            Ok(tokens) => self
                .store
                .update_access_token(&tokens.access_token, tokens.refresh_token.as_deref())
                .map(|()| tokens),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(tokens) => {
                tracing::info!(
                    token = %mask_token(&tokens.access_token),
                    "refresh exchange succeeded; replaying queued requests"
                );
                self.drain_with_replay().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh exchange failed; ending session");
                self.expire_session();
                self.drain_with_rejection(err);
            }
        }
    }

    /// Replay queued requests in FIFO order with the rotated token. Entries
    /// that arrive mid-drain are picked up before the coordinator goes idle.
    async fn drain_with_replay(&self) {
        loop {
            let entry = {
                let mut state = self.state.lock_or_recover();
                match state.queue.pop_front() {
                    Some(entry) => entry,
                    None => {
                        state.refreshing = false;
                        break;
                    }
                }
            };
            let result = self.dispatcher.send(&entry.request).await;
            // Receiver may have been dropped by an abandoned caller.
            let _ = entry.tx.send(result);
        }
    }

    /// Destroy the session: clear the store (best-effort) and tell the host
    /// to move the user to sign-in.
    pub(crate) fn expire_session(&self) {
        if let Err(clear_err) = self.store.clear() {
            tracing::warn!(error = %clear_err, "failed to clear expired session");
        }
        self.sink.on_session_expired(&self.sign_in_path);
    }

    fn drain_with_rejection(&self, err: AppError) {
        let drained = {
            let mut state = self.state.lock_or_recover();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };
        for entry in drained {
            let _ = entry.tx.send(Err(err.clone()));
        }
    }

    /// Issue the one refresh exchange. Goes straight through the HTTP client,
    /// not the dispatcher, so its own 401 can never recurse into another refresh.
    async fn exchange_refresh_token(&self) -> AppResult<RefreshedTokens> {
        let refresh_token = self.store.refresh_token().ok_or_else(|| {
            AppError::new(
                codes::AUTH_RELOGIN_REQUIRED,
                "no refresh token available for exchange",
            )
        })?;

        let response = self
            .http
            .post(self.dispatcher.url_for(REFRESH_PATH))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    codes::NETWORK_ERROR,
                    format!("refresh exchange request failed: {e}"),
                    e,
                )
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            AppError::with_source(
                codes::NETWORK_ERROR,
                format!("failed to read refresh exchange response: {e}"),
                e,
            )
        })?;

        if !status.is_success() {
            let (_, message) = parse_error_details(&body);
            let detail = message.unwrap_or_else(|| sanitize_body_snippet(&body));
            return Err(AppError::new(
                codes::AUTH_RELOGIN_REQUIRED,
                format!(
                    "refresh endpoint returned status={}: {detail}",
                    status.as_u16()
                ),
            ));
        }

        parse_refresh_payload(&body)
    }
}

fn parse_refresh_payload(body: &[u8]) -> AppResult<RefreshedTokens> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| format!("AUTH_RELOGIN_REQUIRED: refresh response json invalid: {e}"))?;

    let access_token = ["accessToken", "access_token"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::new(
                codes::AUTH_RELOGIN_REQUIRED,
                "refresh response missing accessToken",
            )
        })?
        .to_string();

    let refresh_token = ["refreshToken", "refresh_token"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(RefreshedTokens {
        access_token,
        refresh_token,
    })
}
