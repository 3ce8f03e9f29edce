//! Usage: The constructed client context: config + token store + dispatcher + refresh.

pub(crate) mod config;
pub(crate) mod dispatcher;
pub(crate) mod refresh;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

use crate::client::config::ClientConfig;
use crate::client::dispatcher::{is_handshake_path, ApiRequest, ApiResponse, RequestDispatcher};
use crate::client::refresh::{LoggingSessionExpiredSink, RefreshCoordinator, SessionExpiredSink};
use crate::payments::registry::PaymentProviderRegistry;
use crate::session::persistence::SessionPersistence;
use crate::session::store::TokenStore;
use crate::shared::error::AppResult;

/// One explicitly constructed context owning every shared piece of client
/// state. Embedders build it at startup and pass it around; nothing here is
/// an ambient global.
pub struct MedikartClient {
    config: ClientConfig,
    store: Arc<TokenStore>,
    dispatcher: Arc<RequestDispatcher>,
    refresh: Arc<RefreshCoordinator>,
    payments: PaymentProviderRegistry,
}

impl MedikartClient {
    pub fn new(config: ClientConfig, persistence: Arc<dyn SessionPersistence>) -> AppResult<Self> {
        Self::with_sink(config, persistence, Arc::new(LoggingSessionExpiredSink))
    }

    pub fn with_sink(
        mut config: ClientConfig,
        persistence: Arc<dyn SessionPersistence>,
        sink: Arc<dyn SessionExpiredSink>,
    ) -> AppResult<Self> {
        config::sanitize(&mut config);

        // Cookies always travel with requests so the cookie-based refresh
        // channel works alongside the Authorization header.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_seconds as u64))
            .build()
            .map_err(|e| format!("INTERNAL_ERROR: failed to build http client: {e}"))?;

        let store = Arc::new(TokenStore::open(persistence)?);
        let dispatcher = Arc::new(RequestDispatcher::new(http.clone(), &config, store.clone()));
        let refresh = Arc::new(RefreshCoordinator::new(
            store.clone(),
            dispatcher.clone(),
            http,
            config.sign_in_path.clone(),
            sink,
        ));
        let payments = PaymentProviderRegistry::new(&config);

        Ok(Self {
            config,
            store,
            dispatcher,
            refresh,
            payments,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn payments(&self) -> &PaymentProviderRegistry {
        &self.payments
    }

    /// Send a request through the authenticated pipeline.
    ///
    /// Responses pass through unchanged except for one case: a 401 on a
    /// non-handshake request that has not been replayed yet and belongs to a
    /// session holding a refresh token. That request joins the refresh queue
    /// and settles when the (single) refresh exchange does.
    pub async fn execute(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let response = self.dispatcher.send(&request).await?;

        if response.status != StatusCode::UNAUTHORIZED
            || request.retried
            || is_handshake_path(&request.path)
        {
            return Ok(response);
        }
        if self.store.refresh_token().is_none() {
            // A rejected token with no refresh token is unrecoverable: the
            // session is dead. Anonymous 401s just pass through.
            if self.store.is_authenticated() {
                tracing::warn!(
                    path = %request.path,
                    "token rejected with no refresh token available; ending session"
                );
                self.refresh.expire_session();
            }
            return Ok(response);
        }

        tracing::debug!(path = %request.path, "authorization failure; joining refresh queue");
        self.refresh.join(request.mark_retried()).await
    }
}
