#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use medikart_client::{
    ClientConfig, MedikartClient, MemorySessionStore, SessionExpiredSink, SessionPersistence,
};

static TRACING: OnceLock<()> = OnceLock::new();

/// Route `tracing` output through the test harness, honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// In-process stand-in for the Medikart backend. One valid access token at a
/// time; the refresh endpoint rotates it and counts how often it was hit.
pub struct Backend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

pub struct BackendState {
    valid_access: Mutex<String>,
    valid_refresh: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    /// Reject every bearer token, even freshly rotated ones.
    pub reject_all_access: AtomicBool,
    /// Issue login sessions without a refresh token.
    pub omit_refresh_token: AtomicBool,
    /// Refresh handler sleeps this long before answering, giving concurrent
    /// 401s time to pile up behind the in-flight exchange.
    refresh_delay: Duration,
}

impl BackendState {
    /// Invalidate the access token the client currently holds without telling
    /// it, so its next request comes back 401.
    pub fn expire_access_token(&self) {
        *self.valid_access.lock().expect("lock") = "expired".to_string();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn session_payload(&self) -> Value {
        let mut payload = json!({
            "user_id": "u1",
            "full_name": "A",
            "email": "a@b.com",
            "role": "patient",
            "accessToken": self.valid_access.lock().expect("lock").clone(),
        });
        if !self.omit_refresh_token.load(Ordering::SeqCst) {
            payload["refreshToken"] =
                Value::String(self.valid_refresh.lock().expect("lock").clone());
        }
        payload
    }

    fn bearer_of(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<String, (StatusCode, Json<Value>)> {
        let presented = self.bearer_of(headers);
        let valid = self.valid_access.lock().expect("lock").clone();
        match presented {
            Some(token) if token == valid && !self.reject_all_access.load(Ordering::SeqCst) => {
                Ok(token)
            }
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "token expired"})),
            )),
        }
    }
}

pub async fn start_backend() -> Backend {
    start_backend_with_delay(Duration::from_millis(100)).await
}

pub async fn start_backend_with_delay(refresh_delay: Duration) -> Backend {
    init_tracing();
    let state = Arc::new(BackendState {
        valid_access: Mutex::new("t1".to_string()),
        valid_refresh: Mutex::new("r1".to_string()),
        refresh_calls: AtomicUsize::new(0),
        fail_refresh: AtomicBool::new(false),
        reject_all_access: AtomicBool::new(false),
        omit_refresh_token: AtomicBool::new(false),
        refresh_delay,
    });

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/profile", get(profile))
        .route("/cart", get(cart))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock backend");
    });

    Backend { addr, state }
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if body.get("password").and_then(Value::as_str) == Some("secret") {
        (StatusCode::OK, Json(state.session_payload()))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "invalid credentials"})),
        )
    }
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let call = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(state.refresh_delay).await;

    if state.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "refresh token expired"})),
        );
    }

    let presented = body.get("refreshToken").and_then(Value::as_str);
    let expected = state.valid_refresh.lock().expect("lock").clone();
    if presented != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "unknown refresh token"})),
        );
    }

    let access = format!("t{}", call + 1);
    let rotated = format!("r{}", call + 1);
    *state.valid_access.lock().expect("lock") = access.clone();
    *state.valid_refresh.lock().expect("lock") = rotated.clone();
    (
        StatusCode::OK,
        Json(json!({"accessToken": access, "refreshToken": rotated})),
    )
}

async fn logout() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({})))
}

/// Echoes back the bearer token it accepted, so tests can assert which token
/// a (re)played request actually carried.
async fn profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match state.authorize(&headers) {
        Ok(token) => (StatusCode::OK, Json(json!({"token_seen": token}))),
        Err(rejection) => rejection,
    }
}

async fn cart(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match state.authorize(&headers) {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "items": [
                    {"id": "ci1", "product_id": "p1", "name": "BP Monitor",
                     "quantity": 1, "unit_price_paise": 249900}
                ],
                "total_paise": 249900
            })),
        ),
        Err(rejection) => rejection,
    }
}

pub fn config_for(backend: &Backend) -> ClientConfig {
    ClientConfig::default().with_base_url(format!("http://{}", backend.addr))
}

pub fn client_for(backend: &Backend) -> MedikartClient {
    client_with_persistence(backend, Arc::new(MemorySessionStore::default()))
}

pub fn client_with_persistence(
    backend: &Backend,
    persistence: Arc<dyn SessionPersistence>,
) -> MedikartClient {
    MedikartClient::new(config_for(backend), persistence).expect("build client")
}

/// Records every session-expired notification instead of logging it.
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().expect("lock").clone()
    }
}

impl SessionExpiredSink for RecordingSink {
    fn on_session_expired(&self, sign_in_path: &str) {
        self.notifications
            .lock()
            .expect("lock")
            .push(sign_in_path.to_string());
    }
}

pub fn login_request() -> medikart_client::LoginRequest {
    medikart_client::LoginRequest {
        email: "a@b.com".to_string(),
        password: "secret".to_string(),
    }
}
