mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use medikart_client::ApiRequest;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let backend = support::start_backend().await;
    let client = support::client_for(&backend);

    client
        .login(&support::login_request())
        .await
        .expect("login");
    assert_eq!(client.store().access_token().as_deref(), Some("t1"));

    backend.state.expire_access_token();

    let response = client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect("settled");
    assert!(response.is_success());
    let body: Value = response.value().expect("json");
    assert_eq!(body["token_seen"], "t2");

    assert_eq!(backend.state.refresh_calls(), 1);
    assert_eq!(client.store().access_token().as_deref(), Some("t2"));
    assert_eq!(client.store().refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh_exchange() {
    let backend = support::start_backend().await;
    let client = Arc::new(support::client_for(&backend));

    client
        .login(&support::login_request())
        .await
        .expect("login");
    backend.state.expire_access_token();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.execute(ApiRequest::get("/profile")).await
        }));
    }

    for handle in handles {
        let response = handle.await.expect("join").expect("settled");
        assert!(response.is_success());
        let body: Value = response.value().expect("json");
        assert_eq!(body["token_seen"], "t2");
    }

    assert_eq!(backend.state.refresh_calls(), 1);
    assert_eq!(client.store().access_token().as_deref(), Some("t2"));
}

#[tokio::test]
async fn replayed_request_is_never_refreshed_twice() {
    let backend = support::start_backend().await;
    let client = support::client_for(&backend);

    client
        .login(&support::login_request())
        .await
        .expect("login");
    // The backend now rejects every bearer token, including the rotated one:
    // the refresh succeeds but the replay still comes back 401.
    backend.state.reject_all_access.store(true, Ordering::SeqCst);

    let response = client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect("settled");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(backend.state.refresh_calls(), 1);

    // The rotated tokens are kept; only the backend keeps saying no.
    assert_eq!(client.store().access_token().as_deref(), Some("t2"));
}

#[tokio::test]
async fn refresh_keeps_user_identity_intact() {
    let backend = support::start_backend().await;
    let client = support::client_for(&backend);

    client
        .login(&support::login_request())
        .await
        .expect("login");
    let before = client.store().current_user().expect("user");

    backend.state.expire_access_token();
    client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect("settled");

    let after = client.store().current_user().expect("user");
    assert_eq!(after.id, before.id);
    assert_eq!(after.email, before.email);
    assert_eq!(after.role, before.role);
}

#[tokio::test]
async fn typed_calls_ride_through_a_refresh() {
    let backend = support::start_backend().await;
    let client = support::client_for(&backend);

    client
        .login(&support::login_request())
        .await
        .expect("login");
    backend.state.expire_access_token();

    let cart = client.cart().await.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_paise, 249_900);
    assert_eq!(backend.state.refresh_calls(), 1);
}
