mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use medikart_client::{ApiRequest, MedikartClient, MemorySessionStore};

#[tokio::test]
async fn fatal_refresh_failure_rejects_group_and_ends_session() {
    let backend = support::start_backend().await;
    let sink = Arc::new(support::RecordingSink::default());
    let client = Arc::new(
        MedikartClient::with_sink(
            support::config_for(&backend),
            Arc::new(MemorySessionStore::default()),
            sink.clone(),
        )
        .expect("build client"),
    );

    client
        .login(&support::login_request())
        .await
        .expect("login");
    backend.state.fail_refresh.store(true, Ordering::SeqCst);
    backend.state.expire_access_token();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.execute(ApiRequest::get("/profile")).await
        }));
    }

    for handle in handles {
        let err = handle.await.expect("join").expect_err("rejected");
        assert!(err.requires_relogin(), "unexpected error: {err}");
    }

    // One exchange for the whole group, then the session is gone.
    assert_eq!(backend.state.refresh_calls(), 1);
    assert!(!client.store().is_authenticated());
    assert!(client.store().access_token().is_none());
    assert_eq!(sink.notifications(), vec!["/signin".to_string()]);
}

#[tokio::test]
async fn missing_refresh_token_makes_a_401_fatal() {
    let backend = support::start_backend().await;
    backend
        .state
        .omit_refresh_token
        .store(true, Ordering::SeqCst);

    let sink = Arc::new(support::RecordingSink::default());
    let client = MedikartClient::with_sink(
        support::config_for(&backend),
        Arc::new(MemorySessionStore::default()),
        sink.clone(),
    )
    .expect("build client");

    let session = client
        .login(&support::login_request())
        .await
        .expect("login");
    assert_eq!(session.refresh_token, None);

    backend.state.expire_access_token();

    // No refresh is possible, so the 401 surfaces and the session ends.
    let response = client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect("dispatched");
    assert_eq!(response.status.as_u16(), 401);
    assert_eq!(backend.state.refresh_calls(), 0);
    assert!(!client.store().is_authenticated());
    assert_eq!(sink.notifications(), vec!["/signin".to_string()]);
}

#[tokio::test]
async fn session_recovers_after_fresh_login() {
    let backend = support::start_backend().await;
    let client = support::client_for(&backend);

    client
        .login(&support::login_request())
        .await
        .expect("login");
    backend.state.fail_refresh.store(true, Ordering::SeqCst);
    backend.state.expire_access_token();

    let err = client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect_err("rejected");
    assert!(err.requires_relogin());
    assert!(!client.store().is_authenticated());

    // A new login issues a fresh session and requests work again.
    backend.state.fail_refresh.store(false, Ordering::SeqCst);
    client
        .login(&support::login_request())
        .await
        .expect("re-login");
    let response = client
        .execute(ApiRequest::get("/profile"))
        .await
        .expect("settled");
    assert!(response.is_success());
}
