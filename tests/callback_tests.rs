//! Integration tests for callback completion on page load and sign-out.

mod common;

use std::sync::Arc;

use common::{
    client_for, mount_code_exchange, query_value, MockHost, REDIRECT_URI, SILENT_REDIRECT_URI,
};
use synchive::auth::oidc::RequestKind;
use synchive::auth::{SessionEvent, SessionStatus};
use synchive::host::MemoryStore;
use synchive::AuthError;
use wiremock::MockServer;

/// Starts a top-level sign-in and returns the state it persisted.
async fn pending_state(client: &synchive::SynchiveClient, host: &MockHost) -> String {
    client.sign_in_redirect().await.unwrap();
    let (url, _) = host.navigations().pop().unwrap();
    query_value(&url, "state").unwrap()
}

#[tokio::test]
async fn test_initialize_completes_redirect_callback_and_scrubs_url() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, "abc", "redirect-token").await;
    let host = Arc::new(MockHost::top_level());
    let client = client_for(&server, Arc::clone(&host));
    let state = pending_state(&client, &host).await;

    host.set_location(&format!(
        "{REDIRECT_URI}?tab=settings&code=abc&state={state}&session_state=s1"
    ));
    let mut events = client.sessions().subscribe();
    client.initialize().await.unwrap();

    let session = client.user().unwrap().unwrap();
    assert_eq!(session.access_token, "redirect-token");
    assert_eq!(session.session_state.as_deref(), Some("s1"));
    assert_eq!(client.sessions().status(), SessionStatus::Authenticated);
    assert_eq!(
        host.replaced().last().unwrap().as_str(),
        format!("{REDIRECT_URI}?tab=settings")
    );
    assert!(host.pending_states().is_empty());
    assert!(matches!(events.recv().await.unwrap(), SessionEvent::UserLoaded(_)));
}

#[tokio::test]
async fn test_initialize_reads_callback_from_hash_route() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, "hashcode", "hash-token").await;
    let host = Arc::new(MockHost::top_level());
    let client = client_for(&server, Arc::clone(&host));
    let state = pending_state(&client, &host).await;

    host.set_location(&format!(
        "https://app.example.com/#/dashboard?code=hashcode&state={state}"
    ));
    client.initialize().await.unwrap();

    assert_eq!(client.user().unwrap().unwrap().access_token, "hash-token");
    assert_eq!(
        host.replaced().last().unwrap().as_str(),
        "https://app.example.com/#/dashboard"
    );
}

#[tokio::test]
async fn test_initialize_without_callback_is_noop() {
    let server = MockServer::start().await;
    let host = Arc::new(MockHost::top_level().at("https://app.example.com/home?tab=1"));
    let client = client_for(&server, Arc::clone(&host));

    client.initialize().await.unwrap();

    assert!(client.user().unwrap().is_none());
    assert!(host.replaced().is_empty());
    assert_eq!(client.sessions().status(), SessionStatus::NoSession);
}

#[tokio::test]
async fn test_provider_error_callback_fails_exchange() {
    let server = MockServer::start().await;
    let host = Arc::new(MockHost::top_level());
    let client = client_for(&server, Arc::clone(&host));
    let state = pending_state(&client, &host).await;

    host.set_location(&format!(
        "{REDIRECT_URI}?error=access_denied&error_description=nope&state={state}"
    ));
    let error = client.initialize().await.unwrap_err();

    match error {
        AuthError::CallbackExchange(e) => assert!(e.message.contains("access_denied")),
        other => panic!("expected callback exchange error, got {other:?}"),
    }
    assert!(client.user().unwrap().is_none());
    assert!(host.pending_states().is_empty());
}

#[tokio::test]
async fn test_unknown_state_on_top_level_page_fails() {
    let server = MockServer::start().await;
    let host = Arc::new(MockHost::top_level().at(&format!("{REDIRECT_URI}?code=x&state=stale")));
    let client = client_for(&server, Arc::clone(&host));

    let error = client.initialize().await.unwrap_err();

    assert!(matches!(error, AuthError::CallbackExchange(_)));
    assert!(!host.is_closed());
}

#[tokio::test]
async fn test_popup_with_lost_state_closes_itself() {
    let server = MockServer::start().await;
    let host = Arc::new(
        MockHost::top_level()
            .opened_by_another_window()
            .at(&format!("{REDIRECT_URI}?code=x&state=stale")),
    );
    let client = client_for(&server, Arc::clone(&host));

    client.initialize().await.unwrap();

    assert!(host.is_closed());
    assert!(client.user().unwrap().is_none());
}

#[tokio::test]
async fn test_popup_window_hands_callback_to_opener() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, "popup-code", "popup-token").await;
    let store = MemoryStore::new();

    // The framed opener starts a popup request.
    let opener_host = Arc::new(MockHost::framed().sharing_store(&store));
    let opener = client_for(&server, Arc::clone(&opener_host));
    let request = opener
        .sessions()
        .oidc()
        .create_signin_request(RequestKind::Popup)
        .await
        .unwrap();
    let state = query_value(&request, "state").unwrap();

    // The popup loads the callback.
    let callback = format!("{REDIRECT_URI}?code=popup-code&state={state}");
    let popup_host = Arc::new(
        MockHost::top_level()
            .opened_by_another_window()
            .sharing_store(&store)
            .at(&callback),
    );
    let popup = client_for(&server, Arc::clone(&popup_host));
    popup.initialize().await.unwrap();

    assert!(popup_host.is_closed());
    let notified = popup_host.notified();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].as_str(), callback);

    // The opener completes the exchange with the handed-over URL.
    let session = opener
        .sessions()
        .oidc()
        .process_signin_response(&notified[0])
        .await
        .unwrap();
    assert_eq!(session.access_token, "popup-token");
    assert!(opener_host.pending_states().is_empty());
}

#[tokio::test]
async fn test_silent_frame_hands_callback_to_embedding_window() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let parent_host = Arc::new(MockHost::top_level().sharing_store(&store));
    let parent = client_for(&server, Arc::clone(&parent_host));
    let request = parent
        .sessions()
        .oidc()
        .create_signin_request(RequestKind::Silent)
        .await
        .unwrap();
    let state = query_value(&request, "state").unwrap();

    let callback = format!("{SILENT_REDIRECT_URI}?code=silent-code&state={state}");
    let frame_host = Arc::new(MockHost::framed().sharing_store(&store).at(&callback));
    let frame = client_for(&server, Arc::clone(&frame_host));
    frame.initialize().await.unwrap();

    let notified = frame_host.notified();
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].as_str(), callback);
    assert!(!frame_host.is_closed());
    assert_eq!(
        frame_host.replaced().last().unwrap().as_str(),
        SILENT_REDIRECT_URI
    );
    // The embedding window still owns the exchange.
    assert_eq!(parent_host.pending_states().len(), 1);
    assert!(frame.user().unwrap().is_none());
}

#[tokio::test]
async fn test_sign_out_navigates_to_end_session_and_completes() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, "abc", "redirect-token").await;
    let host = Arc::new(MockHost::top_level());
    let client = client_for(&server, Arc::clone(&host));
    let state = pending_state(&client, &host).await;
    host.set_location(&format!("{REDIRECT_URI}?code=abc&state={state}"));
    client.initialize().await.unwrap();
    let id_token = client.user().unwrap().unwrap().id_token.unwrap();

    client.sign_out().await.unwrap();

    assert!(client.user().unwrap().is_none());
    let (url, _) = host.navigations().pop().unwrap();
    assert!(url.as_str().starts_with(&format!("{}/logout?", server.uri())));
    assert_eq!(query_value(&url, "id_token_hint"), Some(id_token));
    assert_eq!(
        query_value(&url, "post_logout_redirect_uri").as_deref(),
        Some("https://app.example.com/")
    );

    // The provider returns with the sign-out state.
    let signout_state = query_value(&url, "state").unwrap();
    host.set_location(&format!("https://app.example.com/?state={signout_state}"));
    let mut events = client.sessions().subscribe();
    client.initialize().await.unwrap();

    assert!(matches!(events.recv().await.unwrap(), SessionEvent::UserSignedOut));
    assert_eq!(host.replaced().last().unwrap().as_str(), "https://app.example.com/");
    assert!(host.pending_states().is_empty());
}
