//! Handshake and session lifecycle tests

use pretty_assertions::assert_eq;

use realtime_hub::domain::{Credential, User};
use realtime_hub::shared::error::AppError;

use crate::common::TestApp;

#[tokio::test]
async fn test_valid_token_opens_session_and_marks_online() {
    let app = TestApp::new();
    let user = app.seed_user().await;

    let mut conn = app.connect(Some(&user.token)).await.unwrap();

    let welcome = conn.expect_event("auth_success").await;
    assert_eq!(welcome.data["success"], true);
    assert_eq!(welcome.data["data"]["session_id"], conn.id.as_str());
    assert_eq!(
        welcome.data["data"]["user"]["id"],
        format!("user:{}", user.user_id)
    );

    let session = app.state.sessions.require(&conn.id).unwrap();
    assert_eq!(session.user_id, user.user_id);
    assert_eq!(session.username, user.username);

    let stored = app.state.store.users.find_by_id(user.user_id).await.unwrap().unwrap();
    assert!(stored.is_online);
    assert!(stored.last_seen.is_some());
}

#[tokio::test]
async fn test_connection_without_token_is_refused() {
    let app = TestApp::new();
    let user = app.seed_user().await;

    let err = app.connect(None).await.err().unwrap();

    assert!(matches!(err, AppError::AuthenticationFailed(_)));
    assert_eq!(app.state.sessions.session_count(), 0);
    let stored = app.state.store.users.find_by_id(user.user_id).await.unwrap().unwrap();
    assert!(!stored.is_online);
}

#[tokio::test]
async fn test_garbage_token_is_refused() {
    let app = TestApp::new();
    let err = app.connect(Some("not.a.jwt")).await.err().unwrap();
    assert!(matches!(err, AppError::AuthenticationFailed(_)));
    assert_eq!(app.state.gateway.connection_count(), 0);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_refused() {
    let app = TestApp::new();
    let token = app.tokens.issue_access_token(424242, 1).unwrap();
    assert!(app.connect(Some(&token)).await.is_err());
}

#[tokio::test]
async fn test_deactivated_credential_is_refused() {
    let app = TestApp::new();
    app.state.store.users.insert(&User::new(7, "Dormant")).await.unwrap();
    let mut credential = Credential::new(70, 7, "dormant", "dormant@example.com");
    credential.is_active = false;
    app.state.store.credentials.insert(&credential).await.unwrap();
    let token = app.tokens.issue_access_token(7, 70).unwrap();

    assert!(app.connect(Some(&token)).await.is_err());
    assert_eq!(app.state.sessions.session_count(), 0);
}

#[tokio::test]
async fn test_credential_of_another_user_is_refused() {
    let app = TestApp::new();
    let owner = app.seed_user().await;
    let other = app.seed_user().await;
    let token = app
        .tokens
        .issue_access_token(other.user_id, owner.credential_id)
        .unwrap();

    assert!(app.connect(Some(&token)).await.is_err());
}

#[tokio::test]
async fn test_teardown_marks_offline_and_removes_session() {
    let app = TestApp::new();
    let (user, conn) = app.connect_new_user().await;

    app.disconnect(&conn).await;

    assert!(matches!(
        app.state.sessions.require(&conn.id),
        Err(AppError::Unauthenticated)
    ));
    let stored = app.state.store.users.find_by_id(user.user_id).await.unwrap().unwrap();
    assert!(!stored.is_online);
}

#[tokio::test]
async fn test_teardown_of_unknown_connection_is_noop() {
    let app = TestApp::new();
    app.state.sessions.teardown("never-connected").await;
    assert_eq!(app.state.sessions.session_count(), 0);
}

#[tokio::test]
async fn test_presence_change_is_announced_to_other_sessions() {
    let app = TestApp::new();
    let (_, mut observer) = app.connect_new_user().await;
    let (user, _conn) = app.connect_new_user().await;

    let expected = format!("user:{}", user.user_id);
    loop {
        // The observer also hears about its own presence first.
        let notice = observer.expect_event("update_notification").await;
        let data = &notice.data["data"];
        if data["id"] == expected.as_str() {
            assert_eq!(data["collection"], "user");
            assert_eq!(data["additional_data"]["is_online"], true);
            break;
        }
    }
}
