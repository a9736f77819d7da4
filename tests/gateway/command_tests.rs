//! Command envelopes, acks and validation errors

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{category_ref, TestApp};

#[tokio::test]
async fn test_command_requires_authenticated_session() {
    let app = TestApp::new();
    let _outbox = app.state.gateway.register("anonymous");

    let reply = app
        .state
        .dispatcher
        .handle("anonymous", r#"{"event":"list_categories","ack":"a1"}"#)
        .await;

    assert_eq!(reply.event, "ack");
    assert_eq!(reply.ack, Some(json!("a1")));
    assert_eq!(reply.data["success"], false);
    assert_eq!(reply.data["error"]["code"], 10003);
    assert_eq!(reply.data["error"]["message"], "Authentication required");
}

#[tokio::test]
async fn test_ack_token_is_echoed_on_queued_reply() {
    let app = TestApp::new();
    let (_, mut conn) = app.connect_new_user().await;

    app.state
        .dispatcher
        .dispatch(&conn.id, r#"{"event":"list_categories","data":{},"ack":5}"#)
        .await;

    let reply = conn.expect_event("ack").await;
    assert_eq!(reply.ack, Some(json!(5)));
    assert_eq!(reply.data["success"], true);
    assert_eq!(reply.data["data"], json!([]));
}

#[tokio::test]
async fn test_reply_without_ack_is_system_frame() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let reply = app
        .state
        .dispatcher
        .handle(&conn.id, r#"{"event":"list_categories"}"#)
        .await;

    assert_eq!(reply.event, "system");
    assert_eq!(reply.ack, None);
    assert_eq!(reply.data["success"], true);
}

#[tokio::test]
async fn test_overlong_content_reports_field_error() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(
            &conn,
            "send_message",
            json!({"content": "x".repeat(4001), "send_to": "channel:10"}),
        )
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10007);
    assert_eq!(envelope["error"]["errors"]["content"][0]["type"], "length");
    assert_eq!(
        envelope["error"]["errors"]["content"][0]["msg"],
        "Content must be 1-4000 characters"
    );
}

#[tokio::test]
async fn test_message_to_unknown_channel_is_reference_error() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(&conn, "send_message", json!({"content": "hi", "send_to": "404"}))
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10001);
    assert_eq!(envelope["error"]["message"], "Channel not found");
}

#[tokio::test]
async fn test_bad_timeline_cursor_is_reported_at_until() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(
            &conn,
            "get_timeline",
            json!({"channel_id": "channel:10", "until": "yesterday"}),
        )
        .await;

    assert_eq!(envelope["error"]["code"], 10007);
    assert_eq!(
        envelope["error"]["errors"]["until"][0]["type"],
        "datetime_parsing"
    );
}

#[tokio::test]
async fn test_category_creation_notifies_other_connections() {
    let app = TestApp::new();
    let (_, mut observer) = app.connect_new_user().await;
    let (_, actor) = app.connect_new_user().await;

    let created = app
        .ok(&actor, "create_category", json!({"name": "Voice"}))
        .await;
    let id = created["id"].clone();
    assert!(id.as_str().is_some_and(|s| s.starts_with("category:")));

    loop {
        let frame = observer.expect_event("update_notification").await;
        let notice = &frame.data["data"];
        if notice["collection"] == "category" && notice["id"] == id {
            assert_eq!(notice["additional_data"]["action"], "created");
            break;
        }
    }
}

#[tokio::test]
async fn test_unknown_category_update_is_reference_error() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(
            &conn,
            "update_category",
            json!({"id": category_ref(999), "name": "Renamed"}),
        )
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10001);
}
