//! Room membership and message fan-out tests

use pretty_assertions::assert_eq;
use serde_json::json;

use realtime_hub::domain::RoomKey;

use crate::common::TestApp;

#[tokio::test]
async fn test_message_reaches_joined_connection_only() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, mut member) = app.connect_new_user().await;
    let (_, mut bystander) = app.connect_new_user().await;

    app.ok(&member, "join_room", json!({"room_type": "channel", "room_id": "10"}))
        .await;
    let sent = app
        .ok(
            &bystander,
            "send_message",
            json!({"content": "hello room", "send_to": "channel:10"}),
        )
        .await;

    let frame = member.expect_event("message").await;
    assert_eq!(frame.data["data"]["content"], "hello room");
    assert_eq!(frame.data["data"]["id"], sent["id"]);
    assert_eq!(frame.data["data"]["sent_to"], "channel:10");
    assert!(!bystander.received("message"));
}

#[tokio::test]
async fn test_teardown_drops_room_membership() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, mut member) = app.connect_new_user().await;
    let (_, sender) = app.connect_new_user().await;
    app.ok(&member, "join_room", json!({"room_type": "channel", "room_id": "10"}))
        .await;

    app.disconnect(&member).await;

    assert!(!app.state.rooms.is_member(&member.id, RoomKey::channel(10)));
    assert_eq!(app.state.rooms.room_count(), 0);

    app.ok(&sender, "send_message", json!({"content": "anyone?", "send_to": "10"}))
        .await;
    tokio::task::yield_now().await;
    assert!(!member.received("message"));
}

#[tokio::test]
async fn test_join_unknown_channel_is_rejected() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(&conn, "join_room", json!({"room_type": "channel", "room_id": "99"}))
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["message"], "Channel not found");
    assert_eq!(app.state.rooms.room_count(), 0);
}

#[tokio::test]
async fn test_join_non_channel_room_type_is_rejected() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let envelope = app
        .command(&conn, "join_room", json!({"room_type": "category", "room_id": "1"}))
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10001);
}

#[tokio::test]
async fn test_join_and_leave_are_idempotent() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, conn) = app.connect_new_user().await;
    let room = json!({"room_type": "channel", "room_id": "10"});

    app.ok(&conn, "join_room", room.clone()).await;
    app.ok(&conn, "join_room", room.clone()).await;
    assert_eq!(app.state.rooms.members(RoomKey::channel(10)).len(), 1);

    app.ok(&conn, "leave_room", room.clone()).await;
    app.ok(&conn, "leave_room", room).await;
    assert!(app.state.rooms.members(RoomKey::channel(10)).is_empty());
}

#[tokio::test]
async fn test_edit_and_delete_are_broadcast() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, mut author) = app.connect_new_user().await;
    app.ok(&author, "join_room", json!({"room_type": "channel", "room_id": "10"}))
        .await;

    let sent = app
        .ok(&author, "send_message", json!({"content": "draft", "send_to": "channel:10"}))
        .await;
    author.expect_event("message").await;

    app.ok(
        &author,
        "edit_message",
        json!({"message_id": sent["id"], "content": "final"}),
    )
    .await;
    let update = author.expect_event("message_update").await;
    assert_eq!(update.data["data"]["content"], "final");

    app.ok(&author, "delete_message", json!({"message_id": sent["id"]}))
        .await;
    let deletion = author.expect_event("message_delete").await;
    assert_eq!(deletion.data["data"]["is_deleted"], true);
}

#[tokio::test]
async fn test_only_the_author_may_edit() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, author) = app.connect_new_user().await;
    let (_, other) = app.connect_new_user().await;

    let sent = app
        .ok(&author, "send_message", json!({"content": "mine", "send_to": "channel:10"}))
        .await;
    let envelope = app
        .command(
            &other,
            "edit_message",
            json!({"message_id": sent["id"], "content": "hijacked"}),
        )
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10005);
}

#[tokio::test]
async fn test_timeline_pages_backwards() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, conn) = app.connect_new_user().await;
    for i in 0..3 {
        app.ok(
            &conn,
            "send_message",
            json!({"content": format!("m{}", i), "send_to": "channel:10"}),
        )
        .await;
    }

    let page = app
        .ok(
            &conn,
            "get_timeline",
            json!({"channel_id": "channel:10", "until": "2999-01-01", "amount": 2}),
        )
        .await;

    assert_eq!(page["timeline_length"], 2);
    let contents: Vec<&str> = page["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["m2", "m1"]);
}
