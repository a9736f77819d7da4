//! Role commands end to end

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{raw_id, role_ref, TestApp};

#[tokio::test]
async fn test_role_lifecycle() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let role = app
        .ok(
            &conn,
            "create_role",
            json!({
                "name": "moderator",
                "description": "keeps the peace",
                "permissions": [{"type": "manage_messages", "is_allowed": true}]
            }),
        )
        .await;
    let id = raw_id(&role["id"]);

    let role = app
        .ok(
            &conn,
            "add_permission_to_role",
            json!({
                "role_id": role_ref(id),
                "permission": {"type": "timeout_users", "is_allowed": false}
            }),
        )
        .await;
    assert_eq!(role["permissions"].as_array().unwrap().len(), 2);

    let role = app
        .ok(&conn, "update_role", json!({"id": role_ref(id), "name": "mod"}))
        .await;
    assert_eq!(role["name"], "mod");
    assert_eq!(role["description"], "keeps the peace");

    app.ok(&conn, "delete_role", json!({"id": role_ref(id)})).await;
    let listed = app.ok(&conn, "get_roles", json!({})).await;
    assert_eq!(listed["roles_count"], 0);
    let listed = app
        .ok(&conn, "get_roles", json!({"include_deleted": true}))
        .await;
    assert_eq!(listed["roles_count"], 1);

    app.ok(&conn, "restore_role", json!({"id": role_ref(id)}))
        .await;
    let role = app.ok(&conn, "get_role", json!({"id": role_ref(id)})).await;
    assert_eq!(role["name"], "mod");
}

#[tokio::test]
async fn test_duplicate_permission_is_rejected() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;
    let role = app
        .ok(
            &conn,
            "create_role",
            json!({
                "name": "moderator",
                "permissions": [{"type": "manage_channels", "is_allowed": true}]
            }),
        )
        .await;

    let envelope = app
        .command(
            &conn,
            "add_permission_to_role",
            json!({
                "role_id": role["id"],
                "permission": {"type": "manage_channels", "is_allowed": false}
            }),
        )
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10005);
}

#[tokio::test]
async fn test_permissions_cleared_with_empty_list() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;
    let role = app
        .ok(
            &conn,
            "create_role",
            json!({
                "name": "moderator",
                "permissions": [{"type": "manage_channels", "is_allowed": true}]
            }),
        )
        .await;

    let role = app
        .ok(
            &conn,
            "update_permission_of_role",
            json!({"id": role["id"], "permissions": []}),
        )
        .await;
    assert_eq!(role["permissions"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_restoring_live_role_fails() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;
    let role = app.ok(&conn, "create_role", json!({"name": "member"})).await;

    let envelope = app
        .command(&conn, "restore_role", json!({"id": role["id"]}))
        .await;
    assert_eq!(envelope["error"]["message"], "Role is not deleted");
}
