//! Category chain and channel ordering properties

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use serde_json::json;

use realtime_hub::domain::Category;
use realtime_hub::shared::error::AppError;

use crate::common::{category_ref, channel_ref, raw_id, TestApp};

/// Create categories in order; each lands at the tail.
async fn chain_of(app: &TestApp, names: &[&str]) -> Vec<i64> {
    let mut ids = Vec::new();
    for name in names {
        let category = app
            .state
            .chain
            .create_category(name.to_string(), None, None)
            .await
            .unwrap();
        ids.push(category.id);
    }
    ids
}

async fn next_of(app: &TestApp, id: i64) -> Option<i64> {
    app.category(id).await.next_category_id
}

/// Every live node has at most one predecessor and the walk from each
/// head terminates.
fn assert_well_formed(categories: &[Category]) {
    let mut targets = HashSet::new();
    for category in categories {
        if let Some(next) = category.next_category_id {
            assert!(targets.insert(next), "two categories point to {}", next);
            assert_ne!(next, category.id, "self loop at {}", category.id);
        }
    }
    for start in categories {
        let mut seen = HashSet::new();
        let mut cursor = Some(start.id);
        while let Some(id) = cursor {
            assert!(seen.insert(id), "cycle through {}", id);
            cursor = categories
                .iter()
                .find(|c| c.id == id)
                .and_then(|c| c.next_category_id);
        }
    }
}

async fn live(app: &TestApp) -> Vec<Category> {
    app.state.store.categories.find_live().await.unwrap()
}

#[tokio::test]
async fn test_create_appends_to_tail() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C"]).await;

    assert_eq!(next_of(&app, ids[0]).await, Some(ids[1]));
    assert_eq!(next_of(&app, ids[1]).await, Some(ids[2]));
    assert_eq!(next_of(&app, ids[2]).await, None);
}

#[tokio::test]
async fn test_relocate_tail_after_head() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C"]).await;
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    app.state.chain.relocate(c, Some(a)).await.unwrap();

    assert_eq!(next_of(&app, a).await, Some(c));
    assert_eq!(next_of(&app, c).await, Some(b));
    assert_eq!(next_of(&app, b).await, None);
    assert_well_formed(&live(&app).await);
}

#[tokio::test]
async fn test_relocate_to_head() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B"]).await;
    let (a, b) = (ids[0], ids[1]);

    app.state.chain.relocate(b, None).await.unwrap();

    let categories = live(&app).await;
    assert!(categories.iter().all(|c| c.next_category_id != Some(b)));
    assert_eq!(next_of(&app, a).await, None);
    assert_eq!(next_of(&app, b).await, Some(a));
    assert_well_formed(&categories);

    let order: Vec<i64> = app
        .state
        .chain
        .list_categories()
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(order, vec![b, a]);
}

#[tokio::test]
async fn test_relocate_to_current_position_changes_nothing() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C"]).await;
    let before = app.category(ids[1]).await;

    app.state.chain.relocate(ids[1], Some(ids[0])).await.unwrap();

    assert_eq!(app.category(ids[1]).await.updated_at, before.updated_at);
    assert_eq!(next_of(&app, ids[0]).await, Some(ids[1]));
}

#[tokio::test]
async fn test_relocate_after_itself_is_rejected() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B"]).await;

    let err = app.state.chain.relocate(ids[0], Some(ids[0])).await.unwrap_err();

    assert!(matches!(err, AppError::InvariantViolation(_)));
    assert_eq!(next_of(&app, ids[0]).await, Some(ids[1]));
}

#[tokio::test]
async fn test_relocate_after_deleted_category_is_rejected() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C"]).await;
    app.state.chain.remove_category(ids[2]).await.unwrap();

    let err = app.state.chain.relocate(ids[0], Some(ids[2])).await.unwrap_err();

    assert!(matches!(err, AppError::Reference(_)));
    assert_eq!(next_of(&app, ids[0]).await, Some(ids[1]));
}

#[tokio::test]
async fn test_concurrent_relocations_keep_chain_well_formed() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C", "D", "E"]).await;

    let moves = [
        (ids[4], Some(ids[0])),
        (ids[1], None),
        (ids[3], Some(ids[1])),
        (ids[0], Some(ids[2])),
        (ids[2], None),
    ];
    let tasks: Vec<_> = moves
        .into_iter()
        .map(|(target, prev)| {
            let chain = app.state.chain.clone();
            tokio::spawn(async move { chain.relocate(target, prev).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let categories = live(&app).await;
    assert_well_formed(&categories);
    let heads = categories
        .iter()
        .filter(|c| categories.iter().all(|o| o.next_category_id != Some(c.id)))
        .count();
    assert_eq!(heads, 1);
}

#[tokio::test]
async fn test_add_channel_twice_keeps_single_entry() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A"]).await;
    app.seed_channel(10, "general").await;

    app.state.chain.add_channel(ids[0], 10).await.unwrap();
    app.state.chain.add_channel(ids[0], 10).await.unwrap();

    assert_eq!(app.category(ids[0]).await.channels_order, vec![10]);
    assert_eq!(app.channel(10).await.category_id, Some(ids[0]));
}

#[tokio::test]
async fn test_moving_channel_between_categories() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["X", "Y"]).await;
    let (x, y) = (ids[0], ids[1]);
    app.seed_channel(10, "general").await;
    app.state.chain.add_channel(x, 10).await.unwrap();

    let placement = app.state.chain.add_channel(y, 10).await.unwrap();

    assert_eq!(placement.previous_category.map(|c| c.id), Some(x));
    let in_x = app.category(x).await.channels_order;
    let in_y = app.category(y).await.channels_order;
    assert!(in_x.is_empty());
    assert_eq!(in_y, vec![10]);
    assert_eq!(app.channel(10).await.category_id, Some(y));
}

#[tokio::test]
async fn test_reorder_channels_rejects_bad_lists_without_writing() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B"]).await;
    for (id, name) in [(10, "one"), (11, "two"), (12, "elsewhere")] {
        app.seed_channel(id, name).await;
    }
    app.state.chain.add_channel(ids[0], 10).await.unwrap();
    app.state.chain.add_channel(ids[0], 11).await.unwrap();
    app.state.chain.add_channel(ids[1], 12).await.unwrap();

    for bad in [vec![10, 10], vec![11, 12], vec![11]] {
        let err = app
            .state
            .chain
            .reorder_channels(ids[0], bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
        assert_eq!(app.category(ids[0]).await.channels_order, vec![10, 11]);
    }

    app.state.chain.reorder_channels(ids[0], vec![11, 10]).await.unwrap();
    assert_eq!(app.category(ids[0]).await.channels_order, vec![11, 10]);
}

#[tokio::test]
async fn test_delete_category_orphans_channels_and_splices_chain() {
    let app = TestApp::new();
    let ids = chain_of(&app, &["A", "B", "C"]).await;
    app.seed_channel(10, "general").await;
    app.state.chain.add_channel(ids[1], 10).await.unwrap();

    let removal = app.state.chain.remove_category(ids[1]).await.unwrap();

    assert_eq!(removal.orphaned_channels.len(), 1);
    assert_eq!(app.channel(10).await.category_id, None);
    assert!(app.category(ids[1]).await.is_deleted);
    assert_eq!(next_of(&app, ids[0]).await, Some(ids[2]));
    assert_well_formed(&live(&app).await);
}

#[tokio::test]
async fn test_chain_commands_over_the_gateway() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;

    let a = app.ok(&conn, "create_category", json!({"name": "A"})).await;
    let b = app.ok(&conn, "create_category", json!({"name": "B"})).await;
    let (a_id, b_id) = (raw_id(&a["id"]), raw_id(&b["id"]));

    let created = app
        .ok(
            &conn,
            "create_channel",
            json!({"name": "general", "category_id": category_ref(b_id)}),
        )
        .await;
    let channel_id = raw_id(&created["channel"]["id"]);
    assert_eq!(created["channel"]["category_id"], category_ref(b_id));
    assert_eq!(created["category"]["channels_order"], json!([channel_ref(channel_id)]));

    app.ok(
        &conn,
        "reorder_categories",
        json!({"target_category_id": category_ref(b_id)}),
    )
    .await;
    let listed = app.ok(&conn, "list_categories", json!(null)).await;
    let order: Vec<i64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| raw_id(&c["id"]))
        .collect();
    assert_eq!(order, vec![b_id, a_id]);

    let moved = app
        .ok(
            &conn,
            "add_channel_to_category",
            json!({"category_id": category_ref(a_id), "channel_id": channel_ref(channel_id)}),
        )
        .await;
    assert_eq!(moved["channel"]["category_id"], category_ref(a_id));
    assert!(app.category(b_id).await.channels_order.is_empty());

    let updated = app
        .ok(
            &conn,
            "update_category",
            json!({"id": category_ref(a_id), "name": "Renamed"}),
        )
        .await;
    assert_eq!(updated["name"], "Renamed");

    app.ok(&conn, "delete_category", json!({"id": category_ref(a_id)}))
        .await;
    assert_eq!(app.channel(channel_id).await.category_id, None);
}

#[tokio::test]
async fn test_channel_id_where_category_expected_is_rejected() {
    let app = TestApp::new();
    let (_, conn) = app.connect_new_user().await;
    app.seed_channel(10, "general").await;

    let envelope = app
        .command(
            &conn,
            "add_channel_to_category",
            json!({"category_id": "channel:10", "channel_id": "channel:10"}),
        )
        .await;

    assert_eq!(envelope["success"], false);
    assert_eq!(envelope["error"]["code"], 10001);
    assert_eq!(app.channel(10).await.category_id, None);
}
