//! Event bus isolation with the production senders registered

use pretty_assertions::assert_eq;

use realtime_hub::application::dto::MessageDto;
use realtime_hub::application::events::{
    Collection, DomainEvent, HandlerOutcome, Topic, UpdateNotification,
};
use realtime_hub::domain::{CompositeId, EntityKind, Message, MessageType, RoomKey};
use realtime_hub::shared::error::AppError;

use crate::common::TestApp;

#[tokio::test]
async fn test_failing_handlers_do_not_block_room_delivery() {
    let app = TestApp::new();
    app.seed_channel(10, "general").await;
    let (_, mut member) = app.connect_new_user().await;
    app.state
        .rooms
        .join(&member.id, RoomKey::channel(10))
        .await
        .unwrap();

    let bus = &app.state.bus;
    bus.on(Topic::MessageCreation, "always_fails", |_| async {
        Err::<(), AppError>(AppError::Internal("boom".into()))
    });
    bus.on(Topic::MessageCreation, "panics", |_| async {
        let explode = true;
        if explode {
            panic!("handler bug");
        }
        Ok::<(), AppError>(())
    });

    let message = Message::new(1, MessageType::Text, "still here", 2, RoomKey::channel(10));
    let outcomes = bus
        .publish(DomainEvent::MessageCreated(MessageDto::from(&message)))
        .outcomes()
        .await;

    let names: Vec<&str> = outcomes.iter().map(HandlerOutcome::handler).collect();
    assert_eq!(names, vec!["room_sender", "always_fails", "panics"]);
    assert!(outcomes[0].is_completed());
    assert!(matches!(outcomes[1], HandlerOutcome::Failed { .. }));
    assert!(matches!(outcomes[2], HandlerOutcome::Panicked { .. }));

    let frame = member.expect_event("message").await;
    assert_eq!(frame.data["data"]["content"], "still here");
}

#[tokio::test]
async fn test_update_notification_reaches_every_authenticated_connection() {
    let app = TestApp::new();
    let (_, mut first) = app.connect_new_user().await;
    let (_, mut second) = app.connect_new_user().await;

    let id = CompositeId::new(EntityKind::Category, 77);
    let outcomes = app
        .state
        .bus
        .publish(DomainEvent::Updated(UpdateNotification::new(
            id,
            Collection::Category,
        )))
        .outcomes()
        .await;
    assert!(outcomes.iter().all(HandlerOutcome::is_completed));

    for conn in [&mut first, &mut second] {
        let frames = conn.drain();
        assert!(frames.iter().any(|f| {
            f.event == "update_notification" && f.data["data"]["id"] == "category:77"
        }));
    }
}

#[tokio::test]
async fn test_event_without_subscribers_is_dropped() {
    let app = TestApp::new();
    let bus = realtime_hub::application::events::EventBus::new();
    let message = Message::new(1, MessageType::Text, "nobody", 2, RoomKey::channel(10));

    let handle = bus.publish(DomainEvent::MessageDeleted(MessageDto::from(&message)));

    assert_eq!(handle.handler_count(), 0);
    assert!(handle.outcomes().await.is_empty());
    assert_eq!(app.state.bus.handler_count(Topic::MessageCreation), 1);
    assert_eq!(app.state.bus.handler_count(Topic::UpdateNotification), 1);
}
