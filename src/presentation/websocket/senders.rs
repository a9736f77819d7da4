//! Bus subscribers that deliver events to connections.
//!
//! Message events go to the room the message was addressed to. Update
//! notifications go to every authenticated connection.

use std::sync::Arc;

use async_trait::async_trait;

use super::gateway::Gateway;
use super::messages::{events, OutboundFrame};
use super::rooms::RoomRegistry;
use super::session::SessionManager;
use crate::application::dto::CommandResponse;
use crate::application::events::{DomainEvent, EventBus, EventHandler, Topic};
use crate::shared::error::AppError;

/// Broadcasts message events to the message's room.
pub struct RoomSender {
    rooms: Arc<RoomRegistry>,
}

impl RoomSender {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self { rooms }
    }
}

#[async_trait]
impl EventHandler for RoomSender {
    fn name(&self) -> &str {
        "room_sender"
    }

    async fn handle(&self, event: Arc<DomainEvent>) -> Result<(), AppError> {
        let (name, message) = match event.as_ref() {
            DomainEvent::MessageCreated(m) => (events::MESSAGE, m),
            DomainEvent::MessageUpdated(m) => (events::MESSAGE_UPDATE, m),
            DomainEvent::MessageDeleted(m) => (events::MESSAGE_DELETE, m),
            DomainEvent::Updated(_) => return Ok(()),
        };

        let response = CommandResponse::from_data(message)?;
        self.rooms
            .broadcast(message.sent_to, &OutboundFrame::envelope(name, &response));
        Ok(())
    }
}

/// Sends update notifications to every authenticated connection.
pub struct NotificationSender {
    sessions: Arc<SessionManager>,
    gateway: Arc<Gateway>,
}

impl NotificationSender {
    pub fn new(sessions: Arc<SessionManager>, gateway: Arc<Gateway>) -> Self {
        Self { sessions, gateway }
    }
}

#[async_trait]
impl EventHandler for NotificationSender {
    fn name(&self) -> &str {
        "notification_sender"
    }

    async fn handle(&self, event: Arc<DomainEvent>) -> Result<(), AppError> {
        let DomainEvent::Updated(notification) = event.as_ref() else {
            return Ok(());
        };

        let response = CommandResponse::from_data(notification)?;
        let frame = OutboundFrame::envelope(events::UPDATE_NOTIFICATION, &response);
        let targets = self.sessions.authenticated_connections();
        let delivered = self.gateway.send_to_many(&targets, &frame);
        tracing::debug!(
            collection = ?notification.collection,
            id = %notification.id,
            targets = targets.len(),
            delivered,
            "Update notification sent"
        );
        Ok(())
    }
}

/// Subscribe the senders to their topics.
pub fn register_senders(
    bus: &EventBus,
    rooms: Arc<RoomRegistry>,
    sessions: Arc<SessionManager>,
    gateway: Arc<Gateway>,
) {
    let room_sender: Arc<dyn EventHandler> = Arc::new(RoomSender::new(rooms));
    for topic in [Topic::MessageCreation, Topic::MessageUpdate, Topic::MessageDeletion] {
        bus.subscribe(topic, room_sender.clone());
    }
    bus.subscribe(
        Topic::UpdateNotification,
        Arc::new(NotificationSender::new(sessions, gateway)),
    );
}
