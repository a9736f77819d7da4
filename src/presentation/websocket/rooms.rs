//! Room membership.
//!
//! A room is a named broadcast scope (`channel:<id>`). Membership is kept in
//! two maps, room to connections and connection to rooms, so teardown can
//! drop a connection from everything it joined without scanning all rooms.
//! Empty rooms are removed.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use super::gateway::Gateway;
use super::messages::OutboundFrame;
use crate::domain::{ChannelRepository, RoomKey, RoomKind};
use crate::shared::error::AppError;

pub struct RoomRegistry {
    members: DashMap<RoomKey, HashSet<String>>,
    memberships: DashMap<String, HashSet<RoomKey>>,
    channels: Arc<dyn ChannelRepository>,
    gateway: Arc<Gateway>,
}

impl RoomRegistry {
    pub fn new(channels: Arc<dyn ChannelRepository>, gateway: Arc<Gateway>) -> Self {
        Self {
            members: DashMap::new(),
            memberships: DashMap::new(),
            channels,
            gateway,
        }
    }

    /// Add a connection to a room after checking the room's entity exists
    /// and is not deleted. Joining twice is harmless.
    pub async fn join(&self, connection_id: &str, room: RoomKey) -> Result<(), AppError> {
        match room.kind() {
            RoomKind::Channel => match self.channels.find_by_id(room.id()).await? {
                Some(channel) if channel.is_live() => {}
                _ => return Err(AppError::not_found("Channel")),
            },
        }

        self.members
            .entry(room)
            .or_default()
            .insert(connection_id.to_string());
        self.memberships
            .entry(connection_id.to_string())
            .or_default()
            .insert(room);

        tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
        Ok(())
    }

    /// Remove a connection from a room. Leaving a room never joined is a
    /// no-op.
    pub fn leave(&self, connection_id: &str, room: RoomKey) {
        if let Some(mut members) = self.members.get_mut(&room) {
            members.remove(connection_id);
        }
        self.members.remove_if(&room, |_, members| members.is_empty());

        if let Some(mut rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(&room);
        }
        self.memberships
            .remove_if(connection_id, |_, rooms| rooms.is_empty());
    }

    /// Remove a connection from every room it joined.
    pub fn leave_all(&self, connection_id: &str) -> Vec<RoomKey> {
        let rooms: Vec<RoomKey> = self
            .memberships
            .remove(connection_id)
            .map(|(_, rooms)| rooms.into_iter().collect())
            .unwrap_or_default();

        for room in &rooms {
            if let Some(mut members) = self.members.get_mut(room) {
                members.remove(connection_id);
            }
            self.members.remove_if(room, |_, members| members.is_empty());
        }
        rooms
    }

    /// Deliver a frame to every member of a room. Returns how many
    /// connections accepted it.
    pub fn broadcast(&self, room: RoomKey, frame: &OutboundFrame) -> usize {
        let targets = self.members(room);
        let delivered = self.gateway.send_to_many(&targets, frame);
        tracing::debug!(room = %room, event = %frame.event, targets = targets.len(), delivered, "Room broadcast");
        delivered
    }

    pub fn members(&self, room: RoomKey) -> Vec<String> {
        self.members
            .get(&room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, connection_id: &str, room: RoomKey) -> bool {
        self.members
            .get(&room)
            .is_some_and(|m| m.contains(connection_id))
    }

    pub fn rooms_of(&self, connection_id: &str) -> Vec<RoomKey> {
        self.memberships
            .get(connection_id)
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
