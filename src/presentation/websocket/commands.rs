//! Command dispatch.
//!
//! Every inbound frame after the handshake is a command. The dispatcher
//! checks the session, decodes and validates the payload, runs the
//! command against the services and answers on the same connection with a
//! `{success, data, error}` envelope. Successful mutations publish events
//! on the bus; delivery to other connections is left to the senders.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use validator::Validate;

use super::gateway::Gateway;
use super::messages::{InboundFrame, OutboundFrame};
use super::rooms::RoomRegistry;
use super::session::{Session, SessionManager};
use crate::application::dto::{
    AddChannelToCategoryRequest, AddPermissionToRoleRequest, CategoryChannelDto, CategoryDto,
    ChannelDto, CommandResponse, CreateCategoryRequest, CreateChannelRequest, CreateRoleRequest,
    DeleteCategoryRequest, DeleteMessageRequest, EditMessageRequest, ListRolesRequest, MessageDto,
    ReorderCategoriesRequest, ReorderCategoryChannelsRequest, RoleDto, RoleIdRequest, RoleListDto,
    RoomRequest, SendMessageRequest, TimelineDto, TimelineRequest, UpdateCategoryRequest,
    UpdateRolePermissionsRequest, UpdateRoleRequest,
};
use crate::application::events::{Collection, DomainEvent, EventBus, UpdateNotification};
use crate::application::services::{
    parse_until, ChainCoordinator, ChannelService, CreateChannelDto, MessageService, RoleChanges,
    RoleService,
};
use crate::domain::{Category, Channel, CompositeId, EntityKind, RoomKey};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::validation::FieldErrorTree;

/// Commands accepted from authenticated connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    JoinRoom,
    LeaveRoom,
    SendMessage,
    EditMessage,
    DeleteMessage,
    GetTimeline,
    CreateChannel,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    ReorderCategories,
    ReorderCategoryChannels,
    AddChannelToCategory,
    ListCategories,
    CreateRole,
    UpdateRole,
    DeleteRole,
    GetRoles,
    GetRole,
    RestoreRole,
    AddPermissionToRole,
    UpdatePermissionOfRole,
}

impl Command {
    pub fn parse(event: &str) -> Option<Self> {
        let command = match event {
            "join_room" => Self::JoinRoom,
            "leave_room" => Self::LeaveRoom,
            "send_message" => Self::SendMessage,
            "edit_message" => Self::EditMessage,
            "delete_message" => Self::DeleteMessage,
            "get_timeline" => Self::GetTimeline,
            "create_channel" => Self::CreateChannel,
            "create_category" => Self::CreateCategory,
            "update_category" => Self::UpdateCategory,
            "delete_category" => Self::DeleteCategory,
            "reorder_categories" => Self::ReorderCategories,
            "reorder_category_channels" => Self::ReorderCategoryChannels,
            "add_channel_to_category" => Self::AddChannelToCategory,
            "list_categories" => Self::ListCategories,
            "create_role" => Self::CreateRole,
            "update_role" => Self::UpdateRole,
            "delete_role" => Self::DeleteRole,
            "get_roles" => Self::GetRoles,
            "get_role" => Self::GetRole,
            "restore_role" => Self::RestoreRole,
            "add_permission_to_role" => Self::AddPermissionToRole,
            "update_permission_of_role" => Self::UpdatePermissionOfRole,
            _ => return None,
        };
        Some(command)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::SendMessage => "send_message",
            Self::EditMessage => "edit_message",
            Self::DeleteMessage => "delete_message",
            Self::GetTimeline => "get_timeline",
            Self::CreateChannel => "create_channel",
            Self::CreateCategory => "create_category",
            Self::UpdateCategory => "update_category",
            Self::DeleteCategory => "delete_category",
            Self::ReorderCategories => "reorder_categories",
            Self::ReorderCategoryChannels => "reorder_category_channels",
            Self::AddChannelToCategory => "add_channel_to_category",
            Self::ListCategories => "list_categories",
            Self::CreateRole => "create_role",
            Self::UpdateRole => "update_role",
            Self::DeleteRole => "delete_role",
            Self::GetRoles => "get_roles",
            Self::GetRole => "get_role",
            Self::RestoreRole => "restore_role",
            Self::AddPermissionToRole => "add_permission_to_role",
            Self::UpdatePermissionOfRole => "update_permission_of_role",
        }
    }
}

pub struct CommandDispatcher {
    sessions: Arc<SessionManager>,
    rooms: Arc<RoomRegistry>,
    gateway: Arc<Gateway>,
    bus: Arc<EventBus>,
    chain: Arc<ChainCoordinator>,
    channels: Arc<dyn ChannelService>,
    messages: Arc<dyn MessageService>,
    roles: Arc<dyn RoleService>,
}

impl CommandDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<SessionManager>,
        rooms: Arc<RoomRegistry>,
        gateway: Arc<Gateway>,
        bus: Arc<EventBus>,
        chain: Arc<ChainCoordinator>,
        channels: Arc<dyn ChannelService>,
        messages: Arc<dyn MessageService>,
        roles: Arc<dyn RoleService>,
    ) -> Self {
        Self {
            sessions,
            rooms,
            gateway,
            bus,
            chain,
            channels,
            messages,
            roles,
        }
    }

    /// Handle one text frame and queue the result for the connection.
    pub async fn dispatch(&self, connection_id: &str, text: &str) {
        let reply = self.handle(connection_id, text).await;
        self.gateway.send_to(connection_id, reply);
    }

    /// Handle one text frame and return the reply frame.
    pub async fn handle(&self, connection_id: &str, text: &str) -> OutboundFrame {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                let error = AppError::Validation(FieldErrorTree::from_deserialize_error(&e));
                return OutboundFrame::command_result(None, &CommandResponse::err(&error));
            }
        };

        let started = Instant::now();
        let label = Command::parse(&frame.event).map_or("unknown", |c| c.as_str());
        let result = self.execute(connection_id, &frame).await;

        match &result {
            Ok(_) => {
                tracing::debug!(connection_id = %connection_id, command = label, "Command succeeded")
            }
            Err(e) if e.is_store_failure() => {
                tracing::error!(connection_id = %connection_id, command = label, error = %e, "Command failed")
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, command = label, error = %e, "Command rejected")
            }
        }
        metrics::record_command(label, result.is_ok(), started.elapsed().as_secs_f64());

        OutboundFrame::command_result(frame.ack, &CommandResponse::from_result(result))
    }

    async fn execute(&self, connection_id: &str, frame: &InboundFrame) -> Result<Value, AppError> {
        let session = self.sessions.require(connection_id)?;
        let command = Command::parse(&frame.event).ok_or_else(|| {
            let mut tree = FieldErrorTree::default();
            tree.push(&["event"], format!("unknown command '{}'", frame.event), "unknown_command");
            AppError::Validation(tree)
        })?;
        let data = frame.data.clone();

        match command {
            Command::JoinRoom => self.join_room(connection_id, data).await,
            Command::LeaveRoom => self.leave_room(connection_id, data),
            Command::SendMessage => self.send_message(&session, data).await,
            Command::EditMessage => self.edit_message(&session, data).await,
            Command::DeleteMessage => self.delete_message(&session, data).await,
            Command::GetTimeline => self.get_timeline(data).await,
            Command::CreateChannel => self.create_channel(data).await,
            Command::CreateCategory => self.create_category(data).await,
            Command::UpdateCategory => self.update_category(data).await,
            Command::DeleteCategory => self.delete_category(data).await,
            Command::ReorderCategories => self.reorder_categories(data).await,
            Command::ReorderCategoryChannels => self.reorder_category_channels(data).await,
            Command::AddChannelToCategory => self.add_channel_to_category(data).await,
            Command::ListCategories => self.list_categories().await,
            Command::CreateRole => self.create_role(data).await,
            Command::UpdateRole => self.update_role(data).await,
            Command::DeleteRole => self.delete_role(data).await,
            Command::GetRoles => self.get_roles(data).await,
            Command::GetRole => self.get_role(data).await,
            Command::RestoreRole => self.restore_role(data).await,
            Command::AddPermissionToRole => self.add_permission_to_role(data).await,
            Command::UpdatePermissionOfRole => self.update_permission_of_role(data).await,
        }
    }

    async fn join_room(&self, connection_id: &str, data: Value) -> Result<Value, AppError> {
        let request: RoomRequest = parse_payload(data)?;
        let room = RoomKey::from_parts(&request.room_type, &request.room_id)?;
        self.rooms.join(connection_id, room).await?;
        Ok(json!({ "room": room }))
    }

    fn leave_room(&self, connection_id: &str, data: Value) -> Result<Value, AppError> {
        let request: RoomRequest = parse_payload(data)?;
        let room = RoomKey::from_parts(&request.room_type, &request.room_id)?;
        self.rooms.leave(connection_id, room);
        Ok(json!({ "room": room }))
    }

    async fn send_message(&self, session: &Session, data: Value) -> Result<Value, AppError> {
        let request: SendMessageRequest = parse_payload(data)?;
        let room = parse_recipient(&request.send_to)?;
        let message = self
            .messages
            .send_message(session.user_id, room, request.message_type, request.content)
            .await?;

        let dto = MessageDto::from(&message);
        let _ = self.bus.publish(DomainEvent::MessageCreated(dto.clone()));
        to_value(&dto)
    }

    async fn edit_message(&self, session: &Session, data: Value) -> Result<Value, AppError> {
        let request: EditMessageRequest = parse_payload(data)?;
        let message_id = CompositeId::expect(&request.message_id, EntityKind::Message)?;
        let message = self
            .messages
            .edit_message(message_id, session.user_id, request.content)
            .await?;

        let dto = MessageDto::from(&message);
        let _ = self.bus.publish(DomainEvent::MessageUpdated(dto.clone()));
        to_value(&dto)
    }

    async fn delete_message(&self, session: &Session, data: Value) -> Result<Value, AppError> {
        let request: DeleteMessageRequest = parse_payload(data)?;
        let message_id = CompositeId::expect(&request.message_id, EntityKind::Message)?;
        let message = self
            .messages
            .delete_message(message_id, session.user_id)
            .await?;

        let dto = MessageDto::from(&message);
        let _ = self.bus.publish(DomainEvent::MessageDeleted(dto.clone()));
        to_value(&dto)
    }

    async fn get_timeline(&self, data: Value) -> Result<Value, AppError> {
        let request: TimelineRequest = parse_payload(data)?;
        let channel_id = CompositeId::expect(&request.channel_id, EntityKind::Channel)?;
        let until = parse_until(&request.until)?;
        let messages = self
            .messages
            .timeline(RoomKey::channel(channel_id), until, request.amount as usize)
            .await?;
        to_value(&TimelineDto::new(&messages))
    }

    async fn create_channel(&self, data: Value) -> Result<Value, AppError> {
        let request: CreateChannelRequest = parse_payload(data)?;
        let category_id = request
            .category_id
            .as_deref()
            .map(|id| CompositeId::expect(id, EntityKind::Category))
            .transpose()?;

        let created = self
            .channels
            .create_channel(CreateChannelDto {
                name: request.name,
                description: request.description,
                channel_type: request.channel_type,
                category_id,
            })
            .await?;

        self.notify_channel(&created.channel, "created");
        let category = match &created.placement {
            Some(placement) => {
                self.notify_category(&placement.category, "channel_added");
                Some(CategoryDto::from(&placement.category))
            }
            None => None,
        };
        let channel = created
            .placement
            .as_ref()
            .map_or(&created.channel, |p| &p.channel);

        Ok(json!({
            "channel": ChannelDto::from(channel),
            "category": category,
        }))
    }

    async fn create_category(&self, data: Value) -> Result<Value, AppError> {
        let request: CreateCategoryRequest = parse_payload(data)?;
        let prev_id = request
            .prev_category_id
            .as_deref()
            .map(|id| CompositeId::expect(id, EntityKind::Category))
            .transpose()?;

        let category = self
            .chain
            .create_category(request.name, request.description, prev_id)
            .await?;
        self.notify_category(&category, "created");
        to_value(&CategoryDto::from(&category))
    }

    async fn update_category(&self, data: Value) -> Result<Value, AppError> {
        let request: UpdateCategoryRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Category)?;
        let category = self
            .chain
            .update_category(id, request.name, request.description)
            .await?;
        self.notify_category(&category, "updated");
        to_value(&CategoryDto::from(&category))
    }

    async fn delete_category(&self, data: Value) -> Result<Value, AppError> {
        let request: DeleteCategoryRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Category)?;
        let removal = self.chain.remove_category(id).await?;

        self.notify_category(&removal.category, "deleted");
        if let Some(predecessor) = &removal.predecessor {
            self.notify_category(predecessor, "reordered");
        }
        for channel in &removal.orphaned_channels {
            self.notify_channel(channel, "uncategorized");
        }
        to_value(&CategoryDto::from(&removal.category))
    }

    async fn reorder_categories(&self, data: Value) -> Result<Value, AppError> {
        let request: ReorderCategoriesRequest = parse_payload(data)?;
        let target_id = CompositeId::expect(&request.target_category_id, EntityKind::Category)?;
        let prev_id = request
            .prev_category_id
            .as_deref()
            .map(|id| CompositeId::expect(id, EntityKind::Category))
            .transpose()?;

        let category = self.chain.relocate(target_id, prev_id).await?;
        self.notify_category(&category, "reordered");
        to_value(&CategoryDto::from(&category))
    }

    async fn reorder_category_channels(&self, data: Value) -> Result<Value, AppError> {
        let request: ReorderCategoryChannelsRequest = parse_payload(data)?;
        let category_id = CompositeId::expect(&request.category_id, EntityKind::Category)?;
        let ordered = request
            .ordered_channel_ids
            .iter()
            .map(|id| CompositeId::expect(id, EntityKind::Channel))
            .collect::<Result<Vec<_>, _>>()?;

        let category = self.chain.reorder_channels(category_id, ordered).await?;
        self.notify_category(&category, "channels_reordered");
        to_value(&CategoryDto::from(&category))
    }

    async fn add_channel_to_category(&self, data: Value) -> Result<Value, AppError> {
        let request: AddChannelToCategoryRequest = parse_payload(data)?;
        let category_id = CompositeId::expect(&request.category_id, EntityKind::Category)?;
        let channel_id = CompositeId::expect(&request.channel_id, EntityKind::Channel)?;

        let placement = self.chain.add_channel(category_id, channel_id).await?;
        self.notify_category(&placement.category, "channel_added");
        self.notify_channel(&placement.channel, "moved");
        if let Some(previous) = &placement.previous_category {
            self.notify_category(previous, "channel_removed");
        }

        to_value(&CategoryChannelDto {
            category: CategoryDto::from(&placement.category),
            channel: ChannelDto::from(&placement.channel),
        })
    }

    async fn list_categories(&self) -> Result<Value, AppError> {
        let categories = self.chain.list_categories().await?;
        let dtos: Vec<CategoryDto> = categories.iter().map(CategoryDto::from).collect();
        to_value(&dtos)
    }

    async fn create_role(&self, data: Value) -> Result<Value, AppError> {
        let request: CreateRoleRequest = parse_payload(data)?;
        let role = self
            .roles
            .create_role(request.name, request.description, request.permissions)
            .await?;
        to_value(&RoleDto::from(&role))
    }

    async fn update_role(&self, data: Value) -> Result<Value, AppError> {
        let request: UpdateRoleRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Role)?;
        let role = self
            .roles
            .update_role(
                id,
                RoleChanges {
                    name: request.name,
                    description: request.description,
                    permissions: request.permissions,
                },
            )
            .await?;
        to_value(&RoleDto::from(&role))
    }

    async fn delete_role(&self, data: Value) -> Result<Value, AppError> {
        let request: RoleIdRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Role)?;
        let role = self.roles.delete_role(id).await?;
        to_value(&RoleDto::from(&role))
    }

    async fn get_roles(&self, data: Value) -> Result<Value, AppError> {
        let request: ListRolesRequest = if data.is_null() {
            ListRolesRequest::default()
        } else {
            parse_payload(data)?
        };
        let roles = self.roles.list_roles(request.include_deleted).await?;
        to_value(&RoleListDto::new(&roles))
    }

    async fn get_role(&self, data: Value) -> Result<Value, AppError> {
        let request: RoleIdRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Role)?;
        let role = self.roles.get_role(id).await?;
        to_value(&RoleDto::from(&role))
    }

    async fn restore_role(&self, data: Value) -> Result<Value, AppError> {
        let request: RoleIdRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Role)?;
        let role = self.roles.restore_role(id).await?;
        to_value(&RoleDto::from(&role))
    }

    async fn add_permission_to_role(&self, data: Value) -> Result<Value, AppError> {
        let request: AddPermissionToRoleRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.role_id, EntityKind::Role)?;
        let role = self.roles.add_permission(id, request.permission).await?;
        to_value(&RoleDto::from(&role))
    }

    async fn update_permission_of_role(&self, data: Value) -> Result<Value, AppError> {
        let request: UpdateRolePermissionsRequest = parse_payload(data)?;
        let id = CompositeId::expect(&request.id, EntityKind::Role)?;
        let role = self
            .roles
            .replace_permissions(id, request.permissions)
            .await?;
        to_value(&RoleDto::from(&role))
    }

    fn notify_category(&self, category: &Category, action: &str) {
        self.notify(category.composite_id(), Collection::Category, action);
    }

    fn notify_channel(&self, channel: &Channel, action: &str) {
        self.notify(channel.composite_id(), Collection::Channel, action);
    }

    fn notify(&self, id: CompositeId, collection: Collection, action: &str) {
        let notification =
            UpdateNotification::new(id, collection).with_data(json!({ "action": action }));
        let _ = self.bus.publish(DomainEvent::Updated(notification));
    }
}

/// Decode a command payload and run its validation rules.
fn parse_payload<T>(data: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(data)
        .map_err(|e| AppError::Validation(FieldErrorTree::from_deserialize_error(&e)))?;
    payload.validate()?;
    Ok(payload)
}

/// `send_to` is either a room key or a bare channel id.
fn parse_recipient(send_to: &str) -> Result<RoomKey, AppError> {
    if let Ok(id) = send_to.parse::<i64>() {
        return Ok(RoomKey::channel(id));
    }
    Ok(send_to.parse::<RoomKey>()?)
}

fn to_value<T: serde::Serialize>(data: &T) -> Result<Value, AppError> {
    serde_json::to_value(data)
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))
}
