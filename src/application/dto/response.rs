//! Response DTOs
//!
//! Everything sent back to clients renders ids in composite form.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    Category, Channel, ChannelType, CompositeId, EntityKind, Message, MessageType, Permission,
    PublicUser, Role, RoomKey,
};
use crate::shared::error::{AppError, ErrorResponse};

/// Uniform envelope for command results and broadcasts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<ErrorResponse>,
}

impl CommandResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Serialize `data` into a success envelope.
    pub fn from_data<T: Serialize>(data: &T) -> Result<Self, AppError> {
        let value = serde_json::to_value(data)
            .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;
        Ok(Self::ok(value))
    }

    pub fn err(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_response()),
        }
    }

    pub fn from_result(result: Result<Value, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

/// Category response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryDto {
    pub id: CompositeId,
    pub name: String,
    pub description: Option<String>,
    pub channels_order: Vec<CompositeId>,
    pub next_category_id: Option<CompositeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Category> for CategoryDto {
    fn from(category: &Category) -> Self {
        Self {
            id: category.composite_id(),
            name: category.name.clone(),
            description: category.description.clone(),
            channels_order: category
                .channels_order
                .iter()
                .map(|id| CompositeId::new(EntityKind::Channel, *id))
                .collect(),
            next_category_id: category
                .next_category_id
                .map(|id| CompositeId::new(EntityKind::Category, id)),
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// Channel response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelDto {
    pub id: CompositeId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub category_id: Option<CompositeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Channel> for ChannelDto {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.composite_id(),
            name: channel.name.clone(),
            description: channel.description.clone(),
            channel_type: channel.channel_type,
            category_id: channel
                .category_id
                .map(|id| CompositeId::new(EntityKind::Category, id)),
            created_at: channel.created_at,
            updated_at: channel.updated_at,
        }
    }
}

/// Message response, also the payload of message broadcasts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageDto {
    pub id: CompositeId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub sent_by: CompositeId,
    pub sent_to: RoomKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.composite_id(),
            message_type: message.message_type,
            content: message.content.clone(),
            sent_by: CompositeId::new(EntityKind::User, message.sent_by),
            sent_to: message.sent_to,
            created_at: message.created_at,
            updated_at: message.updated_at,
            is_deleted: message.is_deleted,
            deleted_at: message.deleted_at,
        }
    }
}

/// One page of a channel timeline, newest first
#[derive(Debug, Clone, Serialize)]
pub struct TimelineDto {
    pub timeline: Vec<MessageDto>,
    pub timeline_length: usize,
}

impl TimelineDto {
    pub fn new(messages: &[Message]) -> Self {
        let timeline: Vec<MessageDto> = messages.iter().map(MessageDto::from).collect();
        Self {
            timeline_length: timeline.len(),
            timeline,
        }
    }
}

/// Result of placing a channel in a category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryChannelDto {
    pub category: CategoryDto,
    pub channel: ChannelDto,
}

/// Role response. An empty permission set renders as `null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoleDto {
    pub id: CompositeId,
    pub name: String,
    pub description: String,
    pub permissions: Option<Vec<Permission>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Role> for RoleDto {
    fn from(role: &Role) -> Self {
        Self {
            id: role.composite_id(),
            name: role.name.clone(),
            description: role.description.clone(),
            permissions: (!role.permissions.is_empty()).then(|| role.permissions.clone()),
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleListDto {
    pub roles: Vec<RoleDto>,
    pub roles_count: usize,
}

impl RoleListDto {
    pub fn new(roles: &[Role]) -> Self {
        let roles: Vec<RoleDto> = roles.iter().map(RoleDto::from).collect();
        Self {
            roles_count: roles.len(),
            roles,
        }
    }
}

/// Payload of the `auth_success` event
#[derive(Debug, Clone, Serialize)]
pub struct AuthSuccessDto {
    pub message: String,
    pub user: PublicUser,
    pub session_id: String,
}
