//! Request DTOs
//!
//! Payloads of the commands accepted over the gateway. Ids arrive in their
//! composite `"<kind>:<raw>"` form and are resolved by the command handlers.

use serde::Deserialize;
use validator::Validate;

use crate::domain::{ChannelType, MessageType, Permission};

/// Join or leave a room
#[derive(Debug, Deserialize, Validate)]
pub struct RoomRequest {
    #[validate(length(min = 1, message = "Room type is required"))]
    pub room_type: String,

    #[validate(length(min = 1, message = "Room id is required"))]
    pub room_id: String,
}

/// Send a message to a room
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(rename = "type", default)]
    pub message_type: MessageType,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    /// Room key (`channel:<id>`) or a bare channel id
    #[validate(length(min = 1, message = "Recipient is required"))]
    pub send_to: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    pub message_id: String,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteMessageRequest {
    pub message_id: String,
}

fn default_timeline_amount() -> u32 {
    10
}

/// Page through a channel's history backwards from `until`
#[derive(Debug, Deserialize, Validate)]
pub struct TimelineRequest {
    pub channel_id: String,

    /// RFC 3339 timestamp or a bare `YYYY-MM-DD` date
    pub until: String,

    #[serde(default = "default_timeline_amount")]
    #[validate(range(min = 1, max = 100, message = "Amount must be between 1 and 100"))]
    pub amount: u32,
}

/// Create channel request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChannelRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,

    #[serde(rename = "type", default)]
    pub channel_type: ChannelType,

    /// Category to place the new channel in
    pub category_id: Option<String>,
}

/// Create category request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,

    /// Insert after this category instead of at the tail
    pub prev_category_id: Option<String>,
}

/// Rename or re-describe a category. Chain pointers are not editable here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    pub id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteCategoryRequest {
    pub id: String,
}

/// Move a category to sit after `prev_category_id`, or to the head when absent
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderCategoriesRequest {
    pub target_category_id: String,
    pub prev_category_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderCategoryChannelsRequest {
    pub category_id: String,
    pub ordered_channel_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddChannelToCategoryRequest {
    pub category_id: String,
    pub channel_id: String,
}

/// Create role request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: String,

    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1024, message = "Description must be at most 1024 characters"))]
    pub description: Option<String>,

    pub permissions: Option<Vec<Permission>>,
}

/// Payload of the single-role commands (get, delete, restore)
#[derive(Debug, Deserialize, Validate)]
pub struct RoleIdRequest {
    pub id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListRolesRequest {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddPermissionToRoleRequest {
    pub role_id: String,
    pub permission: Permission,
}

/// Replace a role's permissions; an absent list leaves them untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRolePermissionsRequest {
    pub id: String,
    pub permissions: Option<Vec<Permission>>,
}
