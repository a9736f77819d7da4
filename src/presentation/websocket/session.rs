//! Connection sessions.
//!
//! A session is created once a handshake token has been verified and the
//! identity behind it checked against the store. Commands look their
//! session up through [`SessionManager::require`]; a connection without one
//! gets an "Authentication required" result for every command.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{json, Value};

use super::gateway::Gateway;
use super::messages::{events, OutboundFrame};
use super::rooms::RoomRegistry;
use crate::application::dto::{AuthSuccessDto, CommandResponse};
use crate::application::events::{Collection, DomainEvent, EventBus, UpdateNotification};
use crate::application::services::CredentialGateway;
use crate::domain::{Credential, Store, User};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Per-connection authenticated identity.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub connection_id: String,
    pub user_id: i64,
    pub credential_id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub is_verified: bool,
    pub authenticated: bool,
    pub connected_at: DateTime<Utc>,
    /// Free-form per-connection state
    pub data: HashMap<String, Value>,
}

impl Session {
    fn new(connection_id: &str, user: &User, credential: &Credential) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            user_id: user.id,
            credential_id: credential.id,
            username: credential.username.clone(),
            display_name: user.display_name.clone(),
            email: credential.email.clone(),
            is_verified: credential.is_verified,
            authenticated: true,
            connected_at: Utc::now(),
            data: HashMap::new(),
        }
    }
}

pub struct SessionManager {
    sessions: DashMap<String, Session>,
    store: Store,
    credentials: Arc<dyn CredentialGateway>,
    gateway: Arc<Gateway>,
    rooms: Arc<RoomRegistry>,
    bus: Arc<EventBus>,
}

impl SessionManager {
    pub fn new(
        store: Store,
        credentials: Arc<dyn CredentialGateway>,
        gateway: Arc<Gateway>,
        rooms: Arc<RoomRegistry>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            credentials,
            gateway,
            rooms,
            bus,
        }
    }

    /// Verify a handshake token and open a session for the connection.
    ///
    /// On success the user is marked online and `auth_success` is sent to
    /// this connection only. Any error means the handshake is refused.
    pub async fn authenticate(
        &self,
        connection_id: &str,
        token: Option<&str>,
    ) -> Result<Session, AppError> {
        let result = self.open_session(connection_id, token).await;
        match &result {
            Ok(session) => {
                tracing::info!(
                    connection_id = %connection_id,
                    user_id = session.user_id,
                    "Connection authenticated"
                );
            }
            Err(e) if e.is_store_failure() => {
                metrics::record_handshake_rejection("store_error");
                tracing::error!(connection_id = %connection_id, error = %e, "Handshake aborted by store failure");
            }
            Err(e) => {
                metrics::record_handshake_rejection("auth_failed");
                tracing::info!(connection_id = %connection_id, reason = %e, "Handshake refused");
            }
        }
        self.report_connections();
        result
    }

    async fn open_session(
        &self,
        connection_id: &str,
        token: Option<&str>,
    ) -> Result<Session, AppError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthenticationFailed("missing token".into()))?;
        let verified = self.credentials.verify(token).await?;

        let mut user = match self.store.users.find_by_id(verified.user_id).await? {
            Some(user) if !user.is_deleted => user,
            _ => return Err(AppError::AuthenticationFailed("unknown user".into())),
        };

        let credential = match self.store.credentials.find_by_id(verified.credential_id).await? {
            Some(credential) => Some(credential),
            None => self.store.credentials.find_by_user_id(user.id).await?,
        }
        .ok_or_else(|| AppError::AuthenticationFailed("unknown credential".into()))?;

        if credential.user_id != user.id {
            return Err(AppError::AuthenticationFailed(
                "credential does not belong to user".into(),
            ));
        }
        if !credential.is_active {
            return Err(AppError::AuthenticationFailed("credential is inactive".into()));
        }

        user.set_online_status(true);
        let user = self.store.users.save(&user).await?;

        let session = Session::new(connection_id, &user, &credential);
        self.sessions
            .insert(connection_id.to_string(), session.clone());

        let welcome = AuthSuccessDto {
            message: "Authentication successful".into(),
            user: user.to_public(),
            session_id: connection_id.to_string(),
        };
        let response = CommandResponse::from_data(&welcome)?;
        self.gateway.send_to(
            connection_id,
            OutboundFrame::envelope(events::AUTH_SUCCESS, &response),
        );
        self.publish_presence(&user);

        Ok(session)
    }

    /// Release everything a connection holds. Never fails.
    pub async fn teardown(&self, connection_id: &str) {
        let left = self.rooms.leave_all(connection_id);
        let session = self.sessions.remove(connection_id).map(|(_, s)| s);

        if let Some(session) = session.filter(|s| s.authenticated) {
            if self.has_session_for(session.user_id) {
                tracing::debug!(
                    user_id = session.user_id,
                    "User still has other connections, staying online"
                );
            } else if let Err(e) = self.mark_offline(session.user_id).await {
                tracing::warn!(user_id = session.user_id, error = %e, "Failed to mark user offline");
            }
        }

        tracing::info!(connection_id = %connection_id, rooms = left.len(), "Connection torn down");
        self.report_connections();
    }

    async fn mark_offline(&self, user_id: i64) -> Result<(), AppError> {
        let Some(mut user) = self.store.users.find_by_id(user_id).await? else {
            return Ok(());
        };
        user.set_online_status(false);
        let user = self.store.users.save(&user).await?;
        self.publish_presence(&user);
        Ok(())
    }

    fn publish_presence(&self, user: &User) {
        let notification = UpdateNotification::new(user.composite_id(), Collection::User)
            .with_data(json!({ "is_online": user.is_online }));
        let _ = self.bus.publish(DomainEvent::Updated(notification));
    }

    /// The authenticated session of a connection.
    pub fn require(&self, connection_id: &str) -> Result<Session, AppError> {
        self.sessions
            .get(connection_id)
            .filter(|s| s.authenticated)
            .map(|s| s.clone())
            .ok_or(AppError::Unauthenticated)
    }

    /// Store a value in the connection's session. Returns false when the
    /// connection has no session.
    pub fn set_data(&self, connection_id: &str, key: impl Into<String>, value: Value) -> bool {
        match self.sessions.get_mut(connection_id) {
            Some(mut session) => {
                session.data.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    pub fn get_data(&self, connection_id: &str, key: &str) -> Option<Value> {
        self.sessions
            .get(connection_id)
            .and_then(|s| s.data.get(key).cloned())
    }

    pub fn has_session_for(&self, user_id: i64) -> bool {
        self.sessions
            .iter()
            .any(|s| s.authenticated && s.user_id == user_id)
    }

    pub fn authenticated_connections(&self) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|s| s.authenticated)
            .map(|s| s.key().clone())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn report_connections(&self) {
        metrics::set_websocket_connections(self.gateway.connection_count(), self.session_count());
    }
}
