//! Common Test Utilities
//!
//! An in-memory application wired exactly as in production, plus helpers
//! to seed identities and drive connections without a real socket.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

use realtime_hub::application::services::JwtCredentialGateway;
use realtime_hub::config::Settings;
use realtime_hub::domain::{Category, Channel, ChannelType, Credential, User};
use realtime_hub::infrastructure::memory::MemoryStore;
use realtime_hub::presentation::websocket::OutboundFrame;
use realtime_hub::shared::error::AppError;
use realtime_hub::startup::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

/// How long a test waits for an asynchronously delivered frame
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Test application over the in-memory store
pub struct TestApp {
    pub state: AppState,
    pub tokens: JwtCredentialGateway,
    next_id: std::sync::atomic::AtomicI64,
}

/// Seeded identity with a valid access token
pub struct TestUser {
    pub user_id: i64,
    pub credential_id: i64,
    pub username: String,
    pub token: String,
}

/// A registered connection and the receiving end of its outbound queue
pub struct TestConnection {
    pub id: String,
    pub outbox: Receiver<OutboundFrame>,
}

impl TestApp {
    pub fn new() -> Self {
        let settings = Settings::with_defaults(TEST_JWT_SECRET).expect("test settings");
        let tokens = JwtCredentialGateway::new(&settings.jwt);
        let credentials = Arc::new(JwtCredentialGateway::new(&settings.jwt));
        let store = MemoryStore::new().into_store();
        let state = AppState::new(settings, store, credentials);

        Self {
            state,
            tokens,
            next_id: std::sync::atomic::AtomicI64::new(1_000),
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(build_router(self.state.clone())).expect("test server")
    }

    /// Server on a real socket, needed for WebSocket upgrades.
    pub fn socket_server(&self) -> TestServer {
        TestServer::builder()
            .http_transport()
            .build(build_router(self.state.clone()))
            .expect("test server")
    }

    fn next_id(&self) -> i64 {
        self.next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    /// Insert a user with an active credential and mint a token for it.
    pub async fn seed_user(&self) -> TestUser {
        let user_id = self.next_id();
        let credential_id = self.next_id();
        let name: String = Name().fake();
        let username: String = Username().fake();
        let email: String = SafeEmail().fake();

        self.state
            .store
            .users
            .insert(&User::new(user_id, name))
            .await
            .expect("insert user");
        self.state
            .store
            .credentials
            .insert(&Credential::new(credential_id, user_id, username.clone(), email))
            .await
            .expect("insert credential");

        let token = self
            .tokens
            .issue_access_token(user_id, credential_id)
            .expect("token");
        TestUser {
            user_id,
            credential_id,
            username,
            token,
        }
    }

    pub async fn seed_channel(&self, id: i64, name: &str) -> Channel {
        self.state
            .store
            .channels
            .insert(&Channel::new(id, name, "", ChannelType::Text))
            .await
            .expect("insert channel")
    }

    pub async fn category(&self, id: i64) -> Category {
        self.state
            .store
            .categories
            .find_by_id(id)
            .await
            .expect("read category")
            .expect("category exists")
    }

    pub async fn channel(&self, id: i64) -> Channel {
        self.state
            .store
            .channels
            .find_by_id(id)
            .await
            .expect("read channel")
            .expect("channel exists")
    }

    /// Register a connection and run the handshake with `token`.
    pub async fn connect(&self, token: Option<&str>) -> Result<TestConnection, AppError> {
        let id = Uuid::new_v4().to_string();
        let outbox = self.state.gateway.register(&id);
        match self.state.sessions.authenticate(&id, token).await {
            Ok(_) => Ok(TestConnection { id, outbox }),
            Err(e) => {
                self.state.gateway.unregister(&id);
                Err(e)
            }
        }
    }

    /// Seed a user and open an authenticated connection for them.
    pub async fn connect_new_user(&self) -> (TestUser, TestConnection) {
        let user = self.seed_user().await;
        let mut conn = self.connect(Some(&user.token)).await.expect("handshake");
        conn.expect_event("auth_success").await;
        (user, conn)
    }

    /// Close a connection the way the socket handler does.
    pub async fn disconnect(&self, conn: &TestConnection) {
        self.state.sessions.teardown(&conn.id).await;
        self.state.gateway.unregister(&conn.id);
    }

    /// Run a command for a connection and return the result envelope.
    pub async fn command(&self, conn: &TestConnection, event: &str, data: Value) -> Value {
        let frame = serde_json::json!({ "event": event, "data": data });
        let reply = self
            .state
            .dispatcher
            .handle(&conn.id, &frame.to_string())
            .await;
        reply.data
    }

    /// Run a command that must succeed and return its `data`.
    pub async fn ok(&self, conn: &TestConnection, event: &str, data: Value) -> Value {
        let envelope = self.command(conn, event, data).await;
        assert_eq!(envelope["success"], true, "{} failed: {}", event, envelope);
        envelope["data"].clone()
    }
}

impl TestConnection {
    /// Wait for the next frame named `event`, skipping others.
    pub async fn expect_event(&mut self, event: &str) -> OutboundFrame {
        loop {
            let frame = tokio::time::timeout(DELIVERY_TIMEOUT, self.outbox.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {}", event))
                .unwrap_or_else(|| panic!("queue closed while waiting for {}", event));
            if frame.event == event {
                return frame;
            }
        }
    }

    /// Every frame queued right now.
    pub fn drain(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbox.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn received(&mut self, event: &str) -> bool {
        self.drain().iter().any(|f| f.event == event)
    }
}

/// Composite id helpers
pub fn category_ref(id: i64) -> String {
    format!("category:{}", id)
}

pub fn channel_ref(id: i64) -> String {
    format!("channel:{}", id)
}

pub fn role_ref(id: i64) -> String {
    format!("role:{}", id)
}

/// Raw id out of a composite id string in a response
pub fn raw_id(value: &Value) -> i64 {
    value
        .as_str()
        .and_then(|s| s.split_once(':'))
        .and_then(|(_, raw)| raw.parse().ok())
        .expect("composite id")
}
