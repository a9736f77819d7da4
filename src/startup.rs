//! Application Startup
//!
//! Builds the entity store for the configured backend, wires every shared
//! service once and binds the HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::application::events::EventBus;
use crate::application::services::{
    ChainCoordinator, ChannelServiceImpl, CredentialGateway, JwtCredentialGateway,
    MessageServiceImpl, RoleServiceImpl,
};
use crate::config::{Settings, StoreBackend};
use crate::domain::Store;
use crate::infrastructure::{database, memory::MemoryStore, repositories};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::presentation::websocket::{
    register_senders, CommandDispatcher, Gateway, RoomRegistry, SessionManager,
};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Store,
    pub gateway: Arc<Gateway>,
    pub rooms: Arc<RoomRegistry>,
    pub sessions: Arc<SessionManager>,
    pub bus: Arc<EventBus>,
    pub chain: Arc<ChainCoordinator>,
    pub dispatcher: Arc<CommandDispatcher>,
}

impl AppState {
    /// Wire the coordination services over `store`.
    pub fn new(settings: Settings, store: Store, credentials: Arc<dyn CredentialGateway>) -> Self {
        let ids = Arc::new(SnowflakeGenerator::with_epoch(
            u64::from(settings.snowflake.machine_id),
            u64::from(settings.snowflake.node_id),
            settings.snowflake.epoch,
        ));

        let gateway = Arc::new(Gateway::new(settings.websocket.outbound_buffer));
        let bus = Arc::new(EventBus::new());
        let rooms = Arc::new(RoomRegistry::new(store.channels.clone(), gateway.clone()));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            credentials,
            gateway.clone(),
            rooms.clone(),
            bus.clone(),
        ));
        register_senders(&bus, rooms.clone(), sessions.clone(), gateway.clone());

        let chain = Arc::new(ChainCoordinator::new(store.clone(), ids.clone()));
        let channels = Arc::new(ChannelServiceImpl::new(store.clone(), chain.clone(), ids.clone()));
        let messages = Arc::new(MessageServiceImpl::new(store.clone(), ids.clone()));
        let roles = Arc::new(RoleServiceImpl::new(store.clone(), ids));
        let dispatcher = Arc::new(CommandDispatcher::new(
            sessions.clone(),
            rooms.clone(),
            gateway.clone(),
            bus.clone(),
            chain.clone(),
            channels,
            messages,
            roles,
        ));

        Self {
            settings: Arc::new(settings),
            store,
            gateway,
            rooms,
            sessions,
            bus,
            chain,
            dispatcher,
        }
    }
}

/// Build the router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);
    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(create_trace_layer())
            .layer(cors),
    )
}

/// Open the entity store selected by `store.backend`.
pub async fn open_store(settings: &Settings) -> Result<Store> {
    match settings.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(MemoryStore::new().into_store())
        }
        StoreBackend::Postgres => {
            let pool = database::create_pool(&settings.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            tracing::info!("Database connection pool created");

            if settings.database.run_migrations {
                database::run_migrations(&pool)
                    .await
                    .context("failed to run migrations")?;
                tracing::info!("Database migrations applied");
            }
            Ok(repositories::pg_store(pool))
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let store = open_store(&settings).await?;
        let credentials: Arc<dyn CredentialGateway> =
            Arc::new(JwtCredentialGateway::new(&settings.jwt));

        let addr = settings.server_addr();
        let state = AppState::new(settings, store, credentials);
        let router = build_router(state);

        let listener = TcpListener::bind(addr.as_str())
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until ctrl-c
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
