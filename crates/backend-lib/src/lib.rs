// ============================
// codecollab-backend/src/lib.rs
// ============================
//! Core backend-lib functionality for the `CodeCollab` WebSocket server.

pub mod config;
pub mod error;
pub mod gateway;
pub mod hub;
pub mod metrics;
pub mod registry;
pub mod room;
pub mod tree;
pub mod validation;
pub mod websocket;
pub mod ws_router;

use crate::config::Settings;
use crate::error::AppError;
use crate::gateway::SessionGateway;
use crate::hub::ConnectionHub;
use crate::registry::RoomRegistry;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Intent dispatch over the room registry and connection hub
    pub gateway: Arc<SessionGateway>,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        settings.validate()?;
        let seed = settings.room.to_seed()?;

        let gateway = SessionGateway::new(
            Arc::new(RoomRegistry::new(seed)),
            Arc::new(ConnectionHub::new()),
            settings.limits,
        );

        Ok(Self {
            gateway: Arc::new(gateway),
            settings: Arc::new(settings),
        })
    }

    /// Create a new application state with settings from the default sources
    pub fn new_default() -> Result<Self, AppError> {
        Self::new(Settings::load()?)
    }
}
