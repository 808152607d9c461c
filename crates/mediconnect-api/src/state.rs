//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use mediconnect_avatar::AvatarResolver;
use mediconnect_chat::ChatService;
use mediconnect_core::MediConnectConfig;
use mediconnect_storage::DoctorStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MediConnectConfig>,
    /// Doctor directory.
    pub store: Arc<dyn DoctorStore>,
    pub chat: Arc<ChatService>,
    /// Full resolver used by the avatar endpoint; pages use its offline tiers.
    pub avatars: Arc<AvatarResolver>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: MediConnectConfig,
        store: Arc<dyn DoctorStore>,
        chat: Arc<ChatService>,
        avatars: Arc<AvatarResolver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            chat,
            avatars,
            start_time: Instant::now(),
        }
    }
}
