//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, ForgeBackend};
use crate::forge::{Armory, ForgeService, KeywordSmith, WeaponSmith};
use crate::lobby::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
    pub forge: ForgeService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let smith: Arc<dyn WeaponSmith> = match config.forge_backend {
            ForgeBackend::Keywords => Arc::new(KeywordSmith),
            ForgeBackend::Armory => Arc::new(Armory::new(config.armory_seed)),
        };
        let forge = ForgeService::new(smith);

        let rooms = Arc::new(RoomRegistry::new(config.match_settings.max_players));

        Self {
            config,
            rooms,
            forge,
        }
    }
}
