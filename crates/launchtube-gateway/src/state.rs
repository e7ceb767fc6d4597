use crate::assets::AssetResolver;
use launchtube_browser::BrowserManager;
use launchtube_core::config::ConfigStore;
use launchtube_core::kv::KvStore;
use launchtube_player::PlayerController;
use std::sync::Arc;

/// Everything the handlers need. One instance per running gateway,
/// constructed at startup and shared by reference; tests build their own.
pub struct AppState {
    pub config: ConfigStore,
    pub kv: KvStore,
    pub assets: AssetResolver,
    pub player: PlayerController,
    pub browser: BrowserManager,
}

pub type SharedState = Arc<AppState>;
