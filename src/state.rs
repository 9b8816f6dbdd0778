use crate::config::{AppConfig, ErrorMode};
use crate::services::Stores;

/// Settings the `/dev` dispatcher reads on every request
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    pub error_mode: ErrorMode,
    pub allow_purge: bool,
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub gateway: GatewaySettings,
}

impl AppState {
    pub fn new(config: &AppConfig, stores: Stores) -> Self {
        Self {
            stores,
            gateway: GatewaySettings {
                error_mode: config.dev.error_mode,
                allow_purge: config.dev.allow_purge,
            },
        }
    }
}
