use std::collections::HashMap;

use crate::chat::Transcript;
use crate::core::AppConfig;

/// Per-process state. Sessions are in-memory only; a restart
/// discards them.
pub struct AppState {
    pub sessions: HashMap<String, Transcript>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }
}
