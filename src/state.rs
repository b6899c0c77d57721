use std::sync::Arc;

use crate::config::AppConfig;
use crate::users::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn from_env() -> Self {
        Self {
            config: Arc::new(AppConfig::from_env()),
        }
    }

    /// A fresh store for one request's connect/operate/disconnect cycle.
    /// Stores are not shared or pooled; each holds its own connection.
    pub fn store(&self) -> UserStore {
        UserStore::new(self.config.db.clone())
    }
}
