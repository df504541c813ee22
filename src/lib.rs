pub mod api;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod ui;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::catalog::CatalogProvider;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub catalog: Arc<dyn CatalogProvider>,
    pub sessions: SessionKeys,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, catalog: Arc<dyn CatalogProvider>) -> Self {
        let sessions = SessionKeys::from_config(&config.auth);
        Self {
            config,
            db,
            catalog,
            sessions,
        }
    }
}
