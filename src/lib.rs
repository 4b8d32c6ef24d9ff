pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;
pub mod websocket;
pub mod ws;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use config::Config;
use db::StorageEngine;
use services::Coordinator;
use ws::hub::Hub;

/// State shared by the HTTP and WebSocket adapters
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub hub: Arc<Hub>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<dyn StorageEngine>, config: &Config) -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new(engine)),
            hub: Arc::new(Hub::new(config.send_timeout(), config.client_queue_capacity)),
            started_at: Utc::now(),
        }
    }
}
