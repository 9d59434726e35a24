use std::sync::Arc;

use common::storage::ByteStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub blob_store: Arc<dyn ByteStore>,
    pub config: AppConfig,
}
