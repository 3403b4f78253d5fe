use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use roost_db::Database;

use crate::error::ApiError;
use crate::geocode::Geocoder;
use crate::images::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub geocoder: Arc<dyn Geocoder>,
    pub images: Arc<dyn ImageStore>,
    pub session_ttl_days: i64,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        geocoder: Arc<dyn Geocoder>,
        images: Arc<dyn ImageStore>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            db,
            geocoder,
            images,
            session_ttl_days,
        }
    }

    /// Runs a blocking DB closure off the async runtime.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow!("blocking task failed"))
            })?
            .map_err(ApiError::Internal)
    }
}
