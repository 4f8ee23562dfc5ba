use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::kv::{KeyValue, MemoryKv, RedisKv};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The key-value substrate holding user aggregates.
    pub kv: Arc<dyn KeyValue>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`, connecting the configured substrate.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let kv: Arc<dyn KeyValue> = match config.redis_url.as_deref() {
            Some(url) => {
                let store = RedisKv::connect(url).await?;
                tracing::info!("✅ Redis substrate connected (pooled connection manager)");
                Arc::new(store)
            }
            None => {
                tracing::warn!(
                    "⚠️ REDIS_URL not set - using the in-memory substrate (state is lost on restart)"
                );
                Arc::new(MemoryKv::new())
            }
        };

        Ok(AppState {
            kv,
            config: config.clone(),
        })
    }
}
