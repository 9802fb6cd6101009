use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::{AppConfig, StoreBackend};
use crate::users::{memory::MemoryUserStore, pg::PgUserStore, repo::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match config.store {
            StoreBackend::Memory => {
                info!(seed_admin = config.seed_admin, "using in-memory user store");
                if config.seed_admin {
                    Arc::new(MemoryUserStore::seeded())
                } else {
                    Arc::new(MemoryUserStore::new())
                }
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                let store = PgUserStore::new(db);
                if config.seed_admin {
                    store.seed_admin().await?;
                }
                info!("using postgres user store");
                Arc::new(store)
            }
        };

        Ok(Self::from_parts(store, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Demo-mode state: seeded in-memory store and default config.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(MemoryUserStore::seeded()),
            Arc::new(AppConfig::default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_respects_seed_flag() {
        let seeded = AppState::from_config(AppConfig::default()).await.unwrap();
        assert_eq!(seeded.store.count().await.unwrap(), 1);

        let empty = AppState::from_config(AppConfig {
            seed_admin: false,
            ..AppConfig::default()
        })
        .await
        .unwrap();
        assert_eq!(empty.store.count().await.unwrap(), 0);
    }
}
