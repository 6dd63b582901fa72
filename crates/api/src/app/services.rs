use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use taskboard_auth::Hs256Jwt;
use taskboard_infra::{DynStore, InMemoryStore, PostgresStore, seed_demo_data};

use crate::config::ApiConfig;

/// Shared handles every handler receives via `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub store: DynStore,
    pub jwt: Arc<Hs256Jwt>,
}

impl AppServices {
    pub fn new(store: DynStore, jwt: Arc<Hs256Jwt>) -> Self {
        Self { store, jwt }
    }

    /// Wire the store and token codec described by `config`.
    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let store = open_store(config).await?;

        if config.seed_demo_data {
            seed_demo_data(store.as_ref(), Utc::now())
                .await
                .context("failed to seed demo data")?;
        }

        let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl()));
        Ok(Self::new(store, jwt))
    }
}

/// With a `database_url` the Postgres schema is bootstrapped first;
/// otherwise an empty in-memory store is used.
pub async fn open_store(config: &ApiConfig) -> anyhow::Result<DynStore> {
    match &config.database_url {
        Some(url) => {
            let pg = PostgresStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            pg.migrate().await.context("failed to migrate schema")?;
            tracing::info!("using postgres store");
            Ok(Arc::new(pg))
        }
        None => {
            tracing::info!("no database_url configured; using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
