// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pipecfg_app::{EntityApi, EntityKind};
use pipecfg_client::Client;
use pipecfg_store::{Store, StoreApi};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{BackendKind, Config};

/// Where entity collaborators come from for this run.
pub enum Backend {
    Store(Arc<Store>),
    Http(Client),
}

impl Backend {
    pub fn open(config: &Config, config_path: &Path, demo: bool) -> Result<Self> {
        if demo {
            let store = Store::open_memory()?;
            store.bootstrap()?;
            store.seed_demo_data()?;
            info!("using in-memory demo store");
            return Ok(Self::Store(Arc::new(store)));
        }

        match config.backend_kind() {
            BackendKind::Sqlite => {
                let db_path = config.db_path()?;
                let store = Store::open(&db_path).with_context(|| {
                    format!(
                        "open database {} -- if this path is wrong, set [storage].db_path or PIPECFG_DB_PATH",
                        db_path.display()
                    )
                })?;
                store.bootstrap()?;
                info!(path = %db_path.display(), "using sqlite store");
                Ok(Self::Store(Arc::new(store)))
            }
            BackendKind::Http => {
                let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
                    format!(
                        "invalid [http] config in {}; fix base_url/timeout values",
                        config_path.display()
                    )
                })?;
                info!(base_url = client.base_url(), "using collector API");
                Ok(Self::Http(client))
            }
        }
    }

    pub fn api(&self, kind: EntityKind) -> Arc<dyn EntityApi> {
        match self {
            Self::Store(store) => Arc::new(StoreApi::new(Arc::clone(store), kind)),
            Self::Http(client) => Arc::new(client.entity(kind)),
        }
    }

    /// Confirms the backend answers. A store is usable once opened.
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Store(_) => Ok(()),
            Self::Http(client) => client.ping(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Store(_) => "sqlite store".to_owned(),
            Self::Http(client) => format!("collector API at {}", client.base_url()),
        }
    }
}
