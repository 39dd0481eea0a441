//! Wiring from configuration to a running chain instance

use crate::blockchain::{Chain, ChainStores};
use crate::config::{Config, StorageBackend, StorageConfig};
use crate::error::StoreError;
use crate::persistence::Database;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` wins over `filter` when set.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

/// Opens the stores selected by `storage`. The SQLite backend serves all three
/// stores from one `Database`, so block commits are atomic and a restarted
/// node picks up the stored chain.
pub fn open_stores(storage: &StorageConfig) -> Result<ChainStores, StoreError> {
    match storage.backend {
        StorageBackend::Memory => Ok(ChainStores::in_memory()),
        StorageBackend::Sqlite => {
            let path = std::path::Path::new(&storage.path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Database(format!("Failed to create data dir {:?}: {}", parent, e))
                    })?;
                }
            }
            let db = Arc::new(Database::open(&storage.path)?);
            Ok(ChainStores {
                blocks: db.clone(),
                transactions: db.clone(),
                utxos: db,
            })
        }
    }
}

pub struct Node {
    pub config: Config,
    pub chain: Arc<Chain>,
}

impl Node {
    pub fn init(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let genesis = config.genesis()?;
        let stores = open_stores(&config.storage)?;
        let chain = Chain::with_stores(&genesis, stores)?;
        info!(
            "Chain ready (backend = {:?}, height = {}, genesis address = {})",
            config.storage.backend,
            chain.height(),
            chain.genesis_address()
        );

        Ok(Node {
            config,
            chain: Arc::new(chain),
        })
    }
}
