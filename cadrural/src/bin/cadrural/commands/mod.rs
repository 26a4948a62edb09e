pub mod dashboard;
pub mod normalize;
pub mod seed;
pub mod serve;

use anyhow::{Context, Result};
use cadrural::{AppConfig, Client, StorageBackend};

use crate::output::OutputManager;

/// Opens the configured store.
pub async fn connect(config: &AppConfig, output: &OutputManager) -> Result<Client> {
    if config.storage.backend == StorageBackend::Redis {
        output.info(&format!("Connecting to Redis (prefix '{}')", config.storage.prefix));
    }
    let client = Client::from_config(config)
        .await
        .context("Failed to open the configured store")?;
    Ok(client)
}

/// Warns that data written by a one-shot command disappears with the process.
pub fn warn_if_ephemeral(config: &AppConfig, output: &OutputManager) {
    if config.storage.backend == StorageBackend::Memory {
        output.warning("Using the in-memory store: data is discarded when this command exits.");
        output.info("Set [storage] backend = \"redis\" in cadrural.toml to persist it.");
    }
}
