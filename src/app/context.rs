//! Services shared by every command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use romifleur_core::achievements::CACHE_FILE;
use romifleur_core::config::default_data_dir;
use romifleur_core::{
    AchievementsClient, CatalogFetcher, CatalogRegistry, DownloadQueue, HttpClient, SettingsStore,
};
use tracing::{debug, info};

/// Registry file looked up in the data directory when `--consoles` is absent.
pub(crate) const REGISTRY_FILE: &str = "consoles.json";

/// Saved queue file inside the data directory.
pub(crate) const QUEUE_FILE: &str = "queue.json";

pub(crate) struct AppContext {
    pub data_dir: PathBuf,
    pub settings: Arc<SettingsStore>,
    pub registry: Arc<CatalogRegistry>,
    pub client: HttpClient,
    pub fetcher: CatalogFetcher,
    pub achievements: AchievementsClient,
}

impl AppContext {
    pub(crate) fn build(data_dir: Option<PathBuf>, consoles: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        debug!(data_dir = %data_dir.display(), "resolved data directory");

        let settings = Arc::new(SettingsStore::load(&data_dir));
        let registry = Arc::new(load_registry(&data_dir, consoles)?);
        info!(collections = registry.len(), "registry ready");

        let client = HttpClient::new();
        let fetcher = CatalogFetcher::new(Arc::clone(&registry), client.clone());
        let achievements = AchievementsClient::new(client.clone(), Arc::clone(&settings))
            .with_cache_file(data_dir.join(CACHE_FILE));

        Ok(Self {
            data_dir,
            settings,
            registry,
            client,
            fetcher,
            achievements,
        })
    }

    pub(crate) fn queue_path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_FILE)
    }

    pub(crate) fn load_queue(&self) -> Result<DownloadQueue> {
        let path = self.queue_path();
        DownloadQueue::load(&path)
            .with_context(|| format!("cannot load saved queue {}", path.display()))
    }

    pub(crate) fn save_queue(&self, queue: &DownloadQueue) -> Result<()> {
        let path = self.queue_path();
        queue
            .save(&path)
            .with_context(|| format!("cannot save queue to {}", path.display()))
    }
}

/// Explicit file, then `<data dir>/consoles.json`, then the bundled registry.
fn load_registry(data_dir: &Path, explicit: Option<&Path>) -> Result<CatalogRegistry> {
    if let Some(path) = explicit {
        return CatalogRegistry::load(path)
            .with_context(|| format!("cannot load registry {}", path.display()));
    }
    let local = data_dir.join(REGISTRY_FILE);
    if local.is_file() {
        return CatalogRegistry::load(&local)
            .with_context(|| format!("cannot load registry {}", local.display()));
    }
    CatalogRegistry::builtin().context("bundled registry is invalid")
}
