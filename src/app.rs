use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheStorage, NoopStorage, SnapshotStorage, SqliteStorage};
use crate::catalog::CatalogStore;
use crate::config::{CacheConfig, Config};
use crate::gateway::{Gateway, RestGateway};
use crate::orders::OrderStore;

/// Both stores wired to one shared gateway.
///
/// Build one per process and hand it to whatever renders the data.
pub struct Storefront<G: Gateway, S: CacheStorage + 'static = SnapshotStorage> {
  pub catalog: CatalogStore<G, S>,
  pub orders: OrderStore<G>,
}

impl Storefront<RestGateway> {
  /// Build the REST gateway and both stores from configuration.
  pub fn from_config(config: &Config) -> Result<Self> {
    let gateway = RestGateway::new(
      &config.backend.url,
      Config::get_anon_key()?,
      Config::get_access_token(),
      config.request_timeout(),
    )
    .map_err(|e| eyre!("Failed to create backend client: {}", e))?;

    let snapshots = snapshot_storage(&config.cache);
    let namespace = gateway.base_url().to_string();
    let storefront = Self::new(Arc::new(gateway), config, snapshots, namespace);
    if storefront.catalog.hydrate() {
      debug!("catalog snapshot loaded");
    }
    Ok(storefront)
  }
}

/// Open the snapshot database if persistence is on; without it the catalog
/// lives in memory only.
fn snapshot_storage(cache: &CacheConfig) -> SnapshotStorage {
  if !cache.persist {
    return SnapshotStorage::Disabled(NoopStorage);
  }

  match SqliteStorage::open() {
    Ok(storage) => SnapshotStorage::Sqlite(storage),
    Err(e) => {
      warn!(error = %e, "snapshot database unavailable, caching in memory only");
      SnapshotStorage::Disabled(NoopStorage)
    }
  }
}

impl<G: Gateway, S: CacheStorage + 'static> Storefront<G, S> {
  pub fn new(
    gateway: Arc<G>,
    config: &Config,
    snapshots: S,
    namespace: impl Into<String>,
  ) -> Self {
    let catalog = CatalogStore::with_storage(
      Arc::clone(&gateway),
      config.catalog_options(),
      snapshots,
      namespace,
    );
    let orders = OrderStore::new(gateway, config.placeholder_image.clone());

    Self { catalog, orders }
  }
}
