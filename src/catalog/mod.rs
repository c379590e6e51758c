//! Catalog cache store: categories and items with a time-based staleness
//! policy and derived lookups.

mod normalize;
mod types;

pub use normalize::{categories_from_rows, item_from_row, items_from_rows};
pub use types::{Category, ImageRef, Item};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheSource, CacheStorage, Freshness, NoopStorage};
use crate::error::StoreError;
use crate::gateway::Gateway;
use crate::loading::LoadingGuard;

/// Default time before cached catalog data is considered stale.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Bundled image used for items without a hero image.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "assets/images/cake-2.jpeg";

#[derive(Debug, Clone)]
pub struct CatalogOptions {
  pub items_stale_time: Duration,
  pub categories_stale_time: Duration,
  pub placeholder_image: String,
}

impl Default for CatalogOptions {
  fn default() -> Self {
    Self {
      items_stale_time: DEFAULT_STALE_TIME,
      categories_stale_time: DEFAULT_STALE_TIME,
      placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
    }
  }
}

/// Fetch stamps for each entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastFetched {
  pub items: Freshness,
  pub categories: Freshness,
}

/// Everything the catalog store knows.
#[derive(Debug, Clone)]
pub struct CatalogState {
  pub categories: Vec<Category>,
  pub items: Vec<Item>,
  pub loading: bool,
  pub error: Option<StoreError>,
  pub last_fetched: LastFetched,
}

impl CatalogState {
  fn new(options: &CatalogOptions) -> Self {
    Self {
      categories: Vec::new(),
      items: Vec::new(),
      loading: false,
      error: None,
      last_fetched: LastFetched {
        items: Freshness::new(options.items_stale_time),
        categories: Freshness::new(options.categories_stale_time),
      },
    }
  }

  /// Both collections are populated and both are within their stale time.
  pub fn is_fresh_at(&self, now: Instant) -> bool {
    !self.categories.is_empty()
      && !self.items.is_empty()
      && self.last_fetched.items.is_fresh_at(now)
      && self.last_fetched.categories.is_fresh_at(now)
  }

  pub fn items_by_category(&self, category_id: i64) -> Vec<Item> {
    self
      .items
      .iter()
      .filter(|item| item.category_id == category_id)
      .cloned()
      .collect()
  }

  pub fn item_by_id(&self, id: i64) -> Option<&Item> {
    self.items.iter().find(|item| item.id == id)
  }

  pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
    self.categories.iter().find(|category| category.slug == slug)
  }
}

/// In-memory catalog cache in front of a [`Gateway`].
///
/// Construct one per process and share it by reference (or `Arc`). State
/// changes are published through a watch channel so views can re-read the
/// derived lookups when something changes.
pub struct CatalogStore<G: Gateway, S: CacheStorage + 'static = NoopStorage> {
  gateway: Arc<G>,
  storage: Arc<S>,
  /// Snapshot namespace, usually the backend URL
  namespace: String,
  options: CatalogOptions,
  state: watch::Sender<CatalogState>,
  /// Held for the duration of a remote fetch so overlapping callers wait
  /// for it instead of issuing their own requests
  fetch_lock: Mutex<()>,
}

impl<G: Gateway> CatalogStore<G, NoopStorage> {
  /// A store that keeps everything in memory.
  pub fn new(gateway: Arc<G>, options: CatalogOptions) -> Self {
    Self::with_storage(gateway, options, NoopStorage, "")
  }
}

impl<G: Gateway, S: CacheStorage + 'static> CatalogStore<G, S> {
  /// A store that also persists each successful fetch to `storage`.
  pub fn with_storage(
    gateway: Arc<G>,
    options: CatalogOptions,
    storage: S,
    namespace: impl Into<String>,
  ) -> Self {
    let (state, _) = watch::channel(CatalogState::new(&options));
    Self {
      gateway,
      storage: Arc::new(storage),
      namespace: namespace.into(),
      options,
      state,
      fetch_lock: Mutex::new(()),
    }
  }

  /// Clone of the current state.
  pub fn state(&self) -> CatalogState {
    self.state.borrow().clone()
  }

  /// Receiver notified on every state change.
  pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
    self.state.subscribe()
  }

  pub fn categories(&self) -> Vec<Category> {
    self.state.borrow().categories.clone()
  }

  pub fn items(&self) -> Vec<Item> {
    self.state.borrow().items.clone()
  }

  pub fn is_loading(&self) -> bool {
    self.state.borrow().loading
  }

  pub fn error(&self) -> Option<StoreError> {
    self.state.borrow().error.clone()
  }

  pub fn items_by_category(&self, category_id: i64) -> Vec<Item> {
    self.state.borrow().items_by_category(category_id)
  }

  pub fn item_by_id(&self, id: i64) -> Option<Item> {
    self.state.borrow().item_by_id(id).cloned()
  }

  pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
    self.state.borrow().category_by_slug(slug).cloned()
  }

  fn is_fresh(&self) -> bool {
    self.state.borrow().is_fresh_at(Instant::now())
  }

  /// Make sure the catalog is loaded and fresh.
  ///
  /// Returns without any remote call while both collections are populated
  /// and within their stale time. Otherwise categories and items are
  /// fetched concurrently and replaced wholesale. On failure the previous
  /// collections stay in place and the error is recorded in state as well as
  /// returned.
  pub async fn fetch_data(&self) -> Result<CacheSource, StoreError> {
    if self.is_fresh() {
      return Ok(CacheSource::CacheFresh);
    }

    let _guard = self.fetch_lock.lock().await;
    if self.is_fresh() {
      debug!("catalog refreshed by a concurrent fetch");
      return Ok(CacheSource::CacheFresh);
    }

    let started = Instant::now();
    let _loading = LoadingGuard::start(&self.state, loading_flag, |state| state.error = None);

    let result = futures::try_join!(self.gateway.list_categories(), self.gateway.list_items());

    match result {
      Ok((category_rows, item_rows)) => {
        let categories = categories_from_rows(self.gateway.as_ref(), category_rows);
        let items = items_from_rows(
          self.gateway.as_ref(),
          item_rows,
          &self.options.placeholder_image,
        );

        self.persist(categories.clone(), items.clone()).await;
        info!(
          categories = categories.len(),
          items = items.len(),
          "catalog fetched"
        );

        self.state.send_modify(|state| {
          state.categories = categories;
          state.items = items;
          state.last_fetched.categories.stamp(started);
          state.last_fetched.items.stamp(started);
          state.loading = false;
        });
        Ok(CacheSource::Network)
      }
      Err(e) => {
        let err = StoreError::from(e);
        warn!(error = %err, "catalog fetch failed, keeping previous data");
        self.state.send_modify(|state| {
          state.error = Some(err.clone());
          state.loading = false;
        });
        Err(err)
      }
    }
  }

  /// Mark both entity types stale without dropping the data.
  pub fn invalidate(&self) {
    self.state.send_modify(|state| {
      state.last_fetched.categories.invalidate();
      state.last_fetched.items.invalidate();
    });
  }

  /// Refetch regardless of freshness.
  pub async fn refresh(&self) -> Result<CacheSource, StoreError> {
    self.invalidate();
    self.fetch_data().await
  }

  /// Load the persisted snapshot into an empty store.
  ///
  /// Returns true if data was loaded. Stamps are back-dated by the
  /// snapshot's age, so an old snapshot is served but refetched on the next
  /// `fetch_data`.
  pub fn hydrate(&self) -> bool {
    {
      let state = self.state.borrow();
      if !state.categories.is_empty() || !state.items.is_empty() {
        return false;
      }
    }

    let categories = match self.storage.load_list::<Category>(&self.namespace) {
      Ok(Some(list)) => list,
      Ok(None) => return false,
      Err(e) => {
        warn!(error = %e, "failed to load category snapshot");
        return false;
      }
    };
    let items = match self.storage.load_list::<Item>(&self.namespace) {
      Ok(Some(list)) => list,
      Ok(None) => return false,
      Err(e) => {
        warn!(error = %e, "failed to load item snapshot");
        return false;
      }
    };

    // Both lists are written with one timestamp; a mismatch means one of
    // the writes failed and the pair spans two fetches
    if categories.cached_at != items.cached_at {
      warn!("catalog snapshot is incomplete, ignoring it");
      return false;
    }

    debug!(
      categories = categories.entities.len(),
      items = items.entities.len(),
      "hydrated catalog from snapshot"
    );

    self.state.send_modify(|state| {
      state.categories = categories.entities;
      state.items = items.entities;
      state
        .last_fetched
        .categories
        .stamp_from_wall_clock(categories.cached_at);
      state.last_fetched.items.stamp_from_wall_clock(items.cached_at);
    });
    true
  }

  /// Write the snapshot on the blocking pool; failures are only logged.
  async fn persist(&self, categories: Vec<Category>, items: Vec<Item>) {
    let storage = Arc::clone(&self.storage);
    let namespace = self.namespace.clone();
    let now = Utc::now();

    let result = tokio::task::spawn_blocking(move || {
      storage.store_list(&namespace, &categories, now)?;
      storage.store_list(&namespace, &items, now)
    })
    .await;

    match result {
      Ok(Ok(())) => {}
      Ok(Err(e)) => warn!(error = %e, "failed to persist catalog snapshot"),
      Err(e) => warn!(error = %e, "snapshot task failed"),
    }
  }
}

fn loading_flag(state: &mut CatalogState) -> &mut bool {
  &mut state.loading
}
