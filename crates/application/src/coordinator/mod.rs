mod categories;
mod pictures;
mod refresh;
mod session;

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use jpics_domain::{Category, CategoryId, Session, SystemAlbum, SystemAlbums};
use tracing::{info, warn};

use crate::{
    ApplicationError, CategoryTree, EntityKind, GalleryApi, GalleryStore, NameMatch,
    ProgressListener, QueryShape, RetryPolicy, Subscription, SubscriptionRegistry,
};

pub use refresh::{LoadOutcome, RefreshReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub page_size: u32,
    pub stage_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            stage_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Mediates every change between the gallery server and the local store.
///
/// Mutations are confirmed remotely first and only then applied to the store,
/// after which dependent subscriptions are notified. A failed remote call
/// leaves the store untouched.
pub struct DataCoordinator {
    pub(crate) api: Arc<dyn GalleryApi>,
    pub(crate) store: Arc<dyn GalleryStore>,
    pub(crate) config: CoordinatorConfig,
    subscriptions: SubscriptionRegistry,
    session: RwLock<Session>,
    tree: RwLock<Arc<CategoryTree>>,
    system_albums: RwLock<Option<SystemAlbums>>,
    next_generation: AtomicU64,
    latest_generation: AtomicU64,
    diverged: AtomicBool,
}

impl DataCoordinator {
    pub fn new(
        api: Arc<dyn GalleryApi>,
        store: Arc<dyn GalleryStore>,
        config: CoordinatorConfig,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            config,
            subscriptions: SubscriptionRegistry::new(),
            session: RwLock::new(Session::new(server_url)),
            tree: RwLock::new(Arc::new(CategoryTree::default())),
            system_albums: RwLock::new(None),
            next_generation: AtomicU64::new(0),
            latest_generation: AtomicU64::new(0),
            diverged: AtomicBool::new(false),
        }
    }

    /// Prepares the store and rebuilds in-memory indexes from what it holds.
    pub fn initialize(&self) -> Result<(), ApplicationError> {
        self.store.initialize()?;
        let categories = self.store.list_categories()?;
        self.install_tree(&categories)?;
        if let Some(albums) = resolve_system_albums(&categories) {
            self.set_system_albums(Some(albums))?;
        }
        info!(categories = categories.len(), "local catalog ready");
        Ok(())
    }

    pub fn subscribe(&self, shape: QueryShape) -> Result<Subscription, ApplicationError> {
        self.subscriptions.subscribe(self.store.as_ref(), shape)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> Result<(), ApplicationError> {
        self.subscriptions.unsubscribe(subscription.id)
    }

    pub fn category_tree(&self) -> Arc<CategoryTree> {
        self.tree
            .read()
            .map(|tree| Arc::clone(&*tree))
            .unwrap_or_default()
    }

    /// The three reserved albums, resolved from the store when not yet known.
    pub fn system_albums(&self) -> Result<SystemAlbums, ApplicationError> {
        let known = *self
            .system_albums
            .read()
            .map_err(|_| lock_poisoned("system albums"))?;
        if let Some(albums) = known {
            return Ok(albums);
        }

        let mut found = Vec::with_capacity(SystemAlbum::ALL.len());
        for album in SystemAlbum::ALL {
            let category = self
                .store
                .find_category_by_name(album.marker(), NameMatch::Contains)?
                .ok_or_else(|| {
                    ApplicationError::NotFound(format!("system album {}", album.marker()))
                })?;
            found.push(category);
        }
        let albums = resolve_system_albums(&found).ok_or_else(|| {
            ApplicationError::NotFound("system albums".to_string())
        })?;
        self.set_system_albums(Some(albums))?;
        Ok(albums)
    }

    /// True when a batch left local and remote state out of step.
    pub fn is_diverged(&self) -> bool {
        self.diverged.load(Ordering::SeqCst)
    }

    /// Runs a full refresh if an earlier batch recorded failures.
    pub async fn reconcile(&self) -> Result<Option<RefreshReport>, ApplicationError> {
        if !self.diverged.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        info!("reconciling local catalog after partial batch failure");
        match self.refresh_everything().await {
            Ok(report) => Ok(Some(report)),
            Err(error) => {
                self.diverged.store(true, Ordering::SeqCst);
                Err(error)
            }
        }
    }

    pub(crate) fn action_token(&self) -> Result<String, ApplicationError> {
        let session = self
            .session
            .read()
            .map_err(|_| lock_poisoned("session"))?;
        session
            .action_token()
            .map(str::to_string)
            .ok_or(ApplicationError::NotAuthenticated)
    }

    pub(crate) fn publish(&self, kinds: &[EntityKind]) -> Result<(), ApplicationError> {
        self.subscriptions.notify(self.store.as_ref(), kinds)
    }

    pub(crate) fn mark_diverged<T>(&self, operation: &str, report: &crate::BatchReport<T>) {
        if !report.is_complete() {
            warn!(
                %operation,
                failed = report.failed.len(),
                succeeded = report.succeeded.len(),
                "batch finished with failures"
            );
            self.diverged.store(true, Ordering::SeqCst);
        }
    }

    /// One remote round trip under the retry policy.
    pub(crate) async fn remote<T, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<T, ApplicationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApplicationError>>,
    {
        self.config.retry.run(label, operation).await
    }

    /// One remote round trip that creates something on the server. Never
    /// retried: a lost reply may follow a call the server already applied.
    pub(crate) async fn remote_once<T, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<T, ApplicationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApplicationError>>,
    {
        RetryPolicy::none().run(label, operation).await
    }

    fn reload_tree(&self) -> Result<(), ApplicationError> {
        let categories = self.store.list_categories()?;
        self.install_tree(&categories)
    }

    fn install_tree(&self, categories: &[Category]) -> Result<(), ApplicationError> {
        let tree = Arc::new(CategoryTree::build(categories));
        *self.tree.write().map_err(|_| lock_poisoned("category tree"))? = tree;
        Ok(())
    }

    fn set_system_albums(&self, albums: Option<SystemAlbums>) -> Result<(), ApplicationError> {
        *self
            .system_albums
            .write()
            .map_err(|_| lock_poisoned("system albums"))? = albums;
        Ok(())
    }

    fn next_generation(&self) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_generation.fetch_max(generation, Ordering::SeqCst);
        generation
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation < self.latest_generation.load(Ordering::SeqCst)
    }
}

/// Sequential per-item loop shared by every batch mutation: progress `i/total`
/// before item `i`, completion after the last one.
pub(crate) async fn run_batch<T, F, Fut>(
    items: Vec<T>,
    progress: &dyn ProgressListener,
    mut apply: F,
) -> crate::BatchReport<T>
where
    T: Clone + std::fmt::Debug,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), ApplicationError>>,
{
    let mut report = crate::BatchReport::default();
    let total = items.len();
    progress.on_started();
    for (index, item) in items.into_iter().enumerate() {
        progress.on_progress(index as f32 / total as f32);
        let result = apply(item.clone()).await;
        if let Err(error) = &result {
            warn!(?item, %error, "batch item failed");
        }
        report.record(item, result);
    }
    progress.on_completed();
    report
}

fn resolve_system_albums(categories: &[Category]) -> Option<SystemAlbums> {
    let first = |album: SystemAlbum| {
        categories
            .iter()
            .filter(|category| album.matches(&category.name))
            .map(|category| category.id)
            .min()
    };
    Some(SystemAlbums {
        instant_upload: first(SystemAlbum::InstantUpload)?,
        archive: first(SystemAlbum::Archive)?,
        no_album: first(SystemAlbum::NoAlbum)?,
    })
}

fn lock_poisoned(what: &str) -> ApplicationError {
    ApplicationError::Io(format!("{what} lock poisoned"))
}

/// Drops repeated ids, keeping first-seen order.
pub(crate) fn dedup_ids<T: Copy + Eq + Hash>(ids: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub(crate) fn category_ids(categories: &[Category]) -> Vec<CategoryId> {
    categories.iter().map(|category| category.id).collect()
}
