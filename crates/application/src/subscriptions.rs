use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use jpics_domain::{Category, CategoryId, Picture, PictureId, Tag, User};
use tracing::debug;

use crate::{ApplicationError, GalleryStore, PictureScope};

/// Row families a local write can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Picture,
    Tag,
    User,
    PictureCategory,
    PictureTag,
}

/// The shape of a live query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryShape {
    Categories,
    /// Navigable children of a category, system albums excluded.
    VisibleChildren(Option<CategoryId>),
    Pictures(PictureScope),
    Picture(PictureId),
    Tags,
    Users,
}

impl QueryShape {
    pub fn depends_on(&self, kind: EntityKind) -> bool {
        match self {
            Self::Categories | Self::VisibleChildren(_) => kind == EntityKind::Category,
            Self::Pictures(PictureScope::Tagged(_)) => {
                matches!(kind, EntityKind::Picture | EntityKind::PictureTag)
            }
            Self::Pictures(_) => {
                matches!(kind, EntityKind::Picture | EntityKind::PictureCategory)
            }
            Self::Picture(_) => kind == EntityKind::Picture,
            Self::Tags => kind == EntityKind::Tag,
            Self::Users => kind == EntityKind::User,
        }
    }

    pub fn evaluate(&self, store: &dyn GalleryStore) -> Result<QueryResult, ApplicationError> {
        Ok(match self {
            Self::Categories => QueryResult::Categories(store.list_categories()?),
            Self::VisibleChildren(parent) => QueryResult::Categories(
                store
                    .list_categories()?
                    .into_iter()
                    .filter(|category| category.parent == *parent && !category.is_system())
                    .collect(),
            ),
            Self::Pictures(scope) => QueryResult::Pictures(store.list_pictures(scope)?),
            Self::Picture(id) => QueryResult::Picture(store.find_picture(*id)?),
            Self::Tags => QueryResult::Tags(store.list_tags()?),
            Self::Users => QueryResult::Users(store.list_users()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Categories(Vec<Category>),
    Pictures(Vec<Picture>),
    Picture(Option<Picture>),
    Tags(Vec<Tag>),
    Users(Vec<User>),
}

/// Receiving end of a live query.
pub struct Subscription {
    pub id: u64,
    pub shape: QueryShape,
    receiver: mpsc::Receiver<QueryResult>,
}

impl Subscription {
    pub fn recv_timeout(&self, timeout: Duration) -> Option<QueryResult> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drains pending results and keeps only the newest one.
    pub fn latest(&self) -> Option<QueryResult> {
        let mut newest = None;
        while let Ok(result) = self.receiver.try_recv() {
            newest = Some(result);
        }
        newest
    }
}

struct Subscriber {
    id: u64,
    shape: QueryShape,
    sender: mpsc::Sender<QueryResult>,
}

/// Publish/subscribe registry keyed by query shape. Writers call `notify`
/// with the entity kinds they touched; only dependent shapes are re-evaluated,
/// once per distinct shape.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        store: &dyn GalleryStore,
        shape: QueryShape,
    ) -> Result<Subscription, ApplicationError> {
        let (sender, receiver) = mpsc::channel();
        let initial = shape.evaluate(store)?;
        let _ = sender.send(initial);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock()?.push(Subscriber {
            id,
            shape: shape.clone(),
            sender,
        });

        Ok(Subscription {
            id,
            shape,
            receiver,
        })
    }

    pub fn unsubscribe(&self, id: u64) -> Result<(), ApplicationError> {
        self.lock()?.retain(|subscriber| subscriber.id != id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(
        &self,
        store: &dyn GalleryStore,
        kinds: &[EntityKind],
    ) -> Result<(), ApplicationError> {
        let mut subscribers = self.lock()?;
        let mut evaluated: Vec<(QueryShape, QueryResult)> = Vec::new();
        let mut disconnected = Vec::new();

        for subscriber in subscribers.iter() {
            if !kinds.iter().any(|kind| subscriber.shape.depends_on(*kind)) {
                continue;
            }

            let cached = evaluated
                .iter()
                .find(|(shape, _)| *shape == subscriber.shape)
                .map(|(_, result)| result.clone());
            let result = match cached {
                Some(result) => result,
                None => {
                    let result = subscriber.shape.evaluate(store)?;
                    evaluated.push((subscriber.shape.clone(), result.clone()));
                    result
                }
            };

            if subscriber.sender.send(result).is_err() {
                disconnected.push(subscriber.id);
            }
        }

        if !disconnected.is_empty() {
            debug!(count = disconnected.len(), "dropping closed subscriptions");
            subscribers.retain(|subscriber| !disconnected.contains(&subscriber.id));
        }

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Subscriber>>, ApplicationError> {
        self.subscribers
            .lock()
            .map_err(|_| ApplicationError::Io("subscription registry lock poisoned".to_string()))
    }
}
