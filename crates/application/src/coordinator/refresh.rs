use std::collections::HashMap;
use std::future::Future;

use jpics_domain::{Category, CategoryId, PictureId, SystemAlbum};
use tracing::{debug, info, warn};

use super::{category_ids, dedup_ids, resolve_system_albums, DataCoordinator};
use crate::{
    ApplicationError, EntityKind, LoadPicturesCommand, NewCategory, PictureQuery, RemotePicture,
};

/// Row counts mirrored by a full refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub categories: usize,
    pub pictures: usize,
    pub tags: usize,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<PictureId>),
    /// A newer load started before this one finished; nothing was written.
    Superseded,
}

impl DataCoordinator {
    /// Categories, then pictures, then tags, then users. The first failing or
    /// timed out stage ends the refresh with its error.
    pub async fn refresh_everything(&self) -> Result<RefreshReport, ApplicationError> {
        let categories = self.stage("categories", self.refresh_categories()).await?;
        let pictures = self.stage("pictures", self.refresh_pictures()).await?;
        let tags = self.stage("tags", self.refresh_tags()).await?;
        let users = self.stage("users", self.refresh_users()).await?;

        let report = RefreshReport {
            categories,
            pictures,
            tags,
            users,
        };
        info!(?report, "full refresh complete");
        Ok(report)
    }

    /// Mirrors the category list and makes sure every system album exists,
    /// creating missing ones in bootstrap order.
    pub async fn refresh_categories(&self) -> Result<usize, ApplicationError> {
        let mut categories = self.mirror_categories().await?;

        for _ in 0..=SystemAlbum::ALL.len() * 2 {
            let missing = SystemAlbum::ALL.into_iter().find(|album| {
                !categories
                    .iter()
                    .any(|category| album.matches(&category.name))
            });
            let Some(album) = missing else {
                let albums = resolve_system_albums(&categories).ok_or_else(|| {
                    ApplicationError::Bootstrap("system albums vanished".to_string())
                })?;
                self.set_system_albums(Some(albums))?;
                info!(count = categories.len(), "categories refreshed");
                return Ok(categories.len());
            };

            info!(album = album.marker(), "creating missing system album");
            let request = NewCategory {
                name: album.marker().to_string(),
                parent: None,
                visible: false,
                public: false,
            };
            let request = &request;
            let created = self
                .remote_once("pwg.categories.add", || async move {
                    self.api.add_category(request).await.map_err(ApplicationError::from)
                })
                .await;
            match created {
                Ok(id) => debug!(%id, album = album.marker(), "system album created"),
                Err(error) if error.is_transient() => warn!(
                    album = album.marker(),
                    %error,
                    "system album creation unconfirmed, listing again"
                ),
                Err(error) => return Err(error),
            }
            categories = self.mirror_categories().await?;
        }

        Err(ApplicationError::Bootstrap(
            "system albums still missing after creating them".to_string(),
        ))
    }

    pub async fn refresh_pictures(&self) -> Result<usize, ApplicationError> {
        let remote = self.fetch_pictures(None, None).await?.unwrap_or_default();
        let ids: Vec<PictureId> = remote.iter().map(|entry| entry.picture.id).collect();

        self.store.retain_pictures(&ids)?;
        self.apply_remote_pictures(&remote)?;
        self.publish(&[EntityKind::Picture, EntityKind::PictureCategory])?;
        info!(count = ids.len(), "pictures refreshed");
        Ok(ids.len())
    }

    /// Mirrors the tag list and rebuilds picture to tag relations tag by tag.
    pub async fn refresh_tags(&self) -> Result<usize, ApplicationError> {
        let tags = self
            .remote("pwg.tags.getAdminList", || async move {
                self.api.list_tags().await.map_err(ApplicationError::from)
            })
            .await?;
        let ids: Vec<_> = tags.iter().map(|tag| tag.id).collect();
        self.store.retain_tags(&ids)?;
        self.store.upsert_tags(&tags)?;

        for tag in &tags {
            let pictures = self.fetch_tag_pictures(tag.id).await?;
            self.store.retain_tag_pictures(tag.id, &pictures)?;
            let links: Vec<_> = pictures.iter().map(|picture| (*picture, tag.id)).collect();
            self.store.link_picture_tags(&links)?;
        }

        self.publish(&[EntityKind::Tag, EntityKind::PictureTag])?;
        info!(count = tags.len(), "tags refreshed");
        Ok(tags.len())
    }

    pub async fn refresh_users(&self) -> Result<usize, ApplicationError> {
        let users = self
            .remote("pwg.users.getList", || async move {
                self.api.list_users().await.map_err(ApplicationError::from)
            })
            .await?;
        let ids: Vec<_> = users.iter().map(|user| user.id).collect();
        let removed = self.store.retain_users(&ids)?;
        self.store.upsert_users(&users)?;
        self.publish(&[EntityKind::User])?;
        info!(count = users.len(), removed = removed.len(), "users refreshed");
        Ok(users.len())
    }

    /// Pages the pictures of one category view. Starting another load
    /// supersedes this one.
    pub async fn load_category_pictures(
        &self,
        command: LoadPicturesCommand,
    ) -> Result<LoadOutcome, ApplicationError> {
        let generation = self.next_generation();
        let categories = command.categories;

        let Some(remote) = self
            .fetch_pictures(Some(categories.clone()), Some(generation))
            .await?
        else {
            return Ok(LoadOutcome::Superseded);
        };
        if self.is_stale(generation) {
            debug!(generation, "discarding superseded picture load");
            return Ok(LoadOutcome::Superseded);
        }

        let ids: Vec<PictureId> = remote.iter().map(|entry| entry.picture.id).collect();
        for category in &categories {
            let kept: Vec<PictureId> = remote
                .iter()
                .filter(|entry| entry.categories.contains(category))
                .map(|entry| entry.picture.id)
                .collect();
            self.store.retain_category_pictures(*category, &kept)?;
        }
        self.apply_remote_pictures(&remote)?;
        self.publish(&[EntityKind::Picture, EntityKind::PictureCategory])?;
        Ok(LoadOutcome::Loaded(ids))
    }

    async fn stage<T>(
        &self,
        name: &'static str,
        work: impl Future<Output = Result<T, ApplicationError>>,
    ) -> Result<T, ApplicationError> {
        match tokio::time::timeout(self.config.stage_timeout, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                warn!(stage = name, %error, "refresh stage failed");
                Err(error)
            }
            Err(_) => {
                warn!(stage = name, "refresh stage timed out");
                Err(ApplicationError::Timeout(format!("{name} refresh")))
            }
        }
    }

    async fn mirror_categories(&self) -> Result<Vec<Category>, ApplicationError> {
        let categories = self
            .remote("pwg.categories.getList", || async move {
                self.api.list_categories(true).await.map_err(ApplicationError::from)
            })
            .await?;

        let removed = self.store.retain_categories(&category_ids(&categories))?;
        if !removed.is_empty() {
            debug!(count = removed.len(), "dropped categories missing on server");
        }
        self.store.upsert_categories(&categories)?;
        self.install_tree(&categories)?;
        self.publish(&[EntityKind::Category, EntityKind::PictureCategory])?;
        Ok(categories)
    }

    /// Requests pages until one comes back short. Returns `None` when the
    /// generation went stale between pages.
    async fn fetch_pictures(
        &self,
        categories: Option<Vec<CategoryId>>,
        generation: Option<u64>,
    ) -> Result<Option<Vec<RemotePicture>>, ApplicationError> {
        let per_page = self.config.page_size.max(1);
        let mut positions: HashMap<PictureId, usize> = HashMap::new();
        let mut pictures: Vec<RemotePicture> = Vec::new();
        let mut page = 0;

        loop {
            if generation.is_some_and(|generation| self.is_stale(generation)) {
                return Ok(None);
            }

            let query = PictureQuery {
                categories: categories.clone(),
                page,
                per_page,
            };
            let query = &query;
            let batch = self
                .remote("jpics.categories.getImages", || async move {
                    self.api.list_pictures(query).await.map_err(ApplicationError::from)
                })
                .await?;
            let short = batch.len() < per_page as usize;
            debug!(page, received = batch.len(), "picture page");

            for entry in batch {
                match positions.get(&entry.picture.id) {
                    Some(&index) => pictures[index] = entry,
                    None => {
                        positions.insert(entry.picture.id, pictures.len());
                        pictures.push(entry);
                    }
                }
            }

            if short {
                return Ok(Some(pictures));
            }
            page += 1;
        }
    }

    async fn fetch_tag_pictures(
        &self,
        tag: jpics_domain::TagId,
    ) -> Result<Vec<PictureId>, ApplicationError> {
        let per_page = self.config.page_size.max(1);
        let mut pictures = Vec::new();
        let mut page = 0;

        loop {
            let batch = self
                .remote("pwg.tags.getImages", || async move {
                    self.api.tag_pictures(tag, page, per_page).await.map_err(ApplicationError::from)
                })
                .await?;
            let short = batch.len() < per_page as usize;
            pictures.extend(batch);
            if short {
                return Ok(dedup_ids(pictures));
            }
            page += 1;
        }
    }

    /// Upserts pictures and replaces their category and tag links with the
    /// ones the server reported.
    pub(crate) fn apply_remote_pictures(
        &self,
        remote: &[RemotePicture],
    ) -> Result<(), ApplicationError> {
        let pictures: Vec<_> = remote.iter().map(|entry| entry.picture.clone()).collect();
        self.store.upsert_pictures(&pictures)?;

        let mut category_links = Vec::new();
        let mut tag_links = Vec::new();
        for entry in remote {
            self.store
                .retain_picture_categories(entry.picture.id, &entry.categories)?;
            category_links.extend(
                entry
                    .categories
                    .iter()
                    .map(|category| (entry.picture.id, *category)),
            );
            tag_links.extend(entry.tags.iter().map(|tag| (entry.picture.id, *tag)));
        }
        self.store.link_picture_categories(&category_links)?;
        self.store.link_picture_tags(&tag_links)?;
        Ok(())
    }
}
