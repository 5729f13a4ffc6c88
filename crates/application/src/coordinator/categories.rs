use std::collections::HashMap;

use jpics_domain::{validate_category_name, Category, CategoryId, Picture, PictureId};
use tracing::{debug, info, warn};

use super::{dedup_ids, run_batch, DataCoordinator};
use crate::{
    AddCategoryCommand, ApplicationError, BatchReport, DeleteCategoriesCommand, EntityKind,
    MoveCategoriesCommand, NewCategory, ProgressListener, RenameCategoryCommand,
};

impl DataCoordinator {
    pub async fn add_category(
        &self,
        command: AddCategoryCommand,
    ) -> Result<CategoryId, ApplicationError> {
        validate_category_name(&command.name)?;
        self.action_token()?;
        if let Some(parent) = command.parent {
            self.require_category(parent)?;
        }

        let request = NewCategory {
            name: command.name.trim().to_string(),
            parent: command.parent,
            visible: command.visible,
            public: command.visible,
        };
        let request = &request;
        let id = self
            .remote_once("pwg.categories.add", || async move {
                self.api.add_category(request).await.map_err(ApplicationError::from)
            })
            .await?;

        self.store
            .upsert_categories(&[Category::new(id, request.name.clone(), request.parent)])?;
        self.reload_tree()?;
        self.publish(&[EntityKind::Category])?;
        info!(%id, name = %request.name, "category added");
        Ok(id)
    }

    /// Deletes categories one after the other. The server drops sub-albums with
    /// their parent, so the local subtree goes too. Pictures are kept on both
    /// sides, only their album links go.
    pub async fn delete_categories(
        &self,
        command: DeleteCategoriesCommand,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport<CategoryId>, ApplicationError> {
        let token = self.action_token()?;
        let token = token.as_str();
        let albums = self.system_albums().ok();

        let report = run_batch(command.categories, progress, |category| async move {
            if albums.is_some_and(|albums| albums.contains(category)) {
                return Err(ApplicationError::InvalidInput(format!(
                    "category {category} is a system album"
                )));
            }
            self.remote("pwg.categories.delete", || async move {
                self.api
                    .delete_category(category, token)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;

            for doomed in self.category_tree().depth_first(category) {
                self.store.delete_category(doomed)?;
            }
            self.reload_tree()?;
            self.publish(&[EntityKind::Category, EntityKind::PictureCategory])
        })
        .await;

        self.mark_diverged("delete categories", &report);
        Ok(report)
    }

    pub async fn move_categories(
        &self,
        command: MoveCategoriesCommand,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport<CategoryId>, ApplicationError> {
        let token = self.action_token()?;
        let token = token.as_str();
        let parent = command.parent;
        if let Some(parent) = parent {
            self.require_category(parent)?;
        }

        let report = run_batch(command.categories, progress, |category| async move {
            if parent.is_some_and(|parent| self.category_tree().is_within(parent, category)) {
                return Err(ApplicationError::InvalidInput(format!(
                    "cannot move category {category} into its own subtree"
                )));
            }
            let mut moved = self.require_category(category)?;
            self.remote("pwg.categories.move", || async move {
                self.api
                    .move_category(category, parent, token)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;

            moved.parent = parent;
            self.store.upsert_categories(&[moved])?;
            self.reload_tree()?;
            self.publish(&[EntityKind::Category])
        })
        .await;

        self.mark_diverged("move categories", &report);
        Ok(report)
    }

    pub async fn rename_category(
        &self,
        command: RenameCategoryCommand,
    ) -> Result<(), ApplicationError> {
        validate_category_name(&command.name)?;
        self.action_token()?;
        let mut renamed = self.require_category(command.category)?;
        let name = command.name.trim();

        self.remote("pwg.categories.setInfo", || async move {
            self.api
                .rename_category(command.category, name)
                .await
                .map_err(ApplicationError::from)
        })
        .await?;

        renamed.name = name.to_string();
        self.store.upsert_categories(&[renamed])?;
        self.publish(&[EntityKind::Category])
    }

    /// Cached thumbnail of a category, picking a representative first when
    /// none is cached yet.
    pub async fn category_thumbnail(
        &self,
        category: CategoryId,
    ) -> Result<String, ApplicationError> {
        let found = self.require_category(category)?;
        if !found.thumbnail_url.is_empty() {
            return Ok(found.thumbnail_url);
        }
        if self.pictures_recursive(category)?.is_empty() {
            return Ok(String::new());
        }

        self.refresh_representative(category).await?;
        Ok(self
            .store
            .find_category(category)?
            .map(|category| category.thumbnail_url)
            .unwrap_or_default())
    }

    /// Picks the first picture with a thumbnail, depth first through the
    /// subtree, and sets it as representative both remotely and locally.
    /// Clears the representative when no picture qualifies.
    pub async fn refresh_representative(
        &self,
        category: CategoryId,
    ) -> Result<Option<PictureId>, ApplicationError> {
        let mut updated = self.require_category(category)?;
        let candidate = self
            .pictures_recursive(category)?
            .into_iter()
            .find(|picture| !picture.thumbnail_url.is_empty());

        match &candidate {
            Some(picture) => {
                let picture_id = picture.id;
                self.remote("pwg.categories.setRepresentative", || async move {
                    self.api
                        .set_representative(category, picture_id)
                        .await
                        .map_err(ApplicationError::from)
                })
                .await?;
                updated.representative = Some(picture.id);
                updated.thumbnail_url = picture.thumbnail_url.clone();
            }
            None => {
                self.remote("pwg.categories.deleteRepresentative", || async move {
                    self.api
                        .delete_representative(category)
                        .await
                        .map_err(ApplicationError::from)
                })
                .await?;
                updated.representative = None;
                updated.thumbnail_url.clear();
            }
        }

        debug!(%category, representative = ?updated.representative, "representative updated");
        self.store.upsert_categories(&[updated])?;
        self.publish(&[EntityKind::Category])?;
        Ok(candidate.map(|picture| picture.id))
    }

    /// Best effort: a failure is logged and the stale thumbnail stays cached.
    pub(crate) async fn refresh_representatives(&self, categories: &[CategoryId]) {
        for category in categories {
            if let Err(error) = self.refresh_representative(*category).await {
                warn!(%category, %error, "could not refresh representative");
            }
        }
    }

    /// Categories whose cached thumbnail points at one of `pictures`.
    pub(crate) fn categories_represented_by(
        &self,
        pictures: &[PictureId],
    ) -> Result<Vec<CategoryId>, ApplicationError> {
        let thumbnails: Vec<String> = self
            .store
            .find_pictures(pictures)?
            .into_iter()
            .map(|picture| picture.thumbnail_url)
            .filter(|url| !url.is_empty())
            .collect();

        Ok(self
            .store
            .list_categories()?
            .into_iter()
            .filter(|category| {
                category
                    .representative
                    .is_some_and(|picture| pictures.contains(&picture))
                    || thumbnails.contains(&category.thumbnail_url)
            })
            .map(|category| category.id)
            .collect())
    }

    /// Pictures of `category` and its descendants, depth first in child order.
    pub fn pictures_recursive(&self, category: CategoryId) -> Result<Vec<Picture>, ApplicationError> {
        let include_archived = self
            .system_albums()
            .is_ok_and(|albums| albums.archive == category);

        let mut ids = Vec::new();
        for member in self.category_tree().depth_first(category) {
            ids.extend(self.store.category_pictures(member)?);
        }
        let ids = dedup_ids(ids);

        let mut by_id: HashMap<PictureId, Picture> = self
            .store
            .find_pictures(&ids)?
            .into_iter()
            .map(|picture| (picture.id, picture))
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .filter(|picture| include_archived || !picture.archived)
            .collect())
    }

    /// Navigable children of `parent`, system albums excluded.
    pub fn visible_children(
        &self,
        parent: Option<CategoryId>,
    ) -> Result<Vec<Category>, ApplicationError> {
        let tree = self.category_tree();
        let mut children = Vec::new();
        for id in tree.children(parent) {
            if let Some(category) = self.store.find_category(*id)? {
                if !category.is_system() {
                    children.push(category);
                }
            }
        }
        Ok(children)
    }

    /// Root first, ending with `category` itself.
    pub fn category_path(&self, category: CategoryId) -> Result<Vec<Category>, ApplicationError> {
        let mut path = Vec::new();
        for id in self.category_tree().ancestors(category).into_iter().rev() {
            path.push(self.require_category(id)?);
        }
        Ok(path)
    }

    pub(crate) fn require_category(&self, category: CategoryId) -> Result<Category, ApplicationError> {
        self.store
            .find_category(category)?
            .ok_or_else(|| ApplicationError::NotFound(format!("category {category}")))
    }
}
