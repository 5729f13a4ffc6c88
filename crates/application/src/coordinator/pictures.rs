use jpics_domain::{validate_tag_name, CategoryId, Picture, PictureId, Tag, TagId};
use tracing::info;

use super::{dedup_ids, run_batch, DataCoordinator};
use crate::{
    AddTagsCommand, AddToCategoriesCommand, ApplicationError, ArchivePicturesCommand,
    BatchReport, DeletePicturesCommand, EntityKind, MovePicturesCommand, MultipleValueMode,
    PictureInfoUpdate, ProgressListener, RemoveFromCategoryCommand, SetPictureDateCommand,
    SetPictureNameCommand, SetPictureTagsCommand, SingleValueMode,
};

impl DataCoordinator {
    pub async fn add_pictures_to_categories(
        &self,
        command: AddToCategoriesCommand,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport<PictureId>, ApplicationError> {
        self.action_token()?;
        let categories = dedup_ids(command.categories);
        let categories = categories.as_slice();

        let report = run_batch(command.pictures, progress, |picture| async move {
            let mut update = PictureInfoUpdate::new(picture);
            update.categories = Some(categories.to_vec());
            update.multiple_value_mode = MultipleValueMode::Append;
            self.push_picture_info(&update).await?;

            let links: Vec<_> = categories
                .iter()
                .map(|category| (picture, *category))
                .collect();
            self.store.link_picture_categories(&links)?;
            self.publish(&[EntityKind::PictureCategory])
        })
        .await;

        self.mark_diverged("add pictures to categories", &report);
        Ok(report)
    }

    /// Removes pictures from `category`. A picture that would be left in no
    /// category moves to the archive album, or to the no-album album when it
    /// is being removed from the archive.
    pub async fn remove_pictures_from_category(
        &self,
        command: RemoveFromCategoryCommand,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport<PictureId>, ApplicationError> {
        self.action_token()?;
        let albums = self.system_albums()?;
        let category = command.category;

        let report = run_batch(command.pictures, progress, |picture| async move {
            let remaining: Vec<CategoryId> = self
                .store
                .picture_categories(picture)?
                .into_iter()
                .filter(|linked| *linked != category)
                .collect();
            let fallback = remaining.is_empty().then(|| {
                if category == albums.archive {
                    albums.no_album
                } else {
                    albums.archive
                }
            });

            let mut update = PictureInfoUpdate::new(picture);
            update.categories = Some(match fallback {
                Some(fallback) => vec![fallback],
                None => remaining,
            });
            update.multiple_value_mode = MultipleValueMode::Replace;
            self.push_picture_info(&update).await?;

            self.store.unlink_picture_category(picture, category)?;
            if let Some(fallback) = fallback {
                info!(%picture, %fallback, "picture left without album, reassigned");
                self.store.link_picture_categories(&[(picture, fallback)])?;
            }
            self.publish(&[EntityKind::PictureCategory])
        })
        .await;

        if self
            .categories_represented_by(&report.succeeded)?
            .contains(&category)
        {
            self.refresh_representatives(&[category]).await;
        }
        self.mark_diverged("remove pictures from category", &report);
        Ok(report)
    }

    /// Makes `category` the only album of every picture.
    pub async fn move_pictures_to_category(
        &self,
        command: MovePicturesCommand,
        progress: &dyn ProgressListener,
    ) -> Result<(), ApplicationError> {
        self.action_token()?;
        self.require_category(command.category)?;
        let represented = self.categories_represented_by(&command.pictures)?;
        let pictures = command.pictures.as_slice();
        let category = command.category;

        progress.on_started();
        self.remote("jpics.images.moveToCategory", || async move {
            self.api
                .move_pictures_to_category(pictures, category)
                .await
                .map_err(ApplicationError::from)
        })
        .await?;

        for picture in pictures {
            self.store.retain_picture_categories(*picture, &[category])?;
        }
        let links: Vec<_> = pictures.iter().map(|picture| (*picture, category)).collect();
        self.store.link_picture_categories(&links)?;
        self.publish(&[EntityKind::PictureCategory])?;
        self.refresh_representatives(&represented).await;
        progress.on_completed();
        Ok(())
    }

    pub async fn delete_pictures(
        &self,
        command: DeletePicturesCommand,
    ) -> Result<(), ApplicationError> {
        let token = self.action_token()?;
        let token = token.as_str();
        let represented = self.categories_represented_by(&command.pictures)?;
        let pictures = command.pictures.as_slice();

        self.remote("pwg.images.delete", || async move {
            self.api
                .delete_pictures(pictures, token)
                .await
                .map_err(ApplicationError::from)
        })
        .await?;

        self.store.delete_pictures(pictures)?;
        self.publish(&[
            EntityKind::Picture,
            EntityKind::PictureCategory,
            EntityKind::PictureTag,
        ])?;
        info!(count = pictures.len(), "pictures deleted");
        self.refresh_representatives(&represented).await;
        Ok(())
    }

    pub async fn archive_pictures(
        &self,
        command: ArchivePicturesCommand,
    ) -> Result<(), ApplicationError> {
        self.action_token()?;
        let represented = if command.archive {
            self.categories_represented_by(&command.pictures)?
        } else {
            Vec::new()
        };
        let pictures = command.pictures.as_slice();
        let archive = command.archive;

        self.remote("jpics.images.archive", || async move {
            self.api
                .archive_pictures(pictures, archive)
                .await
                .map_err(ApplicationError::from)
        })
        .await?;

        let updated: Vec<Picture> = self
            .store
            .find_pictures(pictures)?
            .into_iter()
            .map(|mut picture| {
                picture.archived = archive;
                picture
            })
            .collect();
        self.store.upsert_pictures(&updated)?;
        self.publish(&[EntityKind::Picture, EntityKind::PictureCategory])?;
        self.refresh_representatives(&represented).await;
        Ok(())
    }

    pub async fn restore_pictures(&self, pictures: Vec<PictureId>) -> Result<(), ApplicationError> {
        self.archive_pictures(ArchivePicturesCommand {
            pictures,
            archive: false,
        })
        .await
    }

    pub async fn set_picture_name(
        &self,
        command: SetPictureNameCommand,
    ) -> Result<(), ApplicationError> {
        self.action_token()?;
        let mut picture = self.require_picture(command.picture)?;
        let mut update = PictureInfoUpdate::new(command.picture);
        update.name = Some(command.name.clone());
        update.single_value_mode = SingleValueMode::Replace;
        self.push_picture_info(&update).await?;

        picture.name = command.name;
        self.store.upsert_pictures(&[picture])?;
        self.publish(&[EntityKind::Picture])
    }

    pub async fn set_picture_creation_date(
        &self,
        command: SetPictureDateCommand,
    ) -> Result<(), ApplicationError> {
        self.action_token()?;
        let mut picture = self.require_picture(command.picture)?;
        let mut update = PictureInfoUpdate::new(command.picture);
        update.created_at = Some(command.created_at);
        update.single_value_mode = SingleValueMode::Replace;
        self.push_picture_info(&update).await?;

        picture.created_at = Some(command.created_at);
        self.store.upsert_pictures(&[picture])?;
        self.publish(&[EntityKind::Picture])
    }

    /// Replaces the whole tag set of a picture.
    pub async fn set_picture_tags(
        &self,
        command: SetPictureTagsCommand,
    ) -> Result<(), ApplicationError> {
        self.action_token()?;
        self.require_picture(command.picture)?;
        let tags = dedup_ids(command.tags);
        let mut update = PictureInfoUpdate::new(command.picture);
        update.tags = Some(tags.clone());
        update.multiple_value_mode = MultipleValueMode::Replace;
        self.push_picture_info(&update).await?;

        self.store.retain_picture_tags(command.picture, &tags)?;
        let links: Vec<(PictureId, TagId)> =
            tags.iter().map(|tag| (command.picture, *tag)).collect();
        self.store.link_picture_tags(&links)?;
        self.publish(&[EntityKind::PictureTag])
    }

    pub async fn add_tags(
        &self,
        command: AddTagsCommand,
        progress: &dyn ProgressListener,
    ) -> Result<BatchReport<String>, ApplicationError> {
        self.action_token()?;

        let report = run_batch(command.names, progress, |name| async move {
            validate_tag_name(&name)?;
            let name = name.trim();
            let id = self
                .remote_once("pwg.tags.add", || async move {
                    self.api.add_tag(name).await.map_err(ApplicationError::from)
                })
                .await?;
            self.store.upsert_tags(&[Tag::new(id, name)])?;
            self.publish(&[EntityKind::Tag])
        })
        .await;

        self.mark_diverged("add tags", &report);
        Ok(report)
    }

    /// Fetches one picture from the server and mirrors it with its relations.
    pub(crate) async fn mirror_picture(
        &self,
        picture: PictureId,
    ) -> Result<Picture, ApplicationError> {
        let remote = self
            .remote("pwg.images.getInfo", || async move {
                self.api
                    .picture_info(picture)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;

        self.apply_remote_pictures(std::slice::from_ref(&remote))?;
        self.publish(&[
            EntityKind::Picture,
            EntityKind::PictureCategory,
            EntityKind::PictureTag,
        ])?;
        Ok(remote.picture)
    }

    async fn push_picture_info(&self, update: &PictureInfoUpdate) -> Result<(), ApplicationError> {
        self.remote("pwg.images.setInfo", || async move {
            self.api
                .set_picture_info(update)
                .await
                .map_err(ApplicationError::from)
        })
        .await
    }

    fn require_picture(&self, picture: PictureId) -> Result<Picture, ApplicationError> {
        self.store
            .find_picture(picture)?
            .ok_or_else(|| ApplicationError::NotFound(format!("picture {picture}")))
    }
}
