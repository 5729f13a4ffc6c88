use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use jpics_domain::{CategoryId, PictureId, TagId};

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoadPicturesCommand {
    pub categories: Vec<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct AddCategoryCommand {
    pub name: String,
    pub parent: Option<CategoryId>,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct DeleteCategoriesCommand {
    pub categories: Vec<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct MoveCategoriesCommand {
    pub categories: Vec<CategoryId>,
    pub parent: Option<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct RenameCategoryCommand {
    pub category: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AddToCategoriesCommand {
    pub pictures: Vec<PictureId>,
    pub categories: Vec<CategoryId>,
}

#[derive(Debug, Clone)]
pub struct RemoveFromCategoryCommand {
    pub pictures: Vec<PictureId>,
    pub category: CategoryId,
}

#[derive(Debug, Clone)]
pub struct MovePicturesCommand {
    pub pictures: Vec<PictureId>,
    pub category: CategoryId,
}

#[derive(Debug, Clone)]
pub struct DeletePicturesCommand {
    pub pictures: Vec<PictureId>,
}

#[derive(Debug, Clone)]
pub struct ArchivePicturesCommand {
    pub pictures: Vec<PictureId>,
    pub archive: bool,
}

#[derive(Debug, Clone)]
pub struct SetPictureNameCommand {
    pub picture: PictureId,
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SetPictureDateCommand {
    pub picture: PictureId,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SetPictureTagsCommand {
    pub picture: PictureId,
    pub tags: Vec<TagId>,
}

#[derive(Debug, Clone)]
pub struct AddTagsCommand {
    pub names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadImagesCommand {
    pub files: Vec<PathBuf>,
    pub categories: Vec<CategoryId>,
    pub tags: Vec<TagId>,
}

#[derive(Debug, Clone)]
pub struct InstantUploadCommand {
    pub roots: Vec<PathBuf>,
    pub since: Option<DateTime<Utc>>,
    pub ignored_folders: Vec<PathBuf>,
    /// Overrides the instant-upload system album.
    pub target: Option<CategoryId>,
}
