use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use jpics_domain::{Category, CategoryId, Picture, PictureId, Tag, TagId, User, UserId};

use crate::{ApiError, ApplicationError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub username: String,
    pub status: String,
    pub token: String,
    pub available_sizes: Vec<String>,
}

/// A picture as reported by the server, with the relations embedded in its
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePicture {
    pub picture: Picture,
    pub categories: Vec<CategoryId>,
    pub tags: Vec<TagId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureQuery {
    /// `None` lists every picture visible to the session.
    pub categories: Option<Vec<CategoryId>>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub parent: Option<CategoryId>,
    pub visible: bool,
    pub public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleValueMode {
    FillIfEmpty,
    Replace,
}

impl SingleValueMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillIfEmpty => "fill_if_empty",
            Self::Replace => "replace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipleValueMode {
    Append,
    Replace,
}

impl MultipleValueMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Replace => "replace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureInfoUpdate {
    pub picture: PictureId,
    pub name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub categories: Option<Vec<CategoryId>>,
    pub tags: Option<Vec<TagId>>,
    pub single_value_mode: SingleValueMode,
    pub multiple_value_mode: MultipleValueMode,
}

impl PictureInfoUpdate {
    pub fn new(picture: PictureId) -> Self {
        Self {
            picture,
            name: None,
            created_at: None,
            categories: None,
            tags: None,
            single_value_mode: SingleValueMode::FillIfEmpty,
            multiple_value_mode: MultipleValueMode::Append,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAddition {
    pub original_sum: String,
    pub filename: String,
    pub name: String,
    pub author: String,
    pub created_at: NaiveDateTime,
    pub comment: String,
    pub categories: Vec<CategoryId>,
    pub tags: Vec<TagId>,
}

/// Logical operations of the gallery web API; one call is one round trip.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    async fn session_status(&self) -> Result<SessionStatus, ApiError>;

    async fn login(&self, username: &str, password: &str) -> Result<bool, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn list_categories(&self, recursive: bool) -> Result<Vec<Category>, ApiError>;

    async fn list_pictures(&self, query: &PictureQuery) -> Result<Vec<RemotePicture>, ApiError>;

    async fn picture_info(&self, picture: PictureId) -> Result<RemotePicture, ApiError>;

    async fn add_category(&self, category: &NewCategory) -> Result<CategoryId, ApiError>;

    async fn delete_category(&self, category: CategoryId, token: &str) -> Result<(), ApiError>;

    async fn move_category(
        &self,
        category: CategoryId,
        parent: Option<CategoryId>,
        token: &str,
    ) -> Result<(), ApiError>;

    async fn rename_category(&self, category: CategoryId, name: &str) -> Result<(), ApiError>;

    async fn set_representative(
        &self,
        category: CategoryId,
        picture: PictureId,
    ) -> Result<(), ApiError>;

    async fn delete_representative(&self, category: CategoryId) -> Result<(), ApiError>;

    async fn check_upload(&self) -> Result<bool, ApiError>;

    /// Returns, for each checksum in order, the id of the picture already
    /// holding that content.
    async fn existing_pictures(&self, sums: &[String]) -> Result<Vec<Option<PictureId>>, ApiError>;

    async fn add_chunk(&self, data: &str, original_sum: &str, position: usize)
        -> Result<(), ApiError>;

    async fn add_image(&self, image: &ImageAddition) -> Result<PictureId, ApiError>;

    async fn set_picture_info(&self, update: &PictureInfoUpdate) -> Result<(), ApiError>;

    async fn delete_pictures(&self, pictures: &[PictureId], token: &str) -> Result<(), ApiError>;

    async fn archive_pictures(&self, pictures: &[PictureId], archive: bool)
        -> Result<(), ApiError>;

    async fn move_pictures_to_category(
        &self,
        pictures: &[PictureId],
        category: CategoryId,
    ) -> Result<(), ApiError>;

    async fn add_tag(&self, name: &str) -> Result<TagId, ApiError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;

    async fn tag_pictures(
        &self,
        tag: TagId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PictureId>, ApiError>;

    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    Prefix,
    Contains,
}

impl NameMatch {
    pub fn matches(self, candidate: &str, pattern: &str) -> bool {
        match self {
            Self::Exact => candidate == pattern,
            Self::Prefix => candidate.starts_with(pattern),
            Self::Contains => candidate.contains(pattern),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PictureScope {
    All { include_archived: bool },
    InCategories {
        categories: Vec<CategoryId>,
        include_archived: bool,
    },
    Archived,
    Tagged(TagId),
}

/// Durable mirror of the server state. Every write is an upsert or a
/// delete-by-set so concurrent callers converge on the same rows.
pub trait GalleryStore: Send + Sync {
    fn initialize(&self) -> Result<(), ApplicationError>;

    fn upsert_categories(&self, categories: &[Category]) -> Result<(), ApplicationError>;

    /// Deletes every category not in `keep`, returning the removed ids.
    fn retain_categories(&self, keep: &[CategoryId]) -> Result<Vec<CategoryId>, ApplicationError>;

    fn delete_category(&self, category: CategoryId) -> Result<(), ApplicationError>;

    fn find_category(&self, category: CategoryId) -> Result<Option<Category>, ApplicationError>;

    fn find_category_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Category>, ApplicationError>;

    fn list_categories(&self) -> Result<Vec<Category>, ApplicationError>;

    fn upsert_pictures(&self, pictures: &[Picture]) -> Result<(), ApplicationError>;

    fn retain_pictures(&self, keep: &[PictureId]) -> Result<Vec<PictureId>, ApplicationError>;

    fn delete_pictures(&self, pictures: &[PictureId]) -> Result<(), ApplicationError>;

    fn find_picture(&self, picture: PictureId) -> Result<Option<Picture>, ApplicationError>;

    fn find_pictures(&self, pictures: &[PictureId]) -> Result<Vec<Picture>, ApplicationError>;

    fn list_pictures(&self, scope: &PictureScope) -> Result<Vec<Picture>, ApplicationError>;

    fn upsert_tags(&self, tags: &[Tag]) -> Result<(), ApplicationError>;

    fn retain_tags(&self, keep: &[TagId]) -> Result<Vec<TagId>, ApplicationError>;

    fn find_tag(&self, tag: TagId) -> Result<Option<Tag>, ApplicationError>;

    fn find_tag_by_name(&self, name: &str, mode: NameMatch)
        -> Result<Option<Tag>, ApplicationError>;

    fn list_tags(&self) -> Result<Vec<Tag>, ApplicationError>;

    fn upsert_users(&self, users: &[User]) -> Result<(), ApplicationError>;

    fn retain_users(&self, keep: &[UserId]) -> Result<Vec<UserId>, ApplicationError>;

    fn find_user(&self, user: UserId) -> Result<Option<User>, ApplicationError>;

    fn find_user_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<User>, ApplicationError>;

    fn list_users(&self) -> Result<Vec<User>, ApplicationError>;

    fn link_picture_categories(
        &self,
        links: &[(PictureId, CategoryId)],
    ) -> Result<(), ApplicationError>;

    fn unlink_picture_category(
        &self,
        picture: PictureId,
        category: CategoryId,
    ) -> Result<(), ApplicationError>;

    /// Removes `picture` from every category not in `keep`.
    fn retain_picture_categories(
        &self,
        picture: PictureId,
        keep: &[CategoryId],
    ) -> Result<(), ApplicationError>;

    /// Removes from `category` every picture not in `keep`.
    fn retain_category_pictures(
        &self,
        category: CategoryId,
        keep: &[PictureId],
    ) -> Result<(), ApplicationError>;

    fn picture_categories(&self, picture: PictureId) -> Result<Vec<CategoryId>, ApplicationError>;

    fn category_pictures(&self, category: CategoryId) -> Result<Vec<PictureId>, ApplicationError>;

    fn link_picture_tags(&self, links: &[(PictureId, TagId)]) -> Result<(), ApplicationError>;

    fn retain_picture_tags(&self, picture: PictureId, keep: &[TagId])
        -> Result<(), ApplicationError>;

    fn retain_tag_pictures(&self, tag: TagId, keep: &[PictureId]) -> Result<(), ApplicationError>;

    fn picture_tags(&self, picture: PictureId) -> Result<Vec<TagId>, ApplicationError>;

    fn tag_pictures(&self, tag: TagId) -> Result<Vec<PictureId>, ApplicationError>;
}

/// Bytes ready to be sent to the server for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub created_at: NaiveDateTime,
}

pub trait UploadEncoder: Send + Sync {
    fn encode_for_upload(&self, path: &Path) -> Result<EncodedUpload, ApplicationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub folder: PathBuf,
    pub modified: DateTime<Utc>,
}

pub trait MediaScanner: Send + Sync {
    fn scan_images(&self, roots: &[PathBuf]) -> Result<Vec<MediaFile>, ApplicationError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
