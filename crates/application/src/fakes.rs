//! In-memory stand-ins for the gallery server and the local store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use jpics_domain::{Category, CategoryId, Picture, PictureId, Tag, TagId, User, UserId};
use tokio::sync::Semaphore;

use crate::{
    ApiError, ApplicationError, GalleryApi, GalleryStore, ImageAddition, MultipleValueMode,
    NameMatch, NewCategory, PictureInfoUpdate, PictureQuery, PictureScope, RemotePicture,
    SessionStatus, SingleValueMode,
};

pub fn category_id(value: i64) -> CategoryId {
    CategoryId::new(value).expect("category id")
}

pub fn picture_id(value: i64) -> PictureId {
    PictureId::new(value).expect("picture id")
}

pub fn tag_id(value: i64) -> TagId {
    TagId::new(value).expect("tag id")
}

pub fn picture(value: i64) -> Picture {
    let mut picture = Picture::new(picture_id(value), format!("IMG_{value:04}"));
    picture.file = format!("IMG_{value:04}.jpg");
    picture.created_at = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|start| start + chrono::Duration::seconds(value));
    picture.thumbnail_url = format!("https://gallery.test/thumb/{value}.jpg");
    picture
}

#[derive(Default)]
struct StoreState {
    categories: BTreeMap<CategoryId, Category>,
    pictures: BTreeMap<PictureId, Picture>,
    tags: BTreeMap<TagId, Tag>,
    users: BTreeMap<UserId, User>,
    picture_categories: BTreeSet<(PictureId, CategoryId)>,
    picture_tags: BTreeSet<(PictureId, TagId)>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store lock")
    }
}

fn sorted_pictures(mut pictures: Vec<Picture>) -> Vec<Picture> {
    pictures.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then(left.id.cmp(&right.id))
    });
    pictures
}

impl GalleryStore for FakeStore {
    fn initialize(&self) -> Result<(), ApplicationError> {
        Ok(())
    }

    fn upsert_categories(&self, categories: &[Category]) -> Result<(), ApplicationError> {
        let mut state = self.state();
        for category in categories {
            state.categories.insert(category.id, category.clone());
        }
        Ok(())
    }

    fn retain_categories(&self, keep: &[CategoryId]) -> Result<Vec<CategoryId>, ApplicationError> {
        let removed: Vec<CategoryId> = self
            .state()
            .categories
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &removed {
            self.delete_category(*id)?;
        }
        Ok(removed)
    }

    fn delete_category(&self, category: CategoryId) -> Result<(), ApplicationError> {
        let mut state = self.state();
        state.categories.remove(&category);
        state
            .picture_categories
            .retain(|(_, linked)| *linked != category);
        Ok(())
    }

    fn find_category(&self, category: CategoryId) -> Result<Option<Category>, ApplicationError> {
        Ok(self.state().categories.get(&category).cloned())
    }

    fn find_category_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Category>, ApplicationError> {
        Ok(self
            .state()
            .categories
            .values()
            .find(|category| mode.matches(&category.name, name))
            .cloned())
    }

    fn list_categories(&self) -> Result<Vec<Category>, ApplicationError> {
        Ok(self.state().categories.values().cloned().collect())
    }

    fn upsert_pictures(&self, pictures: &[Picture]) -> Result<(), ApplicationError> {
        let mut state = self.state();
        for picture in pictures {
            state.pictures.insert(picture.id, picture.clone());
        }
        Ok(())
    }

    fn retain_pictures(&self, keep: &[PictureId]) -> Result<Vec<PictureId>, ApplicationError> {
        let removed: Vec<PictureId> = self
            .state()
            .pictures
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        self.delete_pictures(&removed)?;
        Ok(removed)
    }

    fn delete_pictures(&self, pictures: &[PictureId]) -> Result<(), ApplicationError> {
        let mut state = self.state();
        for id in pictures {
            state.pictures.remove(id);
        }
        state
            .picture_categories
            .retain(|(picture, _)| !pictures.contains(picture));
        state
            .picture_tags
            .retain(|(picture, _)| !pictures.contains(picture));
        Ok(())
    }

    fn find_picture(&self, picture: PictureId) -> Result<Option<Picture>, ApplicationError> {
        Ok(self.state().pictures.get(&picture).cloned())
    }

    fn find_pictures(&self, pictures: &[PictureId]) -> Result<Vec<Picture>, ApplicationError> {
        let state = self.state();
        Ok(pictures
            .iter()
            .filter_map(|id| state.pictures.get(id).cloned())
            .collect())
    }

    fn list_pictures(&self, scope: &PictureScope) -> Result<Vec<Picture>, ApplicationError> {
        let state = self.state();
        let selected = state.pictures.values().filter(|picture| match scope {
            PictureScope::All { include_archived } => *include_archived || !picture.archived,
            PictureScope::InCategories {
                categories,
                include_archived,
            } => {
                (*include_archived || !picture.archived)
                    && categories.iter().any(|category| {
                        state.picture_categories.contains(&(picture.id, *category))
                    })
            }
            PictureScope::Archived => picture.archived,
            PictureScope::Tagged(tag) => {
                !picture.archived && state.picture_tags.contains(&(picture.id, *tag))
            }
        });
        Ok(sorted_pictures(selected.cloned().collect()))
    }

    fn upsert_tags(&self, tags: &[Tag]) -> Result<(), ApplicationError> {
        let mut state = self.state();
        for tag in tags {
            state.tags.insert(tag.id, tag.clone());
        }
        Ok(())
    }

    fn retain_tags(&self, keep: &[TagId]) -> Result<Vec<TagId>, ApplicationError> {
        let mut state = self.state();
        let removed: Vec<TagId> = state
            .tags
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &removed {
            state.tags.remove(id);
        }
        state.picture_tags.retain(|(_, tag)| !removed.contains(tag));
        Ok(removed)
    }

    fn find_tag(&self, tag: TagId) -> Result<Option<Tag>, ApplicationError> {
        Ok(self.state().tags.get(&tag).cloned())
    }

    fn find_tag_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Tag>, ApplicationError> {
        Ok(self
            .state()
            .tags
            .values()
            .find(|tag| mode.matches(&tag.name, name))
            .cloned())
    }

    fn list_tags(&self) -> Result<Vec<Tag>, ApplicationError> {
        Ok(self.state().tags.values().cloned().collect())
    }

    fn upsert_users(&self, users: &[User]) -> Result<(), ApplicationError> {
        let mut state = self.state();
        for user in users {
            state.users.insert(user.id, user.clone());
        }
        Ok(())
    }

    fn retain_users(&self, keep: &[UserId]) -> Result<Vec<UserId>, ApplicationError> {
        let mut state = self.state();
        let removed: Vec<UserId> = state
            .users
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &removed {
            state.users.remove(id);
        }
        Ok(removed)
    }

    fn find_user(&self, user: UserId) -> Result<Option<User>, ApplicationError> {
        Ok(self.state().users.get(&user).cloned())
    }

    fn find_user_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<User>, ApplicationError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| mode.matches(&user.username, name))
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, ApplicationError> {
        Ok(self.state().users.values().cloned().collect())
    }

    fn link_picture_categories(
        &self,
        links: &[(PictureId, CategoryId)],
    ) -> Result<(), ApplicationError> {
        self.state().picture_categories.extend(links.iter().copied());
        Ok(())
    }

    fn unlink_picture_category(
        &self,
        picture: PictureId,
        category: CategoryId,
    ) -> Result<(), ApplicationError> {
        self.state().picture_categories.remove(&(picture, category));
        Ok(())
    }

    fn retain_picture_categories(
        &self,
        picture: PictureId,
        keep: &[CategoryId],
    ) -> Result<(), ApplicationError> {
        self.state()
            .picture_categories
            .retain(|(linked, category)| *linked != picture || keep.contains(category));
        Ok(())
    }

    fn retain_category_pictures(
        &self,
        category: CategoryId,
        keep: &[PictureId],
    ) -> Result<(), ApplicationError> {
        self.state()
            .picture_categories
            .retain(|(picture, linked)| *linked != category || keep.contains(picture));
        Ok(())
    }

    fn picture_categories(&self, picture: PictureId) -> Result<Vec<CategoryId>, ApplicationError> {
        Ok(self
            .state()
            .picture_categories
            .iter()
            .filter(|(linked, _)| *linked == picture)
            .map(|(_, category)| *category)
            .collect())
    }

    fn category_pictures(&self, category: CategoryId) -> Result<Vec<PictureId>, ApplicationError> {
        Ok(self
            .state()
            .picture_categories
            .iter()
            .filter(|(_, linked)| *linked == category)
            .map(|(picture, _)| *picture)
            .collect())
    }

    fn link_picture_tags(&self, links: &[(PictureId, TagId)]) -> Result<(), ApplicationError> {
        self.state().picture_tags.extend(links.iter().copied());
        Ok(())
    }

    fn retain_picture_tags(
        &self,
        picture: PictureId,
        keep: &[TagId],
    ) -> Result<(), ApplicationError> {
        self.state()
            .picture_tags
            .retain(|(linked, tag)| *linked != picture || keep.contains(tag));
        Ok(())
    }

    fn retain_tag_pictures(&self, tag: TagId, keep: &[PictureId]) -> Result<(), ApplicationError> {
        self.state()
            .picture_tags
            .retain(|(picture, linked)| *linked != tag || keep.contains(picture));
        Ok(())
    }

    fn picture_tags(&self, picture: PictureId) -> Result<Vec<TagId>, ApplicationError> {
        Ok(self
            .state()
            .picture_tags
            .iter()
            .filter(|(linked, _)| *linked == picture)
            .map(|(_, tag)| *tag)
            .collect())
    }

    fn tag_pictures(&self, tag: TagId) -> Result<Vec<PictureId>, ApplicationError> {
        Ok(self
            .state()
            .picture_tags
            .iter()
            .filter(|(_, linked)| *linked == tag)
            .map(|(picture, _)| *picture)
            .collect())
    }
}

pub struct FakeServer {
    pub categories: BTreeMap<CategoryId, Category>,
    pub pictures: BTreeMap<PictureId, RemotePicture>,
    pub tags: BTreeMap<TagId, Tag>,
    pub users: Vec<User>,
    pub sums: HashMap<String, PictureId>,
    /// `(original_sum, position, base64 length)` per received chunk.
    pub chunks: Vec<(String, usize, usize)>,
    pub calls: Vec<String>,
    /// Call keys such as `delete_category:7` that answer with a server error.
    pub failures: HashSet<String>,
    /// Call keys that fail with a transport error this many more times.
    pub transient: HashMap<String, u32>,
    /// Call keys that take effect but whose reply is lost this many more times.
    pub lost_replies: HashMap<String, u32>,
    /// Pictures each page repeats from the end of the previous one.
    pub page_overlap: usize,
    pub status: SessionStatus,
    pub password: String,
    pub upload_ready: bool,
    next_id: i64,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            categories: BTreeMap::new(),
            pictures: BTreeMap::new(),
            tags: BTreeMap::new(),
            users: Vec::new(),
            sums: HashMap::new(),
            chunks: Vec::new(),
            calls: Vec::new(),
            failures: HashSet::new(),
            transient: HashMap::new(),
            lost_replies: HashMap::new(),
            page_overlap: 0,
            status: SessionStatus {
                username: "admin".to_string(),
                status: "webmaster".to_string(),
                token: "token-1".to_string(),
                available_sizes: vec!["thumb".to_string(), "large".to_string()],
            },
            password: "secret".to_string(),
            upload_ready: true,
            next_id: 1000,
        }
    }
}

impl FakeServer {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn call(&mut self, key: String) -> Result<(), ApiError> {
        self.calls.push(key.clone());
        if let Some(remaining) = self.transient.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::Transport("connection reset".to_string()));
            }
        }
        if self.failures.contains(&key) {
            return Err(ApiError::Server {
                code: 500,
                message: format!("{key} rejected"),
            });
        }
        Ok(())
    }

    fn reply(&mut self, key: &str) -> Result<(), ApiError> {
        match self.lost_replies.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(ApiError::Transport("operation timed out".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn missing(what: &str, id: impl std::fmt::Display) -> ApiError {
        ApiError::Server {
            code: 404,
            message: format!("{what} {id} not found"),
        }
    }
}

/// Scripted gallery server.
#[derive(Default)]
pub struct FakeApi {
    server: Mutex<FakeServer>,
    gate: Mutex<Option<(CategoryId, Arc<Semaphore>)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(&self) -> MutexGuard<'_, FakeServer> {
        self.server.lock().expect("server lock")
    }

    pub fn with_category(self, id: i64, name: &str, parent: Option<i64>) -> Self {
        let category = Category::new(category_id(id), name, parent.map(category_id));
        self.server().categories.insert(category.id, category);
        self
    }

    /// Adds the three system albums with ids 1, 2 and 3.
    pub fn with_system_albums(self) -> Self {
        self.with_category(1, "jpics_instant_upload", None)
            .with_category(2, "jpics_archive", None)
            .with_category(3, "jpics_no_album", None)
    }

    pub fn with_picture(self, id: i64, categories: &[i64]) -> Self {
        self.put_picture(picture(id), categories);
        self
    }

    pub fn put_picture(&self, picture: Picture, categories: &[i64]) {
        let remote = RemotePicture {
            categories: categories.iter().copied().map(category_id).collect(),
            tags: Vec::new(),
            picture,
        };
        self.server().pictures.insert(remote.picture.id, remote);
    }

    pub fn fail(&self, key: &str) {
        self.server().failures.insert(key.to_string());
    }

    pub fn fail_transiently(&self, key: &str, times: u32) {
        self.server().transient.insert(key.to_string(), times);
    }

    pub fn lose_reply(&self, key: &str, times: u32) {
        self.server().lost_replies.insert(key.to_string(), times);
    }

    pub fn overlap_pages(&self, pictures: usize) {
        self.server().page_overlap = pictures;
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.server()
            .calls
            .iter()
            .filter(|call| call.split(':').next() == Some(name))
            .count()
    }

    /// Holds picture listings that include `category` until permits are added.
    pub fn gate_category(&self, category: CategoryId) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().expect("gate lock") = Some((category, Arc::clone(&semaphore)));
        semaphore
    }

    fn gate_for(&self, query: &PictureQuery) -> Option<Arc<Semaphore>> {
        let gate = self.gate.lock().expect("gate lock");
        let (category, semaphore) = gate.as_ref()?;
        let categories = query.categories.as_ref()?;
        categories
            .contains(category)
            .then(|| Arc::clone(semaphore))
    }
}

#[async_trait]
impl GalleryApi for FakeApi {
    async fn session_status(&self) -> Result<SessionStatus, ApiError> {
        let mut server = self.server();
        server.call("session_status".to_string())?;
        Ok(server.status.clone())
    }

    async fn login(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        let mut server = self.server();
        server.call("login".to_string())?;
        if password != server.password {
            return Ok(false);
        }
        server.status.username = username.to_string();
        server.status.token = format!("token-{username}");
        Ok(true)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call("logout".to_string())?;
        server.status = SessionStatus {
            username: "guest".to_string(),
            status: "guest".to_string(),
            token: String::new(),
            available_sizes: Vec::new(),
        };
        Ok(())
    }

    async fn list_categories(&self, _recursive: bool) -> Result<Vec<Category>, ApiError> {
        let mut server = self.server();
        server.call("list_categories".to_string())?;
        let counts: HashMap<CategoryId, u32> =
            server
                .pictures
                .values()
                .fold(HashMap::new(), |mut counts, remote| {
                    for category in &remote.categories {
                        *counts.entry(*category).or_default() += 1;
                    }
                    counts
                });
        Ok(server
            .categories
            .values()
            .cloned()
            .map(|mut category| {
                category.picture_count = counts.get(&category.id).copied().unwrap_or_default();
                category
            })
            .collect())
    }

    async fn list_pictures(&self, query: &PictureQuery) -> Result<Vec<RemotePicture>, ApiError> {
        if let Some(gate) = self.gate_for(query) {
            let permit = gate
                .acquire()
                .await
                .map_err(|error| ApiError::Transport(error.to_string()))?;
            permit.forget();
        }

        let mut server = self.server();
        server.call("list_pictures".to_string())?;
        let mut matching: Vec<RemotePicture> = server
            .pictures
            .values()
            .filter(|remote| match &query.categories {
                Some(categories) => remote
                    .categories
                    .iter()
                    .any(|category| categories.contains(category)),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            left.picture
                .created_at
                .cmp(&right.picture.created_at)
                .then(left.picture.id.cmp(&right.picture.id))
        });
        let overlap = if query.page > 0 { server.page_overlap } else { 0 };
        let start = (query.page as usize * query.per_page as usize).saturating_sub(overlap);
        Ok(matching
            .into_iter()
            .skip(start)
            .take(query.per_page as usize)
            .collect())
    }

    async fn picture_info(&self, picture: PictureId) -> Result<RemotePicture, ApiError> {
        let mut server = self.server();
        server.call(format!("picture_info:{picture}"))?;
        server
            .pictures
            .get(&picture)
            .cloned()
            .ok_or_else(|| FakeServer::missing("picture", picture))
    }

    async fn add_category(&self, category: &NewCategory) -> Result<CategoryId, ApiError> {
        let mut server = self.server();
        let key = format!("add_category:{}", category.name);
        server.call(key.clone())?;
        let id = category_id(server.next_id());
        server.categories.insert(
            id,
            Category::new(id, category.name.clone(), category.parent),
        );
        server.reply(&key)?;
        Ok(id)
    }

    async fn delete_category(&self, category: CategoryId, token: &str) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("delete_category:{category}"))?;
        if token != server.status.token {
            return Err(ApiError::Server {
                code: 403,
                message: "invalid token".to_string(),
            });
        }
        if server.categories.remove(&category).is_none() {
            return Err(FakeServer::missing("category", category));
        }
        for remote in server.pictures.values_mut() {
            remote.categories.retain(|linked| *linked != category);
        }
        Ok(())
    }

    async fn move_category(
        &self,
        category: CategoryId,
        parent: Option<CategoryId>,
        _token: &str,
    ) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("move_category:{category}"))?;
        let found = server
            .categories
            .get_mut(&category)
            .ok_or_else(|| FakeServer::missing("category", category))?;
        found.parent = parent;
        Ok(())
    }

    async fn rename_category(&self, category: CategoryId, name: &str) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("rename_category:{category}"))?;
        let found = server
            .categories
            .get_mut(&category)
            .ok_or_else(|| FakeServer::missing("category", category))?;
        found.name = name.to_string();
        Ok(())
    }

    async fn set_representative(
        &self,
        category: CategoryId,
        picture: PictureId,
    ) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("set_representative:{category}"))?;
        let thumbnail = server
            .pictures
            .get(&picture)
            .map(|remote| remote.picture.thumbnail_url.clone())
            .ok_or_else(|| FakeServer::missing("picture", picture))?;
        let found = server
            .categories
            .get_mut(&category)
            .ok_or_else(|| FakeServer::missing("category", category))?;
        found.representative = Some(picture);
        found.thumbnail_url = thumbnail;
        Ok(())
    }

    async fn delete_representative(&self, category: CategoryId) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("delete_representative:{category}"))?;
        let found = server
            .categories
            .get_mut(&category)
            .ok_or_else(|| FakeServer::missing("category", category))?;
        found.representative = None;
        found.thumbnail_url.clear();
        Ok(())
    }

    async fn check_upload(&self) -> Result<bool, ApiError> {
        let mut server = self.server();
        server.call("check_upload".to_string())?;
        Ok(server.upload_ready)
    }

    async fn existing_pictures(&self, sums: &[String]) -> Result<Vec<Option<PictureId>>, ApiError> {
        let mut server = self.server();
        server.call("existing_pictures".to_string())?;
        Ok(sums.iter().map(|sum| server.sums.get(sum).copied()).collect())
    }

    async fn add_chunk(
        &self,
        data: &str,
        original_sum: &str,
        position: usize,
    ) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("add_chunk:{position}"))?;
        server
            .chunks
            .push((original_sum.to_string(), position, data.len()));
        Ok(())
    }

    async fn add_image(&self, image: &ImageAddition) -> Result<PictureId, ApiError> {
        let mut server = self.server();
        server.call("add_image".to_string())?;
        let id = picture_id(server.next_id());
        let mut picture = Picture::new(id, image.name.clone());
        picture.file = image.filename.clone();
        picture.created_at = Some(image.created_at);
        picture.thumbnail_url = format!("https://gallery.test/thumb/{id}.jpg");
        server.sums.insert(image.original_sum.clone(), id);
        server.pictures.insert(
            id,
            RemotePicture {
                picture,
                categories: image.categories.clone(),
                tags: image.tags.clone(),
            },
        );
        server.reply("add_image")?;
        Ok(id)
    }

    async fn set_picture_info(&self, update: &PictureInfoUpdate) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("set_picture_info:{}", update.picture))?;
        let remote = server
            .pictures
            .get_mut(&update.picture)
            .ok_or_else(|| FakeServer::missing("picture", update.picture))?;

        let replace_single = update.single_value_mode == SingleValueMode::Replace;
        if let Some(name) = &update.name {
            if replace_single || remote.picture.name.is_empty() {
                remote.picture.name = name.clone();
            }
        }
        if let Some(created_at) = update.created_at {
            if replace_single || remote.picture.created_at.is_none() {
                remote.picture.created_at = Some(created_at);
            }
        }

        let replace_multiple = update.multiple_value_mode == MultipleValueMode::Replace;
        if let Some(categories) = &update.categories {
            if replace_multiple {
                remote.categories = categories.clone();
            } else {
                for category in categories {
                    if !remote.categories.contains(category) {
                        remote.categories.push(*category);
                    }
                }
            }
        }
        if let Some(tags) = &update.tags {
            if replace_multiple {
                remote.tags = tags.clone();
            } else {
                for tag in tags {
                    if !remote.tags.contains(tag) {
                        remote.tags.push(*tag);
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_pictures(&self, pictures: &[PictureId], _token: &str) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call("delete_pictures".to_string())?;
        for id in pictures {
            server.pictures.remove(id);
        }
        server.sums.retain(|_, id| !pictures.contains(id));
        Ok(())
    }

    async fn archive_pictures(
        &self,
        pictures: &[PictureId],
        archive: bool,
    ) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call("archive_pictures".to_string())?;
        for id in pictures {
            let remote = server
                .pictures
                .get_mut(id)
                .ok_or_else(|| FakeServer::missing("picture", id))?;
            remote.picture.archived = archive;
        }
        Ok(())
    }

    async fn move_pictures_to_category(
        &self,
        pictures: &[PictureId],
        category: CategoryId,
    ) -> Result<(), ApiError> {
        let mut server = self.server();
        server.call(format!("move_pictures:{category}"))?;
        for id in pictures {
            if let Some(remote) = server.pictures.get_mut(id) {
                remote.categories = vec![category];
            }
        }
        Ok(())
    }

    async fn add_tag(&self, name: &str) -> Result<TagId, ApiError> {
        let mut server = self.server();
        server.call(format!("add_tag:{name}"))?;
        if let Some(existing) = server.tags.values().find(|tag| tag.name == name) {
            return Ok(existing.id);
        }
        let id = tag_id(server.next_id());
        server.tags.insert(id, Tag::new(id, name));
        server.reply(&format!("add_tag:{name}"))?;
        Ok(id)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let mut server = self.server();
        server.call("list_tags".to_string())?;
        Ok(server.tags.values().cloned().collect())
    }

    async fn tag_pictures(
        &self,
        tag: TagId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PictureId>, ApiError> {
        let mut server = self.server();
        server.call(format!("tag_pictures:{tag}"))?;
        Ok(server
            .pictures
            .values()
            .filter(|remote| remote.tags.contains(&tag))
            .map(|remote| remote.picture.id)
            .skip(page as usize * per_page as usize)
            .take(per_page as usize)
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let mut server = self.server();
        server.call("list_users".to_string())?;
        Ok(server.users.clone())
    }
}
