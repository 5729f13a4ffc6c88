mod dto;
mod envelope;
mod form;
mod requests;

use std::time::Duration;

use async_trait::async_trait;
use jpics_application::{
    ApiError, GalleryApi, ImageAddition, NewCategory, PictureInfoUpdate, PictureQuery,
    RemotePicture, SessionStatus,
};
use jpics_domain::{Category, CategoryId, PictureId, Tag, TagId, User};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use dto::{
    existing_ids, CategoryListDto, CheckUploadDto, ExistDto, ImageDto, ImageListDto, NewIdDto,
    NewImageDto, StatusDto, TagImagesDto, TagListDto, UserListDto,
};
use envelope::parse_envelope;
use form::FormRequest;

pub use dto::DATE_FORMAT;

/// Error code the server answers a rejected login with.
const INVALID_CREDENTIALS: i64 = 999;

/// HTTP client for a gallery's `ws.php` endpoint. The session lives in the
/// client's cookie jar, so one instance is one logged-in user.
#[derive(Debug, Clone)]
pub struct PiwigoClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl PiwigoClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let endpoint = endpoint_url(server_url)?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, request: FormRequest) -> Result<T, ApiError> {
        debug!(method = request.method(), "calling gallery api");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(request.encode())
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ApiError::Transport(format!(
                "{} answered {status}",
                request.method()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        parse_envelope(&body).map_err(|error| {
            warn!(method = request.method(), %error, "gallery api call failed");
            error
        })
    }

    async fn call_unit(&self, request: FormRequest) -> Result<(), ApiError> {
        self.call::<Value>(request).await.map(|_| ())
    }
}

/// `https://host/gallery/` -> `https://host/gallery/ws.php?format=json`
pub fn endpoint_url(server_url: &str) -> Result<Url, ApiError> {
    let base = server_url.trim().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/ws.php"))
        .map_err(|error| ApiError::Transport(format!("invalid server url {server_url:?}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Transport(format!(
            "unsupported scheme in {server_url:?}"
        )));
    }
    url.set_query(Some("format=json"));
    Ok(url)
}

fn new_id<T: TryFrom<i64>>(kind: &str, value: i64) -> Result<T, ApiError> {
    T::try_from(value).map_err(|_| ApiError::Parse(format!("server returned {kind} id {value}")))
}

#[async_trait]
impl GalleryApi for PiwigoClient {
    async fn session_status(&self) -> Result<SessionStatus, ApiError> {
        let status: StatusDto = self.call(requests::session_status()).await?;
        Ok(status.into())
    }

    async fn login(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        match self.call::<Value>(requests::login(username, password)).await {
            Ok(accepted) => Ok(accepted.as_bool().unwrap_or(false)),
            Err(ApiError::Server { code, .. }) if code == INVALID_CREDENTIALS => Ok(false),
            Err(error) => Err(error),
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.call_unit(requests::logout()).await
    }

    async fn list_categories(&self, recursive: bool) -> Result<Vec<Category>, ApiError> {
        let list: CategoryListDto = self.call(requests::list_categories(recursive)).await?;
        list.categories
            .into_iter()
            .map(|category| category.into_category())
            .collect()
    }

    async fn list_pictures(&self, query: &PictureQuery) -> Result<Vec<RemotePicture>, ApiError> {
        let list: ImageListDto = self.call(requests::list_pictures(query)).await?;
        list.images.into_iter().map(ImageDto::into_remote).collect()
    }

    async fn picture_info(&self, picture: PictureId) -> Result<RemotePicture, ApiError> {
        let image: ImageDto = self.call(requests::picture_info(picture)).await?;
        image.into_remote()
    }

    async fn add_category(&self, category: &NewCategory) -> Result<CategoryId, ApiError> {
        let created: NewIdDto = self.call(requests::add_category(category)).await?;
        new_id("category", created.id)
    }

    async fn delete_category(&self, category: CategoryId, token: &str) -> Result<(), ApiError> {
        self.call_unit(requests::delete_category(category, token))
            .await
    }

    async fn move_category(
        &self,
        category: CategoryId,
        parent: Option<CategoryId>,
        token: &str,
    ) -> Result<(), ApiError> {
        self.call_unit(requests::move_category(category, parent, token))
            .await
    }

    async fn rename_category(&self, category: CategoryId, name: &str) -> Result<(), ApiError> {
        self.call_unit(requests::rename_category(category, name))
            .await
    }

    async fn set_representative(
        &self,
        category: CategoryId,
        picture: PictureId,
    ) -> Result<(), ApiError> {
        self.call_unit(requests::set_representative(category, picture))
            .await
    }

    async fn delete_representative(&self, category: CategoryId) -> Result<(), ApiError> {
        self.call_unit(requests::delete_representative(category))
            .await
    }

    async fn check_upload(&self) -> Result<bool, ApiError> {
        let check: CheckUploadDto = self.call(requests::check_upload()).await?;
        Ok(check.ready_for_upload)
    }

    async fn existing_pictures(&self, sums: &[String]) -> Result<Vec<Option<PictureId>>, ApiError> {
        if sums.is_empty() {
            return Ok(Vec::new());
        }
        let found: ExistDto = self.call(requests::existing_pictures(sums)).await?;
        Ok(existing_ids(found, sums))
    }

    async fn add_chunk(
        &self,
        data: &str,
        original_sum: &str,
        position: usize,
    ) -> Result<(), ApiError> {
        self.call_unit(requests::add_chunk(data, original_sum, position))
            .await
    }

    async fn add_image(&self, image: &ImageAddition) -> Result<PictureId, ApiError> {
        let created: NewImageDto = self.call(requests::add_image(image)).await?;
        new_id("picture", created.image_id)
    }

    async fn set_picture_info(&self, update: &PictureInfoUpdate) -> Result<(), ApiError> {
        self.call_unit(requests::set_picture_info(update)).await
    }

    async fn delete_pictures(&self, pictures: &[PictureId], token: &str) -> Result<(), ApiError> {
        self.call_unit(requests::delete_pictures(pictures, token))
            .await
    }

    async fn archive_pictures(
        &self,
        pictures: &[PictureId],
        archive: bool,
    ) -> Result<(), ApiError> {
        self.call_unit(requests::archive_pictures(pictures, archive))
            .await
    }

    async fn move_pictures_to_category(
        &self,
        pictures: &[PictureId],
        category: CategoryId,
    ) -> Result<(), ApiError> {
        self.call_unit(requests::move_pictures_to_category(pictures, category))
            .await
    }

    async fn add_tag(&self, name: &str) -> Result<TagId, ApiError> {
        let created: NewIdDto = self.call(requests::add_tag(name)).await?;
        new_id("tag", created.id)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let list: TagListDto = self.call(requests::list_tags()).await?;
        list.tags.into_iter().map(|tag| tag.into_tag()).collect()
    }

    async fn tag_pictures(
        &self,
        tag: TagId,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PictureId>, ApiError> {
        let list: TagImagesDto = self.call(requests::tag_pictures(tag, page, per_page)).await?;
        Ok(list
            .images
            .into_iter()
            .filter_map(|image| PictureId::new(image.id).ok())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let list: UserListDto = self.call(requests::list_users()).await?;
        list.users.into_iter().map(|user| user.into_user()).collect()
    }
}
