use std::collections::HashMap;

use chrono::NaiveDateTime;
use jpics_application::{ApiError, RemotePicture, SessionStatus};
use jpics_domain::{Category, CategoryId, Picture, PictureId, Tag, TagId, User, UserId};
use serde::{Deserialize, Deserializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The server sends numbers either bare or quoted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Number(i64),
    Text(String),
    Flag(bool),
}

impl Lenient {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Flag(flag) => Some(i64::from(*flag)),
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Lenient::deserialize(deserializer)?;
    value
        .as_i64()
        .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {value:?}")))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Lenient>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Lenient::as_i64))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient_opt_i64(deserializer)?
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or_default())
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(lenient_opt_i64(deserializer)?.is_some_and(|value| value != 0))
}

fn id<T: TryFrom<i64>>(kind: &str, value: i64) -> Result<T, ApiError> {
    T::try_from(value).map_err(|_| ApiError::Parse(format!("invalid {kind} id {value}")))
}

#[derive(Debug, Deserialize)]
pub struct StatusDto {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pwg_token: String,
    #[serde(default)]
    pub available_sizes: Vec<String>,
}

impl From<StatusDto> for SessionStatus {
    fn from(dto: StatusDto) -> Self {
        Self {
            username: dto.username,
            status: dto.status,
            token: dto.pwg_token,
            available_sizes: dto.available_sizes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryListDto {
    #[serde(default)]
    pub categories: Vec<CategoryDto>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Comma separated ancestor chain ending with the category itself.
    #[serde(default)]
    pub uppercats: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub nb_images: u32,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub representative_picture_id: Option<i64>,
    #[serde(default)]
    pub tn_url: Option<String>,
}

impl CategoryDto {
    pub fn into_category(self) -> Result<Category, ApiError> {
        let parent = parent_from_uppercats(&self.uppercats)
            .map(|parent| id::<CategoryId>("category", parent))
            .transpose()?;
        let mut category = Category::new(id("category", self.id)?, self.name, parent);
        category.picture_count = self.nb_images;
        category.representative = self
            .representative_picture_id
            .and_then(|picture| PictureId::new(picture).ok());
        category.thumbnail_url = self.tn_url.unwrap_or_default();
        Ok(category)
    }
}

/// `"1,5,7"` -> `Some(5)`; a root category has no parent.
pub fn parent_from_uppercats(uppercats: &str) -> Option<i64> {
    let chain: Vec<i64> = uppercats
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    chain.len().checked_sub(2).map(|index| chain[index])
}

#[derive(Debug, Deserialize)]
pub struct ImageListDto {
    #[serde(default)]
    pub images: Vec<ImageDto>,
}

#[derive(Debug, Deserialize)]
pub struct IdRefDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DerivativeDto {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: u32,
    #[serde(default)]
    pub date_creation: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_archived: bool,
    #[serde(default)]
    pub element_url: String,
    #[serde(default)]
    pub derivatives: HashMap<String, DerivativeDto>,
    #[serde(default)]
    pub categories: Vec<IdRefDto>,
    #[serde(default)]
    pub tags: Vec<IdRefDto>,
}

impl ImageDto {
    pub fn into_remote(self) -> Result<RemotePicture, ApiError> {
        let name = self
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.file.clone());
        let mut picture = Picture::new(id("picture", self.id)?, name);
        picture.file = self.file;
        picture.width = self.width;
        picture.height = self.height;
        picture.created_at = self
            .date_creation
            .as_deref()
            .and_then(|text| NaiveDateTime::parse_from_str(text, DATE_FORMAT).ok());
        picture.archived = self.is_archived;
        picture.thumbnail_url = derivative_url(&self.derivatives, &["thumb"]);
        picture.large_url = derivative_url(&self.derivatives, &["large", "medium"]);
        picture.full_url = derivative_url(&self.derivatives, &["xxlarge", "xlarge", "large"]);
        picture.element_url = self.element_url;

        let categories = self
            .categories
            .iter()
            .map(|entry| id::<CategoryId>("category", entry.id))
            .collect::<Result<_, _>>()?;
        let tags = self
            .tags
            .iter()
            .map(|entry| id::<TagId>("tag", entry.id))
            .collect::<Result<_, _>>()?;

        Ok(RemotePicture {
            picture,
            categories,
            tags,
        })
    }
}

fn derivative_url(derivatives: &HashMap<String, DerivativeDto>, preferred: &[&str]) -> String {
    preferred
        .iter()
        .filter_map(|size| derivatives.get(*size))
        .map(|derivative| derivative.url.clone())
        .find(|url| !url.is_empty())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct NewIdDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewImageDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub image_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckUploadDto {
    #[serde(default)]
    pub ready_for_upload: bool,
}

/// Checksum to picture id, `null` when unknown.
pub fn existing_ids(
    found: HashMap<String, Option<Lenient>>,
    sums: &[String],
) -> Vec<Option<PictureId>> {
    sums.iter()
        .map(|sum| {
            found
                .get(sum)
                .and_then(Option::as_ref)
                .and_then(Lenient::as_i64)
                .and_then(|value| PictureId::new(value).ok())
        })
        .collect()
}

pub type ExistDto = HashMap<String, Option<Lenient>>;

#[derive(Debug, Deserialize)]
pub struct TagListDto {
    #[serde(default)]
    pub tags: Vec<TagDto>,
}

#[derive(Debug, Deserialize)]
pub struct TagDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl TagDto {
    pub fn into_tag(self) -> Result<Tag, ApiError> {
        Ok(Tag::new(id("tag", self.id)?, self.name))
    }
}

#[derive(Debug, Deserialize)]
pub struct TagImagesDto {
    #[serde(default)]
    pub images: Vec<IdRefDto>,
}

#[derive(Debug, Deserialize)]
pub struct UserListDto {
    #[serde(default)]
    pub users: Vec<UserDto>,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UserDto {
    pub fn into_user(self) -> Result<User, ApiError> {
        Ok(User {
            id: id::<UserId>("user", self.id)?,
            username: self.username,
            email: self.email.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parent_comes_from_uppercats() {
        let dto: CategoryDto = serde_json::from_str(
            r#"{"id":"7","name":"Rome","uppercats":"1,5,7","nb_images":"12",
                "representative_picture_id":"42","tn_url":"https://g/t.jpg"}"#,
        )
        .expect("json");
        let category = dto.into_category().expect("category");

        assert_eq!(category.id.get(), 7);
        assert_eq!(category.parent.map(CategoryId::get), Some(5));
        assert_eq!(category.picture_count, 12);
        assert_eq!(category.representative.map(PictureId::get), Some(42));
        assert_eq!(category.thumbnail_url, "https://g/t.jpg");
        assert_eq!(parent_from_uppercats("3"), None);
        assert_eq!(parent_from_uppercats(""), None);
    }

    #[test]
    fn image_maps_derivatives_and_relations() {
        let dto: ImageDto = serde_json::from_str(
            r#"{"id":42,"name":null,"file":"IMG_1.jpg","width":"4000","height":3000,
                "date_creation":"2021-07-14 18:03:00","is_archived":"1",
                "element_url":"https://g/upload/IMG_1.jpg",
                "derivatives":{"thumb":{"url":"https://g/t.jpg"},
                               "xxlarge":{"url":"https://g/xx.jpg"}},
                "categories":[{"id":2,"name":"bin"}],"tags":[{"id":"9"}]}"#,
        )
        .expect("json");
        let remote = dto.into_remote().expect("remote");

        assert_eq!(remote.picture.name, "IMG_1.jpg");
        assert_eq!(remote.picture.width, 4000);
        assert!(remote.picture.archived);
        assert_eq!(remote.picture.thumbnail_url, "https://g/t.jpg");
        assert_eq!(remote.picture.full_url, "https://g/xx.jpg");
        assert_eq!(
            remote.picture.created_at.map(|date| date.format(DATE_FORMAT).to_string()),
            Some("2021-07-14 18:03:00".to_string())
        );
        assert_eq!(remote.categories, vec![CategoryId::new(2).expect("id")]);
        assert_eq!(remote.tags, vec![TagId::new(9).expect("id")]);
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        let dto: TagDto = serde_json::from_str(r#"{"id":0,"name":"x"}"#).expect("json");
        assert!(matches!(dto.into_tag(), Err(ApiError::Parse(_))));
    }

    #[test]
    fn exist_response_maps_in_request_order() {
        let found: ExistDto =
            serde_json::from_str(r#"{"aaa":"12","bbb":null}"#).expect("json");
        let ids = existing_ids(found, &["bbb".to_string(), "aaa".to_string()]);
        assert_eq!(ids, vec![None, Some(PictureId::new(12).expect("id"))]);
    }
}
