//! Request builders, one per remote method.

use jpics_application::{ImageAddition, NewCategory, PictureInfoUpdate, PictureQuery};
use jpics_domain::{CategoryId, PictureId, TagId};

use super::dto::DATE_FORMAT;
use super::form::FormRequest;

const PAGE_ORDER: &str = "date_creation";

pub fn session_status() -> FormRequest {
    FormRequest::new("pwg.session.getStatus")
}

pub fn login(username: &str, password: &str) -> FormRequest {
    FormRequest::new("pwg.session.login")
        .field("username", username)
        .field("password", password)
}

pub fn logout() -> FormRequest {
    FormRequest::new("pwg.session.logout")
}

pub fn list_categories(recursive: bool) -> FormRequest {
    FormRequest::new("pwg.categories.getList").field("recursive", recursive)
}

pub fn list_pictures(query: &PictureQuery) -> FormRequest {
    let request = FormRequest::new("jpics.categories.getImages");
    let request = match &query.categories {
        Some(categories) => request.list("cat_id", categories.iter().map(|id| id.get())),
        None => request,
    };
    request
        .field("page", query.page)
        .field("per_page", query.per_page)
        .field("order", PAGE_ORDER)
}

pub fn picture_info(picture: PictureId) -> FormRequest {
    FormRequest::new("pwg.images.getInfo").field("image_id", picture.get())
}

pub fn add_category(category: &NewCategory) -> FormRequest {
    FormRequest::new("pwg.categories.add")
        .field("name", &category.name)
        .optional("parent", category.parent.map(CategoryId::get))
        .field("visible", category.visible)
        .field("status", if category.public { "public" } else { "private" })
}

/// Pictures left without an album stay on the server.
pub fn delete_category(category: CategoryId, token: &str) -> FormRequest {
    FormRequest::new("pwg.categories.delete")
        .field("category_id", category.get())
        .field("photo_deletion_mode", "no_delete")
        .field("pwg_token", token)
}

/// A `parent` of 0 moves the category to the root.
pub fn move_category(category: CategoryId, parent: Option<CategoryId>, token: &str) -> FormRequest {
    FormRequest::new("pwg.categories.move")
        .field("category_id", category.get())
        .field("parent", parent.map_or(0, CategoryId::get))
        .field("pwg_token", token)
}

pub fn rename_category(category: CategoryId, name: &str) -> FormRequest {
    FormRequest::new("pwg.categories.setInfo")
        .field("category_id", category.get())
        .field("name", name)
}

pub fn set_representative(category: CategoryId, picture: PictureId) -> FormRequest {
    FormRequest::new("pwg.categories.setRepresentative")
        .field("category_id", category.get())
        .field("image_id", picture.get())
}

pub fn delete_representative(category: CategoryId) -> FormRequest {
    FormRequest::new("pwg.categories.deleteRepresentative").field("category_id", category.get())
}

pub fn check_upload() -> FormRequest {
    FormRequest::new("pwg.images.checkUpload")
}

pub fn existing_pictures(sums: &[String]) -> FormRequest {
    FormRequest::new("pwg.images.exist").joined("md5sum_list", sums, ",")
}

pub fn add_chunk(data: &str, original_sum: &str, position: usize) -> FormRequest {
    FormRequest::new("pwg.images.addChunk")
        .field("data", data)
        .field("original_sum", original_sum)
        .field("position", position)
}

pub fn add_image(image: &ImageAddition) -> FormRequest {
    FormRequest::new("pwg.images.add")
        .field("original_sum", &image.original_sum)
        .field("original_filename", &image.filename)
        .field("name", &image.name)
        .field("author", &image.author)
        .field("date_creation", image.created_at.format(DATE_FORMAT))
        .field("comment", &image.comment)
        .joined("categories", image.categories.iter().map(|id| id.get()), ";")
        .joined("tag_ids", image.tags.iter().map(|id| id.get()), ",")
}

pub fn set_picture_info(update: &PictureInfoUpdate) -> FormRequest {
    let request = FormRequest::new("pwg.images.setInfo")
        .field("image_id", update.picture.get())
        .optional("name", update.name.as_deref())
        .optional(
            "date_creation",
            update.created_at.map(|date| date.format(DATE_FORMAT)),
        );
    let request = match &update.categories {
        Some(categories) => request.joined("categories", categories.iter().map(|id| id.get()), ";"),
        None => request,
    };
    let request = match &update.tags {
        Some(tags) => request.joined("tag_ids", tags.iter().map(|id| id.get()), ","),
        None => request,
    };
    request
        .field("single_value_mode", update.single_value_mode.as_str())
        .field("multiple_value_mode", update.multiple_value_mode.as_str())
}

pub fn delete_pictures(pictures: &[PictureId], token: &str) -> FormRequest {
    FormRequest::new("pwg.images.delete")
        .list("image_id", pictures.iter().map(|id| id.get()))
        .field("pwg_token", token)
}

pub fn archive_pictures(pictures: &[PictureId], archive: bool) -> FormRequest {
    FormRequest::new("jpics.images.archive")
        .list("image_id", pictures.iter().map(|id| id.get()))
        .field("archive", archive)
}

pub fn move_pictures_to_category(pictures: &[PictureId], category: CategoryId) -> FormRequest {
    FormRequest::new("jpics.images.moveToCategory")
        .list("image_id", pictures.iter().map(|id| id.get()))
        .field("cat_id", category.get())
}

pub fn add_tag(name: &str) -> FormRequest {
    FormRequest::new("pwg.tags.add").field("name", name)
}

pub fn list_tags() -> FormRequest {
    FormRequest::new("pwg.tags.getAdminList")
}

pub fn tag_pictures(tag: TagId, page: u32, per_page: u32) -> FormRequest {
    FormRequest::new("pwg.tags.getImages")
        .list("tag_id", [tag.get()])
        .field("page", page)
        .field("per_page", per_page)
        .field("order", PAGE_ORDER)
}

pub fn list_users() -> FormRequest {
    FormRequest::new("pwg.users.getList")
}
