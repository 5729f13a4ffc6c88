mod category;
mod error;
mod ids;
mod picture;
mod session;
mod tag;

pub use category::{validate_category_name, Category, SystemAlbum, SystemAlbums};
pub use error::DomainError;
pub use ids::{CategoryId, PictureId, TagId, UserId};
pub use picture::{detect_media_kind, MediaKind, Picture};
pub use session::Session;
pub use tag::{validate_tag_name, Tag, User};
