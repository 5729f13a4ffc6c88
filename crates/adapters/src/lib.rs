pub mod fs;
pub mod migrations;
pub mod piwigo;
pub mod presenters;
pub mod sqlite;

pub use fs::{EncodeMode, ImageCrateEncoder, SystemClock, WalkdirMediaScanner};
pub use piwigo::PiwigoClient;
pub use presenters::{
    present_batch, present_category_row, present_category_tree, present_instant_upload,
    present_picture_row, present_refresh, present_session, present_upload,
};
pub use sqlite::SqliteGalleryStore;
