mod coordinator;
mod error;
#[cfg(test)]
mod fakes;
mod instant;
mod ports;
mod progress;
mod subscriptions;
mod tree;
mod upload;
mod use_cases;

pub use coordinator::{CoordinatorConfig, DataCoordinator, LoadOutcome, RefreshReport};
pub use error::{ApiError, ApplicationError};
pub use instant::{FolderRules, InstantUploadReport, InstantUploader};
pub use ports::{
    Clock, EncodedUpload, GalleryApi, GalleryStore, ImageAddition, MediaFile, MediaScanner,
    MultipleValueMode, NameMatch, NewCategory, PictureInfoUpdate, PictureQuery, PictureScope,
    RemotePicture, SessionStatus, SingleValueMode, UploadEncoder,
};
pub use progress::{
    BatchFailure, BatchReport, ChannelProgress, NoProgress, ProgressEvent, ProgressListener,
    RetryPolicy,
};
pub use subscriptions::{EntityKind, QueryResult, QueryShape, Subscription, SubscriptionRegistry};
pub use tree::CategoryTree;
pub use upload::{md5_hex, UploadOutcome, UploadPipeline, UploadReport, CHUNK_SIZE};
pub use use_cases::{
    AddCategoryCommand, AddTagsCommand, AddToCategoriesCommand, ArchivePicturesCommand,
    DeleteCategoriesCommand, DeletePicturesCommand, InstantUploadCommand, LoadPicturesCommand,
    LoginCommand, MoveCategoriesCommand, MovePicturesCommand, RemoveFromCategoryCommand,
    RenameCategoryCommand, SetPictureDateCommand, SetPictureNameCommand, SetPictureTagsCommand,
    UploadImagesCommand,
};
