use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::PictureId;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "mov", "mkv", "avi"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub id: PictureId,
    pub name: String,
    pub file: String,
    pub width: u32,
    pub height: u32,
    pub created_at: Option<NaiveDateTime>,
    pub archived: bool,
    pub thumbnail_url: String,
    pub full_url: String,
    pub large_url: String,
    pub element_url: String,
}

impl Picture {
    pub fn new(id: PictureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            file: String::new(),
            width: 0,
            height: 0,
            created_at: None,
            archived: false,
            thumbnail_url: String::new(),
            full_url: String::new(),
            large_url: String::new(),
            element_url: String::new(),
        }
    }

    pub fn is_video(&self) -> bool {
        detect_media_kind(Path::new(&self.element_url)) == MediaKind::Video
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Png,
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn is_image(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

pub fn detect_media_kind(path: &Path) -> MediaKind {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return MediaKind::Unsupported;
    };

    let ext = ext.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => MediaKind::Jpeg,
        "png" => MediaKind::Png,
        other if VIDEO_EXTENSIONS.contains(&other) => MediaKind::Video,
        _ => MediaKind::Unsupported,
    }
}
