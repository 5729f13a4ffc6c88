use serde::{Deserialize, Serialize};

use crate::{CategoryId, DomainError, PictureId};

/// A server-side album. `parent == None` means the category sits at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent: Option<CategoryId>,
    pub representative: Option<PictureId>,
    /// Cached thumbnail of the representative picture, empty when unresolved.
    pub thumbnail_url: String,
    pub picture_count: u32,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, parent: Option<CategoryId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            representative: None,
            thumbnail_url: String::new(),
            picture_count: 0,
        }
    }

    pub fn system_album(&self) -> Option<SystemAlbum> {
        SystemAlbum::from_name(&self.name)
    }

    pub fn is_system(&self) -> bool {
        self.system_album().is_some()
    }
}

/// Reserved albums the client keeps on every server it talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemAlbum {
    InstantUpload,
    Archive,
    NoAlbum,
}

impl SystemAlbum {
    /// Bootstrap order.
    pub const ALL: [SystemAlbum; 3] = [
        SystemAlbum::InstantUpload,
        SystemAlbum::Archive,
        SystemAlbum::NoAlbum,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            Self::InstantUpload => "jpics_instant_upload",
            Self::Archive => "jpics_archive",
            Self::NoAlbum => "jpics_no_album",
        }
    }

    pub fn matches(self, name: &str) -> bool {
        name.contains(self.marker())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|album| album.matches(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAlbums {
    pub instant_upload: CategoryId,
    pub archive: CategoryId,
    pub no_album: CategoryId,
}

impl SystemAlbums {
    pub fn get(&self, album: SystemAlbum) -> CategoryId {
        match album {
            SystemAlbum::InstantUpload => self.instant_upload,
            SystemAlbum::Archive => self.archive,
            SystemAlbum::NoAlbum => self.no_album,
        }
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        id == self.instant_upload || id == self.archive || id == self.no_album
    }
}

pub fn validate_category_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::EmptyName("category name"));
    }
    Ok(())
}
