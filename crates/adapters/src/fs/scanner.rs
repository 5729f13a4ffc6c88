use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jpics_application::{ApplicationError, MediaFile, MediaScanner};
use jpics_domain::detect_media_kind;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct WalkdirMediaScanner;

impl MediaScanner for WalkdirMediaScanner {
    fn scan_images(&self, roots: &[PathBuf]) -> Result<Vec<MediaFile>, ApplicationError> {
        let mut files = Vec::new();

        for root in roots {
            if !root.is_dir() {
                return Err(ApplicationError::InvalidInput(format!(
                    "folder does not exist or is not a directory: {}",
                    root.display()
                )));
            }

            for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() || !detect_media_kind(entry.path()).is_image() {
                    continue;
                }

                let modified = match entry.metadata().map(|metadata| metadata.modified()) {
                    Ok(Ok(modified)) => DateTime::<Utc>::from(modified),
                    Ok(Err(error)) => {
                        warn!(path = %entry.path().display(), %error, "skipping file without mtime");
                        continue;
                    }
                    Err(error) => {
                        warn!(path = %entry.path().display(), %error, "skipping unreadable file");
                        continue;
                    }
                };

                files.push(MediaFile {
                    path: entry.path().to_path_buf(),
                    folder: entry
                        .path()
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default(),
                    modified,
                });
            }
        }

        Ok(files)
    }
}
