use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use image::io::Reader as ImageReader;
use jpics_application::{ApplicationError, EncodedUpload, UploadEncoder};
use jpics_domain::detect_media_kind;

const JPEG_QUALITY: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeMode {
    /// Decode and write a full quality JPEG, dropping embedded metadata.
    #[default]
    Reencode,
    /// Send the file bytes untouched.
    Original,
}

#[derive(Debug, Default)]
pub struct ImageCrateEncoder {
    mode: EncodeMode,
}

impl ImageCrateEncoder {
    pub fn new(mode: EncodeMode) -> Self {
        Self { mode }
    }
}

impl UploadEncoder for ImageCrateEncoder {
    fn encode_for_upload(&self, path: &Path) -> Result<EncodedUpload, ApplicationError> {
        if !detect_media_kind(path).is_image() {
            return Err(ApplicationError::Decode(format!(
                "unsupported image format: {path:?}"
            )));
        }

        let metadata = fs::metadata(path).map_err(|error| ApplicationError::Io(error.to_string()))?;
        let created_at = local_time(
            metadata
                .modified()
                .map_err(|error| ApplicationError::Io(error.to_string()))?,
        );

        let (bytes, filename) = match self.mode {
            EncodeMode::Original => (
                fs::read(path).map_err(|error| ApplicationError::Io(error.to_string()))?,
                file_name(path),
            ),
            EncodeMode::Reencode => (reencode_jpeg(path)?, jpeg_file_name(path)),
        };

        Ok(EncodedUpload {
            bytes,
            filename,
            created_at,
        })
    }
}

fn reencode_jpeg(path: &Path) -> Result<Vec<u8>, ApplicationError> {
    let image = ImageReader::open(path)
        .map_err(|error| ApplicationError::Io(error.to_string()))?
        .with_guessed_format()
        .map_err(|error| ApplicationError::Decode(error.to_string()))?
        .decode()
        .map_err(|error| ApplicationError::Decode(error.to_string()))?;

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&image.to_rgb8())
        .map_err(|error| ApplicationError::Decode(error.to_string()))?;
    Ok(bytes)
}

/// Gallery dates are wall-clock times without a zone.
fn local_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn jpeg_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.jpg")
}
