use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jpics_domain::{CategoryId, PictureId, TagId};
use md5::{Digest, Md5};
use tracing::{debug, info, warn};

use crate::progress::ScaledProgress;
use crate::{
    AddToCategoriesCommand, ApiError, ApplicationError, BatchFailure, DataCoordinator,
    EncodedUpload, ImageAddition, NoProgress, ProgressListener, UploadEncoder,
    UploadImagesCommand,
};

/// Raw bytes per chunk, before base64.
pub const CHUNK_SIZE: usize = 500_000;

const DEFAULT_AUTHOR: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(PictureId),
    /// The server already held the same content.
    Reused(PictureId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<PictureId>,
    pub reused: Vec<PictureId>,
    pub failed: Vec<BatchFailure<PathBuf>>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn md5_hex(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Uploads images one after the other, deduplicating by content checksum.
pub struct UploadPipeline {
    coordinator: Arc<DataCoordinator>,
    encoder: Arc<dyn UploadEncoder>,
}

impl UploadPipeline {
    pub fn new(coordinator: Arc<DataCoordinator>, encoder: Arc<dyn UploadEncoder>) -> Self {
        Self {
            coordinator,
            encoder,
        }
    }

    pub fn coordinator(&self) -> &Arc<DataCoordinator> {
        &self.coordinator
    }

    /// Overall progress is `(index + fraction) / total`. A failing image is
    /// recorded and the batch moves on to the next one.
    pub async fn upload_images(
        &self,
        command: UploadImagesCommand,
        progress: &dyn ProgressListener,
    ) -> Result<UploadReport, ApplicationError> {
        self.coordinator.action_token()?;
        let total = command.files.len();
        let mut report = UploadReport::default();
        progress.on_started();

        for (index, path) in command.files.iter().enumerate() {
            let scaled = ScaledProgress {
                inner: progress,
                index,
                total,
            };
            match self
                .upload_one(path, &command.categories, &command.tags, &scaled)
                .await
            {
                Ok(UploadOutcome::Uploaded(id)) => report.uploaded.push(id),
                Ok(UploadOutcome::Reused(id)) => report.reused.push(id),
                Err(error) => {
                    warn!(path = %path.display(), %error, "upload failed");
                    scaled.on_completed();
                    report.failed.push(BatchFailure {
                        item: path.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        progress.on_completed();
        info!(
            uploaded = report.uploaded.len(),
            reused = report.reused.len(),
            failed = report.failed.len(),
            "upload batch finished"
        );
        Ok(report)
    }

    /// Ready check, checksum, existence check, then either reuse of the
    /// existing picture or chunked transfer followed by finalisation.
    pub async fn upload_one(
        &self,
        path: &Path,
        categories: &[CategoryId],
        tags: &[TagId],
        progress: &dyn ProgressListener,
    ) -> Result<UploadOutcome, ApplicationError> {
        let coordinator = self.coordinator.as_ref();
        let ready = coordinator
            .remote("pwg.images.checkUpload", || async move {
                coordinator
                    .api
                    .check_upload()
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;
        if !ready {
            return Err(ApplicationError::Remote(ApiError::Server {
                code: 0,
                message: "server is not ready to receive uploads".to_string(),
            }));
        }

        let encoded = self.encode(path).await?;
        if encoded.bytes.is_empty() {
            return Err(ApplicationError::InvalidInput(format!(
                "{} has no content",
                path.display()
            )));
        }
        let sum = md5_hex(&encoded.bytes);
        let sums = std::slice::from_ref(&sum);
        let existing = coordinator
            .remote("pwg.images.exist", || async move {
                coordinator
                    .api
                    .existing_pictures(sums)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?
            .into_iter()
            .next()
            .flatten();

        if let Some(id) = existing {
            self.reuse(id, categories).await?;
            progress.on_completed();
            return Ok(UploadOutcome::Reused(id));
        }

        self.send_chunks(&encoded, &sum, progress).await?;

        let addition = ImageAddition {
            original_sum: sum,
            filename: encoded.filename.clone(),
            name: encoded.filename,
            author: DEFAULT_AUTHOR.to_string(),
            created_at: encoded.created_at,
            comment: String::new(),
            categories: categories.to_vec(),
            tags: tags.to_vec(),
        };
        let addition = &addition;
        let id = coordinator
            .remote_once("pwg.images.add", || async move {
                coordinator
                    .api
                    .add_image(addition)
                    .await
                    .map_err(ApplicationError::from)
            })
            .await?;

        coordinator.mirror_picture(id).await?;
        info!(%id, path = %path.display(), "image uploaded");
        progress.on_completed();
        Ok(UploadOutcome::Uploaded(id))
    }

    async fn encode(&self, path: &Path) -> Result<EncodedUpload, ApplicationError> {
        let encoder = Arc::clone(&self.encoder);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || encoder.encode_for_upload(&path))
            .await
            .map_err(|error| ApplicationError::Io(error.to_string()))?
    }

    async fn send_chunks(
        &self,
        encoded: &EncodedUpload,
        sum: &str,
        progress: &dyn ProgressListener,
    ) -> Result<(), ApplicationError> {
        let coordinator = self.coordinator.as_ref();
        let total = encoded.bytes.len();
        let mut sent = 0;

        for (position, chunk) in encoded.bytes.chunks(CHUNK_SIZE).enumerate() {
            let data = STANDARD.encode(chunk);
            let data = data.as_str();
            coordinator
                .remote("pwg.images.addChunk", || async move {
                    coordinator
                        .api
                        .add_chunk(data, sum, position)
                        .await
                        .map_err(ApplicationError::from)
                })
                .await?;

            sent += chunk.len();
            debug!(position, sent, total, "chunk sent");
            if sent < total {
                progress.on_progress(sent as f32 / total as f32);
            }
        }
        Ok(())
    }

    /// Attaches an already uploaded picture to the requested albums and brings
    /// it back from the archive when needed.
    async fn reuse(&self, id: PictureId, categories: &[CategoryId]) -> Result<(), ApplicationError> {
        let coordinator = self.coordinator.as_ref();
        info!(%id, "content already on server, reusing picture");

        let picture = match coordinator.store.find_picture(id)? {
            Some(picture) => picture,
            None => coordinator.mirror_picture(id).await?,
        };

        if !categories.is_empty() {
            let report = coordinator
                .add_pictures_to_categories(
                    AddToCategoriesCommand {
                        pictures: vec![id],
                        categories: categories.to_vec(),
                    },
                    &NoProgress,
                )
                .await?;
            if let Some(failure) = report.failed.into_iter().next() {
                return Err(ApplicationError::Remote(ApiError::Server {
                    code: 0,
                    message: failure.reason,
                }));
            }
        }

        if picture.archived {
            coordinator.restore_pictures(vec![id]).await?;
        }
        Ok(())
    }
}
