use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    ApplicationError, Clock, InstantUploadCommand, MediaScanner, ProgressListener,
    UploadImagesCommand, UploadPipeline, UploadReport,
};

/// Folders whose images never go to the instant-upload album.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderRules {
    ignored: Vec<PathBuf>,
}

impl FolderRules {
    pub fn new(ignored: Vec<PathBuf>) -> Self {
        Self { ignored }
    }

    /// A folder is ignored when it is, or lies under, an ignored folder.
    pub fn is_ignored(&self, folder: &Path) -> bool {
        self.ignored.iter().any(|ignored| folder.starts_with(ignored))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantUploadReport {
    pub candidates: usize,
    pub upload: UploadReport,
    /// Taken before scanning; images modified later are picked up next run.
    pub checkpoint: DateTime<Utc>,
}

pub struct InstantUploader {
    pipeline: Arc<UploadPipeline>,
    scanner: Arc<dyn MediaScanner>,
    clock: Arc<dyn Clock>,
}

impl InstantUploader {
    pub fn new(
        pipeline: Arc<UploadPipeline>,
        scanner: Arc<dyn MediaScanner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pipeline,
            scanner,
            clock,
        }
    }

    /// Uploads every image modified after `since`, oldest first.
    pub async fn run(
        &self,
        command: InstantUploadCommand,
        progress: &dyn ProgressListener,
    ) -> Result<InstantUploadReport, ApplicationError> {
        let checkpoint = self.clock.now();
        let target = match command.target {
            Some(target) => target,
            None => self.pipeline.coordinator().system_albums()?.instant_upload,
        };
        let rules = FolderRules::new(command.ignored_folders);

        let mut files: Vec<_> = self
            .scanner
            .scan_images(&command.roots)?
            .into_iter()
            .filter(|file| command.since.map_or(true, |since| file.modified > since))
            .filter(|file| !rules.is_ignored(&file.folder))
            .collect();
        files.sort_by(|left, right| {
            left.modified
                .cmp(&right.modified)
                .then_with(|| left.path.cmp(&right.path))
        });
        let candidates = files.len();
        info!(candidates, %target, "instant upload scan finished");

        let upload = if files.is_empty() {
            UploadReport::default()
        } else {
            self.pipeline
                .upload_images(
                    UploadImagesCommand {
                        files: files.into_iter().map(|file| file.path).collect(),
                        categories: vec![target],
                        tags: Vec::new(),
                    },
                    progress,
                )
                .await?
        };

        Ok(InstantUploadReport {
            candidates,
            upload,
            checkpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::coordinator::tests::synced;
    use crate::fakes::{category_id, FakeApi};
    use crate::{EncodedUpload, GalleryStore, MediaFile, NoProgress, UploadEncoder};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0)
            .single()
            .expect("timestamp")
    }

    struct FakeScanner(Vec<MediaFile>);

    impl MediaScanner for FakeScanner {
        fn scan_images(&self, _roots: &[PathBuf]) -> Result<Vec<MediaFile>, ApplicationError> {
            Ok(self.0.clone())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingEncoder {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl UploadEncoder for RecordingEncoder {
        fn encode_for_upload(&self, path: &Path) -> Result<EncodedUpload, ApplicationError> {
            self.seen.lock().expect("seen").push(path.to_path_buf());
            Ok(EncodedUpload {
                bytes: path.to_string_lossy().as_bytes().to_vec(),
                filename: "x.jpg".to_string(),
                created_at: at(0).naive_utc(),
            })
        }
    }

    fn media(path: &str, modified: DateTime<Utc>) -> MediaFile {
        let path = PathBuf::from(path);
        MediaFile {
            folder: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            path,
            modified,
        }
    }

    #[test]
    fn ignored_folders_cover_their_subfolders() {
        let rules = FolderRules::new(vec![PathBuf::from("/sdcard/WhatsApp")]);

        assert!(rules.is_ignored(Path::new("/sdcard/WhatsApp")));
        assert!(rules.is_ignored(Path::new("/sdcard/WhatsApp/Media/Images")));
        assert!(!rules.is_ignored(Path::new("/sdcard/WhatsAppBackup")));
        assert!(!rules.is_ignored(Path::new("/sdcard/DCIM")));
    }

    #[tokio::test]
    async fn uploads_new_images_oldest_first_into_instant_album() {
        let harness = synced(FakeApi::new().with_system_albums()).await;
        let encoder = Arc::new(RecordingEncoder::default());
        let pipeline = Arc::new(UploadPipeline::new(
            Arc::clone(&harness.coordinator),
            Arc::clone(&encoder) as Arc<dyn UploadEncoder>,
        ));
        let scanner = FakeScanner(vec![
            media("/sdcard/DCIM/late.jpg", at(300)),
            media("/sdcard/DCIM/old.jpg", at(10)),
            media("/sdcard/WhatsApp/Media/chat.jpg", at(200)),
            media("/sdcard/DCIM/early.jpg", at(150)),
        ]);
        let uploader = InstantUploader::new(
            pipeline,
            Arc::new(scanner),
            Arc::new(FixedClock(at(1_000))),
        );

        let report = uploader
            .run(
                InstantUploadCommand {
                    roots: vec![PathBuf::from("/sdcard")],
                    since: Some(at(100)),
                    ignored_folders: vec![PathBuf::from("/sdcard/WhatsApp")],
                    target: None,
                },
                &NoProgress,
            )
            .await
            .expect("run");

        assert_eq!(report.candidates, 2);
        assert_eq!(report.checkpoint, at(1_000));
        assert_eq!(
            *encoder.seen.lock().expect("seen"),
            vec![
                PathBuf::from("/sdcard/DCIM/early.jpg"),
                PathBuf::from("/sdcard/DCIM/late.jpg"),
            ]
        );
        for id in &report.upload.uploaded {
            assert_eq!(
                harness.store.picture_categories(*id).expect("links"),
                vec![category_id(1)]
            );
        }
        assert_eq!(report.upload.uploaded.len(), 2);
    }
}
