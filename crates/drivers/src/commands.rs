use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use jpics_adapters::{
    present_batch, present_category_tree, present_instant_upload, present_picture_row,
    present_refresh, present_session, present_upload, ImageCrateEncoder, PiwigoClient,
    SqliteGalleryStore, SystemClock, WalkdirMediaScanner,
};
use jpics_application::{
    AddCategoryCommand, ApplicationError, ArchivePicturesCommand, BatchReport, DataCoordinator,
    DeleteCategoriesCommand, InstantUploadCommand, InstantUploader, LoadOutcome,
    LoadPicturesCommand, LoginCommand, PictureScope, ProgressListener, QueryResult, QueryShape,
    UploadImagesCommand, UploadPipeline,
};
use jpics_domain::{CategoryId, PictureId};
use tracing::{info, warn};

use crate::cli::Command;
use crate::config::{AppConfig, ConfigError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Usage(String),
    Runtime(String),
}

impl From<ApplicationError> for CommandError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::InvalidInput(message) => Self::Usage(message),
            ApplicationError::Domain(error) => Self::Usage(error.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(error: ConfigError) -> Self {
        Self::Runtime(error.to_string())
    }
}

/// Prints batch progress as a percentage on stderr.
struct ConsoleProgress;

impl ProgressListener for ConsoleProgress {
    fn on_progress(&self, fraction: f32) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{:>3.0}%", fraction.clamp(0.0, 1.0) * 100.0);
        let _ = stderr.flush();
    }

    fn on_completed(&self) {
        eprintln!("\r100%");
    }
}

pub struct App {
    config: AppConfig,
    config_path: PathBuf,
    coordinator: Arc<DataCoordinator>,
}

impl App {
    pub fn build(config: AppConfig, config_path: PathBuf) -> Result<Self, CommandError> {
        if config.server_url.trim().is_empty() {
            return Err(CommandError::Usage(
                "no server configured, run `jpics login <user> --server <url>` first".to_string(),
            ));
        }
        let client = PiwigoClient::new(&config.server_url, config.request_timeout())
            .map_err(|error| CommandError::Usage(error.to_string()))?;
        let store = SqliteGalleryStore::new(config.catalog_path.clone());
        let coordinator = Arc::new(DataCoordinator::new(
            Arc::new(client),
            Arc::new(store),
            config.coordinator_config(),
            config.server_url.clone(),
        ));
        coordinator.initialize()?;

        Ok(Self {
            config,
            config_path,
            coordinator,
        })
    }

    /// The session cookie does not outlive the process, so every command
    /// logs in again with the saved credentials.
    async fn connect(&self) -> Result<(), CommandError> {
        if self.config.auto_login && self.config.has_credentials() {
            let accepted = self
                .coordinator
                .login(LoginCommand {
                    username: self.config.username.clone(),
                    password: self.config.password.clone(),
                })
                .await?;
            if !accepted {
                return Err(CommandError::Runtime(
                    "saved credentials were rejected, log in again".to_string(),
                ));
            }
        } else {
            self.coordinator.check_status().await?;
        }
        Ok(())
    }

    pub async fn run(mut self, command: Command) -> Result<(), CommandError> {
        match command {
            Command::Login {
                username, password, ..
            } => self.login(username, password).await,
            Command::Logout => self.logout().await,
            Command::Status => {
                self.connect().await?;
                println!("{}", present_session(&self.coordinator.session()));
                Ok(())
            }
            Command::Refresh => {
                self.connect().await?;
                let report = self.coordinator.refresh_everything().await?;
                println!("{}", present_refresh(&report));
                Ok(())
            }
            Command::Albums => self.albums(),
            Command::Pictures { album, recursive } => self.pictures(album, recursive).await,
            Command::Upload { files, albums } => self.upload(files, albums).await,
            Command::Mkdir {
                name,
                parent,
                hidden,
            } => {
                self.connect().await?;
                let parent = parent.map(category_id).transpose()?;
                let id = self
                    .coordinator
                    .add_category(AddCategoryCommand {
                        name,
                        parent,
                        visible: !hidden,
                    })
                    .await?;
                println!("created album {id}");
                Ok(())
            }
            Command::Rmdir { ids } => {
                self.connect().await?;
                let categories = ids.into_iter().map(category_id).collect::<Result<_, _>>()?;
                let report = self
                    .coordinator
                    .delete_categories(DeleteCategoriesCommand { categories }, &ConsoleProgress)
                    .await?;
                self.finish_batch("delete albums", &report).await
            }
            Command::Archive { ids } => self.archive(ids, true).await,
            Command::Restore { ids } => self.archive(ids, false).await,
            Command::InstantUpload {
                roots,
                ignored,
                album,
            } => self.instant_upload(roots, ignored, album).await,
        }
    }

    async fn login(&mut self, username: String, password: String) -> Result<(), CommandError> {
        let accepted = self
            .coordinator
            .login(LoginCommand {
                username: username.clone(),
                password: password.clone(),
            })
            .await?;
        if !accepted {
            return Err(CommandError::Runtime(format!("login rejected for {username}")));
        }

        self.config.username = username;
        self.config.password = password;
        self.config.auto_login = true;
        self.config.save(&self.config_path)?;
        println!("{}", present_session(&self.coordinator.session()));
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), CommandError> {
        if let Err(error) = self.connect().await {
            warn!(?error, "could not open a session to close");
        } else {
            self.coordinator.logout().await?;
        }
        self.config.password.clear();
        self.config.auto_login = false;
        self.config.save(&self.config_path)?;
        println!("logged out");
        Ok(())
    }

    fn albums(&self) -> Result<(), CommandError> {
        let subscription = self.coordinator.subscribe(QueryShape::Categories)?;
        let categories = match subscription.latest() {
            Some(QueryResult::Categories(categories)) => categories,
            _ => Vec::new(),
        };
        self.coordinator.unsubscribe(&subscription)?;

        if categories.is_empty() {
            println!("no albums in catalog, run `jpics refresh`");
            return Ok(());
        }
        for line in present_category_tree(&self.coordinator.category_tree(), &categories) {
            println!("{line}");
        }
        Ok(())
    }

    async fn pictures(&self, album: i64, recursive: bool) -> Result<(), CommandError> {
        let album = category_id(album)?;
        self.connect().await?;

        let pictures = if recursive {
            let tree = self.coordinator.category_tree();
            let categories = tree.depth_first(album);
            if let LoadOutcome::Superseded = self
                .coordinator
                .load_category_pictures(LoadPicturesCommand { categories })
                .await?
            {
                return Err(CommandError::Runtime("picture load was superseded".to_string()));
            }
            self.coordinator.pictures_recursive(album)?
        } else {
            self.coordinator
                .load_category_pictures(LoadPicturesCommand {
                    categories: vec![album],
                })
                .await?;
            let include_archived = self
                .coordinator
                .system_albums()
                .is_ok_and(|albums| albums.archive == album);
            let subscription = self
                .coordinator
                .subscribe(QueryShape::Pictures(PictureScope::InCategories {
                    categories: vec![album],
                    include_archived,
                }))?;
            let pictures = match subscription.latest() {
                Some(QueryResult::Pictures(pictures)) => pictures,
                _ => Vec::new(),
            };
            self.coordinator.unsubscribe(&subscription)?;
            pictures
        };

        if pictures.is_empty() {
            println!("album {album} is empty");
        }
        for picture in &pictures {
            println!("{}", present_picture_row(picture));
        }
        Ok(())
    }

    fn pipeline(&self) -> Arc<UploadPipeline> {
        Arc::new(UploadPipeline::new(
            Arc::clone(&self.coordinator),
            Arc::new(ImageCrateEncoder::new(self.config.upload_encoding.into())),
        ))
    }

    async fn upload(&self, files: Vec<PathBuf>, albums: Vec<i64>) -> Result<(), CommandError> {
        self.connect().await?;
        let categories = if albums.is_empty() {
            vec![self.coordinator.system_albums()?.no_album]
        } else {
            albums.into_iter().map(category_id).collect::<Result<_, _>>()?
        };

        let report = self
            .pipeline()
            .upload_images(
                UploadImagesCommand {
                    files,
                    categories,
                    tags: Vec::new(),
                },
                &ConsoleProgress,
            )
            .await?;
        for line in present_upload(&report) {
            println!("{line}");
        }
        self.reconcile().await?;
        failures_to_error(report.failed.len())
    }

    async fn archive(&self, ids: Vec<i64>, archive: bool) -> Result<(), CommandError> {
        self.connect().await?;
        let pictures: Vec<PictureId> = ids
            .into_iter()
            .map(|id| PictureId::new(id).map_err(|error| CommandError::Usage(error.to_string())))
            .collect::<Result<_, _>>()?;
        let count = pictures.len();
        self.coordinator
            .archive_pictures(ArchivePicturesCommand { pictures, archive })
            .await?;
        println!(
            "{} {count} pictures",
            if archive { "archived" } else { "restored" }
        );
        Ok(())
    }

    async fn instant_upload(
        &mut self,
        roots: Vec<PathBuf>,
        ignored: Vec<PathBuf>,
        album: Option<i64>,
    ) -> Result<(), CommandError> {
        let settings = self.config.instant_upload.clone();
        let roots = if roots.is_empty() { settings.roots } else { roots };
        if roots.is_empty() {
            return Err(CommandError::Usage(
                "no folders to watch, pass --root or configure instant_upload.roots".to_string(),
            ));
        }
        let target = album
            .or(settings.target_album)
            .map(category_id)
            .transpose()?;
        let mut ignored_folders = settings.ignored_folders;
        ignored_folders.extend(ignored);

        self.connect().await?;
        let uploader = InstantUploader::new(
            self.pipeline(),
            Arc::new(WalkdirMediaScanner),
            Arc::new(SystemClock),
        );
        let report = uploader
            .run(
                InstantUploadCommand {
                    roots,
                    since: settings.last_run,
                    ignored_folders,
                    target,
                },
                &ConsoleProgress,
            )
            .await?;
        for line in present_instant_upload(&report) {
            println!("{line}");
        }

        // Failed files stay newer than the old checkpoint and are retried.
        if report.upload.is_complete() {
            self.config.instant_upload.last_run = Some(report.checkpoint);
            self.config.save(&self.config_path)?;
        }
        self.reconcile().await?;
        failures_to_error(report.upload.failed.len())
    }

    async fn finish_batch<T: Display>(
        &self,
        action: &str,
        report: &BatchReport<T>,
    ) -> Result<(), CommandError> {
        for line in present_batch(action, report) {
            println!("{line}");
        }
        self.reconcile().await?;
        failures_to_error(report.failed.len())
    }

    async fn reconcile(&self) -> Result<(), CommandError> {
        if let Some(report) = self.coordinator.reconcile().await? {
            info!(pictures = report.pictures, "local catalog reconciled");
        }
        Ok(())
    }
}

pub fn category_id(value: i64) -> Result<CategoryId, CommandError> {
    CategoryId::new(value).map_err(|error| CommandError::Usage(error.to_string()))
}

fn failures_to_error(failed: usize) -> Result<(), CommandError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CommandError::Runtime(format!("{failed} items failed")))
    }
}
