use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "jpics", version, about = "Keep a local mirror of a Piwigo gallery")]
pub struct Cli {
    /// Settings file, created on first login.
    #[arg(long, env = "JPICS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in and remember the credentials for later commands
    Login {
        username: String,
        #[arg(long, env = "JPICS_PASSWORD", hide_env_values = true)]
        password: String,
        /// Gallery root, e.g. https://photos.example.org
        #[arg(long)]
        server: Option<String>,
    },
    /// Close the server session and forget the saved password
    Logout,
    /// Show who the server thinks we are
    Status,
    /// Mirror albums, pictures, tags and users into the local catalog
    Refresh,
    /// Print the album tree from the local catalog
    Albums,
    /// Fetch and list the pictures of one album
    Pictures {
        album: i64,
        /// Include pictures of every sub-album
        #[arg(long)]
        recursive: bool,
    },
    /// Upload images, reusing pictures the server already holds
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Target album, repeatable; defaults to the no-album system album
        #[arg(long = "album")]
        albums: Vec<i64>,
    },
    /// Create an album
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        hidden: bool,
    },
    /// Delete albums and their sub-albums
    Rmdir {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Move pictures to the archive
    Archive {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Bring archived pictures back
    Restore {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Upload every image added under the watched folders since the last run
    InstantUpload {
        /// Folder to scan, overriding the configured roots; repeatable
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
        /// Folder to skip, added to the configured ones; repeatable
        #[arg(long = "ignore")]
        ignored: Vec<PathBuf>,
        #[arg(long)]
        album: Option<i64>,
    },
}
