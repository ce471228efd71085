//! Fetching audio files to the local download directory

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use log::{info, warn};
use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use crate::{config::DownloadConfig, domain::id::TrackId, provider::Provider};

use error::DownloadError;

pub mod error;

const EXTENSION: &str = "mp3";

/// Stores the audio of a track on disk
pub trait Downloader {
    /// Returns the path of the written file, or `None` if the track has no downloadable encoding
    fn download(&self, track_id: TrackId, base_name: &str) -> Result<Option<PathBuf>, DownloadError>;
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// An empty name becomes `track_<current UTC time>`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        format!("track_{}", Utc::now().format("%Y%m%d%H%M%S%3f"))
    } else {
        sanitized
    }
}

/// Keeps only plain directory names of a configured subdirectory
fn sanitize_subdir(subdir: &str) -> PathBuf {
    let mut stripped = subdir.to_string();
    loop {
        let next = stripped.replace("../", "").replace("..\\", "");
        if next == stripped {
            break;
        }
        stripped = next;
    }

    Path::new(&stripped)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Creates the download directory if needed and checks that files can be created in it
fn prepare_root(config: &DownloadConfig) -> Result<PathBuf, DownloadError> {
    let mut root = config.root.clone();
    if let Some(subdir) = config.subdir.as_deref().map(sanitize_subdir) {
        if !subdir.as_os_str().is_empty() {
            root.push(subdir);
        }
    }

    let unusable = |source: io::Error| DownloadError::Directory {
        path: root.clone(),
        source,
    };

    fs::create_dir_all(&root).map_err(unusable)?;
    tempfile::tempfile_in(&root).map_err(unusable)?;
    root.canonicalize().map_err(unusable)
}

/// Downloads tracks through links resolved by the provider
pub struct FileDownloader<P> {
    provider: P,
    client: Client,
    root: PathBuf,
}

impl<P: Provider> FileDownloader<P> {
    pub fn new(provider: P, config: &DownloadConfig) -> Result<Self, DownloadError> {
        let root = prepare_root(config)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("downloading to {}", root.display());
        Ok(Self {
            provider,
            client,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<P: Provider> Downloader for FileDownloader<P> {
    fn download(
        &self,
        track_id: TrackId,
        base_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let Some(url) = self.provider.resolve_download_url(track_id)? else {
            warn!("track {track_id} has no downloadable encoding");
            return Ok(None);
        };

        let destination = self
            .root
            .join(format!("{}.{EXTENSION}", sanitize_file_name(base_name)));

        let mut response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                track: track_id,
            });
        }

        // write next to the destination so a failed transfer never leaves a truncated file
        let mut file = NamedTempFile::new_in(&self.root)?;
        let bytes = io::copy(&mut response, &mut file)?;
        file.persist(&destination).map_err(|e| e.error)?;

        info!(
            "track {track_id}: {bytes} bytes -> {}",
            destination.display()
        );
        Ok(Some(destination))
    }
}
