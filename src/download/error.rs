use std::path::PathBuf;

use thiserror::Error;

use crate::{domain::id::TrackId, provider::error::ApiError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to resolve download url: {0}")]
    Resolve(#[from] ApiError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("download of track {track} failed with status {status}")]
    Status { status: u16, track: TrackId },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download directory {path} is unusable: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
