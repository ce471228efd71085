use thiserror::Error;

use crate::{
    domain::id::ArtistId, download::error::DownloadError, provider::error::ApiError,
    storage::error::StorageError,
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid artist locator: {0}")]
    Validation(String),

    #[error("artist {0} not found")]
    NotFound(ArtistId),

    #[error("provider error: {0}")]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),
}
