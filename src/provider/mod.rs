//! Remote music service access

use crate::domain::{
    artist::Artist,
    id::{ArtistId, TrackId},
    track::Track,
};

use error::ApiError;

pub mod client;
pub mod error;
mod response;

#[cfg(test)]
pub(crate) mod fake_api;

/// Read side of the streaming service consumed by the synchronizer and the downloader
pub trait Provider {
    /// `None` if the service does not know the artist
    fn fetch_artist(&self, id: ArtistId) -> Result<Option<Artist>, ApiError>;

    /// All tracks of the artist in service order, empty if there are none
    fn fetch_tracks(&self, artist_id: ArtistId) -> Result<Vec<Track>, ApiError>;

    /// Direct link to the best encoding of the preferred codec, if any
    fn resolve_download_url(&self, track_id: TrackId) -> Result<Option<String>, ApiError>;
}

/// Account the provider token belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct AccountStatus {
    pub uid: u64,
    pub login: Option<String>,
    pub has_plus: bool,
}
