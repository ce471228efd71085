use serde::{Deserialize, Serialize};

use super::id::{ArtistId, TrackId};

/// Represent a music track of some artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub artist_id: ArtistId,
    pub title: String,
    pub duration_seconds: f64,
    pub album_id: Option<u64>,
    pub album_title: Option<String>,
    pub cover_url: Option<String>,
    /// set once the audio file was downloaded
    pub local_path: Option<String>,
}
