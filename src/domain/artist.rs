use serde::{Deserialize, Serialize};

use super::{id::ArtistId, track::Track};

/// Artist metadata as reported by the streaming service.
///
/// Overwritten as a whole on every sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub subscribers_count: u64,
    pub monthly_listeners: u64,
    pub albums_count: u64,
    pub tracks_count: u64,
    pub cover_url: Option<String>,
}

/// State of one artist after a sync: the artist record plus its tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSnapshot {
    #[serde(flatten)]
    pub artist: Artist,
    pub tracks: Vec<Track>,
}

impl ArtistSnapshot {
    pub fn downloaded(&self) -> usize {
        self.tracks.iter().filter(|t| t.local_path.is_some()).count()
    }
}
