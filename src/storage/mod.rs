use crate::domain::{
    artist::Artist,
    id::{ArtistId, TrackId},
    track::Track,
};

use error::StorageError;

pub mod db;
pub mod error;
pub mod operations;
pub(crate) mod schema;

/// Persistence consumed by the synchronizer.
///
/// Saves are upserts keyed by the remote id.
pub trait Store {
    fn get_artist(&mut self, id: ArtistId) -> Result<Option<Artist>, StorageError>;

    /// Inserts the artist or replaces every attribute of the stored one
    fn save_artist(&mut self, artist: &Artist) -> Result<(), StorageError>;

    fn get_track(&mut self, id: TrackId) -> Result<Option<Track>, StorageError>;

    /// Inserts or updates the track and returns the row as stored.
    ///
    /// A stored `local_path` survives an update that carries none.
    fn save_track(&mut self, track: &Track) -> Result<Track, StorageError>;

    /// Tracks of the artist in the order they were first stored
    fn artist_tracks(&mut self, artist_id: ArtistId) -> Result<Vec<Track>, StorageError>;
}
