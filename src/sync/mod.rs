//! Incremental synchronization of one artist.
//!
//! A first sync stores the whole remote track list, later syncs only add the
//! tracks that are not stored for the artist yet. Tracks are handled one at a
//! time: optional download, then upsert. Nothing is rolled back when a step
//! fails, so a rerun continues from what is already stored.

use std::{collections::HashSet, path::PathBuf};

use log::{debug, info, warn};

use crate::{
    config::DownloadFailurePolicy,
    domain::{
        artist::ArtistSnapshot,
        id::{ArtistId, TrackId},
        locator::parse_artist_id,
        track::Track,
    },
    download::{Downloader, sanitize_file_name},
    provider::Provider,
    storage::Store,
};

use error::SyncError;

pub mod error;

/// `<artist id>_<title>` with both parts reduced to file name safe characters
pub fn file_base_name(artist_id: ArtistId, title: &str) -> String {
    format!(
        "{}_{}",
        sanitize_file_name(&artist_id.to_string()),
        sanitize_file_name(title)
    )
}

pub struct Synchronizer<P, S, D> {
    provider: P,
    store: S,
    downloader: D,
    on_download_failure: DownloadFailurePolicy,
}

impl<P: Provider, S: Store, D: Downloader> Synchronizer<P, S, D> {
    pub fn new(provider: P, store: S, downloader: D) -> Self {
        Self {
            provider,
            store,
            downloader,
            on_download_failure: DownloadFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: DownloadFailurePolicy) -> Self {
        self.on_download_failure = policy;
        self
    }

    /// Syncs the artist whose id is found in a link like `https://music.yandex.ru/artist/36800`
    pub fn synchronize_locator(
        &mut self,
        locator: &str,
        download: bool,
    ) -> Result<ArtistSnapshot, SyncError> {
        let id = parse_artist_id(locator)
            .ok_or_else(|| SyncError::Validation(locator.to_string()))?;
        self.synchronize(id, download)
    }

    /// Brings the stored artist and its tracks up to date with the service.
    ///
    /// The store is not touched if the service does not know the artist.
    pub fn synchronize(
        &mut self,
        id: ArtistId,
        download: bool,
    ) -> Result<ArtistSnapshot, SyncError> {
        let artist = self
            .provider
            .fetch_artist(id)?
            .ok_or(SyncError::NotFound(id))?;

        let known = self.store.get_artist(id)?.is_some();
        self.store.save_artist(&artist)?;

        let tracks = if known {
            info!("artist {id} ({}) is known, looking for new tracks", artist.name);
            self.add_new_tracks(id, download)?
        } else {
            info!("artist {id} ({}) is new, storing its tracks", artist.name);
            self.add_all_tracks(id, download)?
        };

        Ok(ArtistSnapshot { artist, tracks })
    }

    /// Stored tracks followed by the remote ones not stored for this artist yet.
    ///
    /// A failed or empty remote listing leaves the stored tracks as they are.
    fn add_new_tracks(&mut self, id: ArtistId, download: bool) -> Result<Vec<Track>, SyncError> {
        let mut tracks = self.store.artist_tracks(id)?;

        let remote = match self.provider.fetch_tracks(id) {
            Ok(remote) if !remote.is_empty() => remote,
            Ok(_) => {
                warn!(
                    "no remote tracks for artist {id}, keeping {} stored",
                    tracks.len()
                );
                return Ok(tracks);
            }
            Err(e) => {
                warn!(
                    "failed to fetch tracks of artist {id}, keeping {} stored: {e}",
                    tracks.len()
                );
                return Ok(tracks);
            }
        };

        let mut known: HashSet<TrackId> = tracks.iter().map(|t| t.id).collect();
        let new: Vec<Track> = remote
            .into_iter()
            .filter(|t| known.insert(t.id))
            .collect();

        info!("artist {id}: {} new track(s)", new.len());
        for track in new {
            let stored = self.store_track(track, download)?;
            tracks.push(stored);
        }

        Ok(tracks)
    }

    /// Every remote track in service order. Tracks already in the store are reused as stored.
    fn add_all_tracks(&mut self, id: ArtistId, download: bool) -> Result<Vec<Track>, SyncError> {
        let remote = self.provider.fetch_tracks(id)?;
        let mut seen = HashSet::new();
        let mut tracks = Vec::with_capacity(remote.len());

        for track in remote {
            if !seen.insert(track.id) {
                continue;
            }
            if let Some(existing) = self.store.get_track(track.id)? {
                debug!("track {} is already stored, reusing it", track.id);
                tracks.push(existing);
                continue;
            }
            let stored = self.store_track(track, download)?;
            tracks.push(stored);
        }

        info!("artist {id}: {} track(s)", tracks.len());
        Ok(tracks)
    }

    fn store_track(&mut self, mut track: Track, download: bool) -> Result<Track, SyncError> {
        if download {
            track.local_path = self
                .download(&track)?
                .map(|path| path.to_string_lossy().into_owned());
        }

        let stored = self.store.save_track(&track)?;
        debug!(
            "stored track {} '{}'{}",
            stored.id,
            stored.title,
            stored
                .local_path
                .as_deref()
                .map(|p| format!(" at {p}"))
                .unwrap_or_default()
        );
        Ok(stored)
    }

    fn download(&self, track: &Track) -> Result<Option<PathBuf>, SyncError> {
        let base_name = file_base_name(track.artist_id, &track.title);

        match self.downloader.download(track.id, &base_name) {
            Ok(path) => Ok(path),
            Err(e) if self.on_download_failure == DownloadFailurePolicy::Skip => {
                warn!("skipping download of track {}: {e}", track.id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
