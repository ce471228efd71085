use std::time::SystemTime;

use crate::{
    config,
    domain::{
        artist::Artist,
        id::{ArtistId, TrackId},
        track::Track,
    },
    storage::{
        Store,
        db::{self, SecondsSinceUnix, system_time_to_i64},
        error::StorageError,
        schema::{columns, tables},
    },
};

use columns::*;
use rusqlite::{OptionalExtension, Row, params, types::Type};
use tables::*;

const ARTIST_COLUMNS: &str =
    "id, name, subscribers_count, monthly_listeners, albums_count, tracks_count, cover_url";

const TRACK_COLUMNS: &str =
    "id, artist_id, title, duration_seconds, album_id, album_title, cover_url, local_path";

/// SQLite integers are signed, ids and counters are stored as `i64`
fn to_sql_int(value: u64) -> rusqlite::Result<i64> {
    i64::try_from(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_sql_error(idx: usize, e: std::num::TryFromIntError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
}

fn get_u64(row: &Row, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| from_sql_error(idx, e))
}

/// Main structure that implements all storage logic
pub struct Storage {
    pub(crate) db: rusqlite::Connection,
}

/// Stored artist with counters over its stored tracks
#[derive(Debug)]
pub struct ArtistSummary {
    pub artist: Artist,
    pub stored_tracks: u64,
    pub downloaded_tracks: u64,
    pub synced_at: SecondsSinceUnix,
}

impl Storage {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db: rusqlite::Connection = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    fn now() -> Result<SecondsSinceUnix, StorageError> {
        system_time_to_i64(SystemTime::now()).map_err(StorageError::Internal)
    }

    fn artist_from_row(row: &Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: ArtistId(get_u64(row, 0)?),
            name: row.get(1)?,
            subscribers_count: get_u64(row, 2)?,
            monthly_listeners: get_u64(row, 3)?,
            albums_count: get_u64(row, 4)?,
            tracks_count: get_u64(row, 5)?,
            cover_url: row.get(6)?,
        })
    }

    fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
        let album_id: Option<i64> = row.get(4)?;
        Ok(Track {
            id: TrackId(get_u64(row, 0)?),
            artist_id: ArtistId(get_u64(row, 1)?),
            title: row.get(2)?,
            duration_seconds: row.get(3)?,
            album_id: album_id
                .map(|v| u64::try_from(v).map_err(|e| from_sql_error(4, e)))
                .transpose()?,
            album_title: row.get(5)?,
            cover_url: row.get(6)?,
            local_path: row.get(7)?,
        })
    }

    /// All stored artists ordered by name, with track counters and last sync time
    pub fn list_artists(&mut self) -> Result<Vec<ArtistSummary>, StorageError> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT a.{ID}, a.{NAME}, a.{SUBSCRIBERS_COUNT}, a.{MONTHLY_LISTENERS},
                    a.{ALBUMS_COUNT}, a.{TRACKS_COUNT}, a.{COVER_URL}, a.{UPDATED_AT},
                    COUNT(t.{ID}), COUNT(t.{LOCAL_PATH})
             FROM {ARTISTS} a
             LEFT JOIN {TRACKS} t ON t.{ARTIST_ID} = a.{ID}
             GROUP BY a.{ID}
             ORDER BY a.{NAME}, a.{ID}"
        ))?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(ArtistSummary {
                    artist: Self::artist_from_row(row)?,
                    synced_at: row.get(7)?,
                    stored_tracks: get_u64(row, 8)?,
                    downloaded_tracks: get_u64(row, 9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }
}

impl Store for Storage {
    fn get_artist(&mut self, id: ArtistId) -> Result<Option<Artist>, StorageError> {
        let artist = self
            .db
            .query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM {ARTISTS} WHERE {ID} = ?1"),
                params![to_sql_int(id.0)?],
                Self::artist_from_row,
            )
            .optional()?;
        Ok(artist)
    }

    fn save_artist(&mut self, artist: &Artist) -> Result<(), StorageError> {
        let now = Self::now()?;
        self.db.execute(
            &format!(
                "INSERT INTO {ARTISTS} ({ARTIST_COLUMNS}, {CREATED_AT}, {UPDATED_AT})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT({ID}) DO UPDATE SET
                    {NAME} = excluded.{NAME},
                    {SUBSCRIBERS_COUNT} = excluded.{SUBSCRIBERS_COUNT},
                    {MONTHLY_LISTENERS} = excluded.{MONTHLY_LISTENERS},
                    {ALBUMS_COUNT} = excluded.{ALBUMS_COUNT},
                    {TRACKS_COUNT} = excluded.{TRACKS_COUNT},
                    {COVER_URL} = excluded.{COVER_URL},
                    {UPDATED_AT} = excluded.{UPDATED_AT}"
            ),
            params![
                to_sql_int(artist.id.0)?,
                artist.name,
                to_sql_int(artist.subscribers_count)?,
                to_sql_int(artist.monthly_listeners)?,
                to_sql_int(artist.albums_count)?,
                to_sql_int(artist.tracks_count)?,
                artist.cover_url,
                now,
            ],
        )?;
        Ok(())
    }

    fn get_track(&mut self, id: TrackId) -> Result<Option<Track>, StorageError> {
        let track = self
            .db
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM {TRACKS} WHERE {ID} = ?1"),
                params![to_sql_int(id.0)?],
                Self::track_from_row,
            )
            .optional()?;
        Ok(track)
    }

    fn save_track(&mut self, track: &Track) -> Result<Track, StorageError> {
        let now = Self::now()?;
        let stored = self.db.query_row(
            &format!(
                "INSERT INTO {TRACKS} ({TRACK_COLUMNS}, {CREATED_AT}, {UPDATED_AT})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT({ID}) DO UPDATE SET
                    {ARTIST_ID} = excluded.{ARTIST_ID},
                    {TITLE} = excluded.{TITLE},
                    {DURATION_SECONDS} = excluded.{DURATION_SECONDS},
                    {ALBUM_ID} = excluded.{ALBUM_ID},
                    {ALBUM_TITLE} = excluded.{ALBUM_TITLE},
                    {COVER_URL} = excluded.{COVER_URL},
                    {LOCAL_PATH} = COALESCE(excluded.{LOCAL_PATH}, {TRACKS}.{LOCAL_PATH}),
                    {UPDATED_AT} = excluded.{UPDATED_AT}
                 RETURNING {TRACK_COLUMNS}"
            ),
            params![
                to_sql_int(track.id.0)?,
                to_sql_int(track.artist_id.0)?,
                track.title,
                track.duration_seconds,
                track.album_id.map(to_sql_int).transpose()?,
                track.album_title,
                track.cover_url,
                track.local_path,
                now,
            ],
            Self::track_from_row,
        )?;
        Ok(stored)
    }

    fn artist_tracks(&mut self, artist_id: ArtistId) -> Result<Vec<Track>, StorageError> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM {TRACKS} WHERE {ARTIST_ID} = ?1 ORDER BY {SEQ}"
        ))?;

        let tracks = stmt
            .query_map(params![to_sql_int(artist_id.0)?], Self::track_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tracks)
    }
}
