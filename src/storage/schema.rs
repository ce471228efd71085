use rusqlite::Connection;

pub mod tables {
    pub const ARTISTS: &str = "artists";
    pub const TRACKS: &str = "tracks";

    pub const ALL_TABLES: &[&str] = &[ARTISTS, TRACKS];
}

pub mod columns {
    pub const ID: &str = "id";
    /// insertion counter of `tracks`, never reused or changed by updates
    pub const SEQ: &str = "seq";
    pub const NAME: &str = "name";
    pub const SUBSCRIBERS_COUNT: &str = "subscribers_count";
    pub const MONTHLY_LISTENERS: &str = "monthly_listeners";
    pub const ALBUMS_COUNT: &str = "albums_count";
    pub const TRACKS_COUNT: &str = "tracks_count";
    pub const COVER_URL: &str = "cover_url";

    pub const ARTIST_ID: &str = "artist_id";
    pub const TITLE: &str = "title";
    pub const DURATION_SECONDS: &str = "duration_seconds";
    pub const ALBUM_ID: &str = "album_id";
    pub const ALBUM_TITLE: &str = "album_title";
    pub const LOCAL_PATH: &str = "local_path";

    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    subscribers_count INTEGER NOT NULL DEFAULT 0,
    monthly_listeners INTEGER NOT NULL DEFAULT 0,
    albums_count INTEGER NOT NULL DEFAULT 0,
    tracks_count INTEGER NOT NULL DEFAULT 0,
    cover_url TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tracks (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL UNIQUE,
    artist_id INTEGER NOT NULL REFERENCES artists(id),
    title TEXT NOT NULL,
    duration_seconds REAL NOT NULL DEFAULT 0,
    album_id INTEGER,
    album_title TEXT,
    cover_url TEXT,
    local_path TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS tracks_artist_id ON tracks (artist_id);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
