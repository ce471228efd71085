//! Wire shapes of the service responses and their mapping to domain records.
//!
//! The service is not consistent about its payloads: ids come as numbers or
//! strings, covers are single images or mosaics, track lists are paged objects
//! or bare arrays. Every known shape is an enum variant here and is mapped to
//! exactly one canonical record.

use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, de::IgnoredAny};

use crate::{
    domain::{
        artist::Artist,
        id::{ArtistId, TrackId},
        track::Track,
    },
    provider::{AccountStatus, error::ApiError},
};

const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";
const NOT_FOUND: &str = "not-found";

/// Every response is either `{"result": ...}` or `{"error": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Success { result: T },
    Failure { error: RemoteError },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RemoteError {
    Detailed {
        name: String,
        #[serde(default)]
        message: Option<String>,
    },
    Plain(String),
}

impl<T> Envelope<T> {
    /// `Ok(None)` for a not-found error, the remote error for any other
    pub(crate) fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            Envelope::Success { result } => Ok(Some(result)),
            Envelope::Failure { error } => {
                let (name, message) = match error {
                    RemoteError::Detailed { name, message } => (name, message.unwrap_or_default()),
                    RemoteError::Plain(name) => (name, String::new()),
                };
                if name == NOT_FOUND {
                    Ok(None)
                } else {
                    Err(ApiError::Remote { name, message })
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumericId {
    Number(u64),
    Text(String),
}

impl NumericId {
    fn value(&self) -> Result<u64, ApiError> {
        match self {
            NumericId::Number(n) => Ok(*n),
            NumericId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::Malformed(format!("'{s}' is not a numeric id"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Cover {
    Single {
        uri: String,
    },
    Mosaic {
        #[serde(rename = "itemsUri")]
        items_uri: Vec<String>,
    },
    Unknown(IgnoredAny),
}

impl Cover {
    fn url(&self) -> Option<String> {
        let uri = match self {
            Cover::Single { uri } => Some(uri.as_str()),
            Cover::Mosaic { items_uri } => items_uri.first().map(String::as_str),
            Cover::Unknown(_) => None,
        };
        uri.and_then(https_url)
    }
}

fn https_url(uri: &str) -> Option<String> {
    let uri = uri.trim();
    (!uri.is_empty()).then(|| format!("https://{uri}"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct BriefInfo {
    #[serde(default)]
    pub artist: Option<RawArtist>,
    #[serde(default)]
    pub stats: Option<RawStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawArtist {
    pub name: String,
    #[serde(default)]
    pub likes_count: Option<u64>,
    #[serde(default)]
    pub counts: Option<RawCounts>,
    #[serde(default)]
    pub cover: Option<Cover>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCounts {
    #[serde(default)]
    pub direct_albums: Option<u64>,
    #[serde(default)]
    pub tracks: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStats {
    #[serde(default)]
    pub last_month_listeners: Option<u64>,
}

impl BriefInfo {
    /// The artist is identified by the requested id, the payload may omit it
    pub(crate) fn into_artist(self, id: ArtistId) -> Option<Artist> {
        let artist = self.artist?;
        let counts = artist.counts.as_ref();

        Some(Artist {
            id,
            subscribers_count: artist.likes_count.unwrap_or(0),
            monthly_listeners: self
                .stats
                .and_then(|s| s.last_month_listeners)
                .unwrap_or(0),
            albums_count: counts.and_then(|c| c.direct_albums).unwrap_or(0),
            tracks_count: counts.and_then(|c| c.tracks).unwrap_or(0),
            cover_url: artist.cover.as_ref().and_then(Cover::url),
            name: artist.name,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TracksPayload {
    Paged {
        tracks: Vec<RawTrack>,
        #[serde(default)]
        pager: Option<Pager>,
    },
    Bare(Vec<RawTrack>),
}

/// Only the total is trusted, the page numbers it reports are ignored
#[derive(Debug, Deserialize, Clone, Copy)]
pub(crate) struct Pager {
    pub total: u64,
}

impl Pager {
    /// Whether tracks beyond the `fetched` distinct ones remain on later pages
    pub(crate) fn has_more(&self, fetched: usize) -> bool {
        u64::try_from(fetched).is_ok_and(|fetched| fetched < self.total)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTrack {
    pub id: NumericId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub albums: Vec<RawAlbum>,
    #[serde(default)]
    pub cover_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbum {
    pub id: NumericId,
    #[serde(default)]
    pub title: Option<String>,
}

impl RawTrack {
    pub(crate) fn into_track(self, artist_id: ArtistId) -> Result<Track, ApiError> {
        let album = self.albums.first();
        let album_id = album.map(|a| a.id.value()).transpose()?;

        Ok(Track {
            id: TrackId(self.id.value()?),
            artist_id,
            title: self.title,
            duration_seconds: self.duration_ms.unwrap_or(0) as f64 / 1000.0,
            album_id,
            album_title: album.and_then(|a| a.title.clone()),
            cover_url: self.cover_uri.as_deref().and_then(https_url),
            local_path: None,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadInfo {
    pub codec: String,
    pub bitrate_in_kbps: u32,
    pub download_info_url: String,
}

/// Highest bitrate among the entries of the given codec, the first one wins a tie
pub(crate) fn select_download(infos: &[DownloadInfo], codec: &str) -> Option<DownloadInfo> {
    infos
        .iter()
        .filter(|info| info.codec.eq_ignore_ascii_case(codec))
        .fold(None, |best: Option<&DownloadInfo>, info| match best {
            Some(best) if best.bitrate_in_kbps >= info.bitrate_in_kbps => Some(best),
            _ => Some(info),
        })
        .cloned()
}

static XML_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][\w-]*)>\s*([^<]*?)\s*</[A-Za-z][\w-]*>")
        .expect("xml element regex is valid")
});

/// Text of the first leaf element named `tag`
fn xml_field(document: &str, tag: &str) -> Result<String, ApiError> {
    XML_ELEMENT
        .captures_iter(document)
        .find(|c| &c[1] == tag)
        .map(|c| c[2].to_string())
        .ok_or_else(|| ApiError::Malformed(format!("download info has no <{tag}>")))
}

/// Builds the signed direct link out of the download info document.
///
/// The link uses the scheme the document was served with.
pub(crate) fn direct_link(document: &str, scheme: &str) -> Result<String, ApiError> {
    let host = xml_field(document, "host")?;
    let path = xml_field(document, "path")?;
    let ts = xml_field(document, "ts")?;
    let s = xml_field(document, "s")?;

    let mut hasher = Md5::new();
    hasher.update(SIGN_SALT.as_bytes());
    hasher.update(path.strip_prefix('/').unwrap_or(&path).as_bytes());
    hasher.update(s.as_bytes());
    let sign = format!("{:x}", hasher.finalize());

    Ok(format!("{scheme}://{host}/get-mp3/{sign}/{ts}{path}"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccountStatus {
    pub account: RawAccount,
    #[serde(default)]
    pub plus: Option<RawPlus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccount {
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlus {
    #[serde(default)]
    pub has_plus: bool,
}

impl RawAccountStatus {
    /// An anonymous account (no uid) means the token was not accepted
    pub(crate) fn into_status(self) -> Result<AccountStatus, ApiError> {
        let uid = self.account.uid.ok_or(ApiError::Unauthorized)?;
        Ok(AccountStatus {
            uid,
            login: self.account.login,
            has_plus: self.plus.is_some_and(|p| p.has_plus),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn brief_info(value: serde_json::Value) -> Option<Artist> {
        let envelope: Envelope<BriefInfo> = serde_json::from_value(value).unwrap();
        envelope
            .into_result()
            .unwrap()
            .and_then(|info| info.into_artist(ArtistId(36800)))
    }

    #[test]
    fn test_full_brief_info() {
        let artist = brief_info(json!({
            "invocationInfo": {"req-id": "x"},
            "result": {
                "artist": {
                    "id": 36800,
                    "name": "Zemfira",
                    "likesCount": 812345,
                    "counts": {"tracks": 210, "directAlbums": 12, "alsoAlbums": 3},
                    "cover": {"type": "from-artist-photos", "uri": "avatars.yandex.net/get-music-content/1/%%"}
                },
                "stats": {"lastMonthListeners": 1500000}
            }
        }))
        .unwrap();

        assert_eq!(
            artist,
            Artist {
                id: ArtistId(36800),
                name: "Zemfira".to_string(),
                subscribers_count: 812345,
                monthly_listeners: 1500000,
                albums_count: 12,
                tracks_count: 210,
                cover_url: Some("https://avatars.yandex.net/get-music-content/1/%%".to_string()),
            }
        );
    }

    #[test]
    fn test_sparse_brief_info_defaults_to_zero() {
        let artist = brief_info(json!({
            "result": {"artist": {"name": "Nobody", "cover": {"type": "pic", "uri": ""}}}
        }))
        .unwrap();

        assert_eq!(artist.subscribers_count, 0);
        assert_eq!(artist.monthly_listeners, 0);
        assert_eq!(artist.albums_count, 0);
        assert_eq!(artist.tracks_count, 0);
        assert_eq!(artist.cover_url, None);
    }

    #[test]
    fn test_mosaic_and_unknown_covers() {
        let mosaic = brief_info(json!({
            "result": {"artist": {"name": "M", "cover": {"type": "mosaic", "itemsUri": ["a.net/1/%%", "a.net/2/%%"]}}}
        }))
        .unwrap();
        assert_eq!(mosaic.cover_url.as_deref(), Some("https://a.net/1/%%"));

        let unknown = brief_info(json!({
            "result": {"artist": {"name": "U", "cover": {"type": "video"}}}
        }))
        .unwrap();
        assert_eq!(unknown.cover_url, None);
    }

    #[test]
    fn test_missing_artist_and_not_found_error() {
        assert_eq!(brief_info(json!({"result": {}})), None);
        assert_eq!(
            brief_info(json!({"error": {"name": "not-found", "message": "artist not found"}})),
            None
        );
    }

    #[test]
    fn test_other_remote_errors_are_kept() {
        let envelope: Envelope<BriefInfo> =
            serde_json::from_value(json!({"error": "session-expired"})).unwrap();

        let err = envelope.into_result().unwrap_err();
        assert!(matches!(err, ApiError::Remote { name, .. } if name == "session-expired"));
    }

    #[test]
    fn test_track_normalization() {
        let raw: RawTrack = serde_json::from_value(json!({
            "id": "39974598",
            "title": "Хочешь?",
            "durationMs": 217650,
            "albums": [{"id": 5307396, "title": "Прости меня моя любовь"}, {"id": 1}],
            "coverUri": "avatars.yandex.net/get-music-content/2/%%"
        }))
        .unwrap();

        let track = raw.into_track(ArtistId(36800)).unwrap();

        assert_eq!(track.id, TrackId(39974598));
        assert_eq!(track.artist_id, ArtistId(36800));
        assert_eq!(track.title, "Хочешь?");
        assert_eq!(track.duration_seconds, 217.65);
        assert_eq!(track.album_id, Some(5307396));
        assert_eq!(track.album_title.as_deref(), Some("Прости меня моя любовь"));
        assert_eq!(
            track.cover_url.as_deref(),
            Some("https://avatars.yandex.net/get-music-content/2/%%")
        );
        assert_eq!(track.local_path, None);
    }

    #[test]
    fn test_track_without_album_or_duration() {
        let raw: RawTrack = serde_json::from_value(json!({"id": 5, "title": "Demo"})).unwrap();
        let track = raw.into_track(ArtistId(1)).unwrap();

        assert_eq!(track.duration_seconds, 0.0);
        assert_eq!(track.album_id, None);
        assert_eq!(track.album_title, None);
        assert_eq!(track.cover_url, None);
    }

    #[test]
    fn test_track_with_non_numeric_id_is_malformed() {
        let raw: RawTrack = serde_json::from_value(json!({"id": "abc", "title": "x"})).unwrap();
        assert!(matches!(
            raw.into_track(ArtistId(1)),
            Err(ApiError::Malformed(..))
        ));
    }

    #[test]
    fn test_tracks_payload_variants() {
        let paged: TracksPayload = serde_json::from_value(json!({
            "pager": {"total": 3, "page": 0, "perPage": 2},
            "tracks": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]
        }))
        .unwrap();
        match paged {
            TracksPayload::Paged { tracks, pager } => {
                assert_eq!(tracks.len(), 2);
                assert!(pager.unwrap().has_more(tracks.len()));
            }
            TracksPayload::Bare(_) => panic!("expected paged payload"),
        }

        let bare: TracksPayload = serde_json::from_value(json!([{"id": 3, "title": "c"}])).unwrap();
        assert!(matches!(bare, TracksPayload::Bare(tracks) if tracks.len() == 1));
    }

    #[test]
    fn test_pager_last_page() {
        let pager: Pager =
            serde_json::from_value(json!({"total": 4, "page": 1, "perPage": 2})).unwrap();
        assert!(pager.has_more(2));
        assert!(!pager.has_more(4));
        assert!(!pager.has_more(5));

        // page arithmetic from the service is never used, so huge values are harmless
        let huge: Pager = serde_json::from_value(
            json!({"total": u64::MAX, "page": u64::MAX, "perPage": u64::MAX}),
        )
        .unwrap();
        assert!(huge.has_more(usize::MAX));
        assert!(!Pager { total: 0 }.has_more(0));
    }

    fn info(codec: &str, bitrate: u32, url: &str) -> DownloadInfo {
        DownloadInfo {
            codec: codec.to_string(),
            bitrate_in_kbps: bitrate,
            download_info_url: url.to_string(),
        }
    }

    #[test]
    fn test_select_highest_bitrate_of_codec() {
        let infos = vec![
            info("mp3", 192, "a"),
            info("aac", 512, "b"),
            info("mp3", 320, "c"),
            info("mp3", 128, "d"),
        ];

        assert_eq!(select_download(&infos, "mp3").unwrap().download_info_url, "c");
        assert_eq!(select_download(&infos, "aac").unwrap().download_info_url, "b");
        assert!(select_download(&infos, "flac").is_none());
        assert!(select_download(&[], "mp3").is_none());
    }

    #[test]
    fn test_select_keeps_first_on_tie() {
        let infos = vec![info("mp3", 320, "first"), info("mp3", 320, "second")];
        assert_eq!(
            select_download(&infos, "mp3").unwrap().download_info_url,
            "first"
        );
    }

    #[test]
    fn test_direct_link() {
        let document = r#"<?xml version="1.0" encoding="utf-8"?>
<download-info><host>s123vla.storage.yandex.net</host><path>/rmusic/U2FsdGVk/track.mp3</path><ts>0005f1a2b3c4</ts><region>-1</region><s>abcdef0123</s></download-info>"#;

        let mut hasher = Md5::new();
        hasher.update(b"XGRlBW9FXlekgbPrRHuSiArmusic/U2FsdGVk/track.mp3abcdef0123");
        let sign = format!("{:x}", hasher.finalize());

        assert_eq!(
            direct_link(document, "https").unwrap(),
            format!(
                "https://s123vla.storage.yandex.net/get-mp3/{sign}/0005f1a2b3c4/rmusic/U2FsdGVk/track.mp3"
            )
        );
    }

    #[test]
    fn test_xml_fields_in_any_order() {
        let document = "<download-info>\n  <s> sss </s>\n  <ts>01</ts>\n  <path>/p.mp3</path>\n  <host>h.net</host>\n</download-info>";

        assert_eq!(xml_field(document, "host").unwrap(), "h.net");
        assert_eq!(xml_field(document, "s").unwrap(), "sss");
        assert_eq!(xml_field(document, "ts").unwrap(), "01");
        assert!(direct_link(document, "https")
            .unwrap()
            .starts_with("https://h.net/get-mp3/"));
    }

    #[test]
    fn test_direct_link_missing_field() {
        let err = direct_link("<download-info><host>h</host></download-info>", "https").unwrap_err();
        assert!(matches!(err, ApiError::Malformed(..)));
    }

    #[test]
    fn test_account_status() {
        let status: RawAccountStatus = serde_json::from_value(json!({
            "account": {"uid": 1130000012345678u64, "login": "listener"},
            "plus": {"hasPlus": true}
        }))
        .unwrap();
        assert_eq!(
            status.into_status().unwrap(),
            AccountStatus {
                uid: 1130000012345678,
                login: Some("listener".to_string()),
                has_plus: true,
            }
        );

        let anonymous: RawAccountStatus =
            serde_json::from_value(json!({"account": {"now": "2024-01-01"}})).unwrap();
        assert!(matches!(
            anonymous.into_status(),
            Err(ApiError::Unauthorized)
        ));
    }
}
