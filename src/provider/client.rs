use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use log::{debug, warn};
use reqwest::{
    StatusCode, Url,
    blocking::Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;

use crate::{
    config::ProviderConfig,
    domain::{
        artist::Artist,
        id::{ArtistId, TrackId},
        track::Track,
    },
    provider::{
        AccountStatus, Provider,
        error::ApiError,
        response::{
            BriefInfo, DownloadInfo, Envelope, RawAccountStatus, TracksPayload, direct_link,
            select_download,
        },
    },
};

const CLIENT_HEADER: &str = "X-Yandex-Music-Client";
const CLIENT_NAME: &str = "WindowsPhone/3.17";
const USER_AGENT: &str = "Windows 10";

const MAX_PAGES: u32 = 500;

/// Blocking client of the Yandex Music API
#[derive(Clone)]
pub struct YandexProvider {
    client: Client,
    base_url: String,
    preferred_codec: String,
    page_size: u32,
}

impl YandexProvider {
    pub fn new(config: &ProviderConfig, token: &str) -> Result<Self, ApiError> {
        let mut auth =
            HeaderValue::from_str(&format!("OAuth {token}")).map_err(|_| ApiError::Unauthorized)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CLIENT_HEADER, HeaderValue::from_static(CLIENT_NAME));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            preferred_codec: config.preferred_codec.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// GETs an API endpoint and unwraps the result envelope.
    ///
    /// `None` if the service answers that the entity does not exist
    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Option<T>, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let started = Instant::now();

        let response = self.client.get(&url).send()?;
        let status = response.status();
        debug!("GET {url} -> {status} in {:?}", started.elapsed());

        match status {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ApiError::Unauthorized),
            s if !s.is_success() => {
                return Err(ApiError::Status {
                    status: s.as_u16(),
                    url,
                });
            }
            _ => {}
        }

        let body = response.text()?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_result()
    }

    /// Checks that the token belongs to a signed in account
    pub fn check_account(&self) -> Result<AccountStatus, ApiError> {
        let status: RawAccountStatus = self
            .get("account/status")?
            .ok_or_else(|| ApiError::Malformed("account status is missing".to_string()))?;
        status.into_status()
    }

    fn fetch_direct_link(&self, info: &DownloadInfo) -> Result<String, ApiError> {
        let url = Url::parse(&info.download_info_url)
            .map_err(|e| ApiError::Malformed(format!("bad download info url: {e}")))?;

        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        direct_link(&response.text()?, url.scheme())
    }
}

impl Provider for YandexProvider {
    fn fetch_artist(&self, id: ArtistId) -> Result<Option<Artist>, ApiError> {
        let info: Option<BriefInfo> = self.get(&format!("artists/{id}/brief-info"))?;
        Ok(info.and_then(|info| info.into_artist(id)))
    }

    fn fetch_tracks(&self, artist_id: ArtistId) -> Result<Vec<Track>, ApiError> {
        let mut tracks = Vec::new();
        let mut seen = HashSet::new();
        let mut page = 0;

        loop {
            let payload: Option<TracksPayload> = self.get(&format!(
                "artists/{artist_id}/tracks?page={page}&page-size={}",
                self.page_size
            ))?;

            let (raw, pager) = match payload {
                None => break,
                Some(TracksPayload::Bare(raw)) => (raw, None),
                Some(TracksPayload::Paged { tracks, pager }) => (tracks, pager),
            };

            let before = tracks.len();
            for raw in raw {
                let track = raw.into_track(artist_id)?;
                if seen.insert(track.id) {
                    tracks.push(track);
                }
            }

            // a page repeating earlier tracks means the service ignores `page`
            if tracks.len() == before {
                break;
            }
            if !pager.is_some_and(|p| p.has_more(tracks.len())) {
                break;
            }
            page += 1;
            if page >= MAX_PAGES {
                warn!("artist {artist_id}: stopped listing tracks after {MAX_PAGES} pages");
                break;
            }
        }

        debug!("artist {artist_id}: {} tracks on {} page(s)", tracks.len(), page + 1);
        Ok(tracks)
    }

    fn resolve_download_url(&self, track_id: TrackId) -> Result<Option<String>, ApiError> {
        let infos: Vec<DownloadInfo> = self
            .get(&format!("tracks/{track_id}/download-info"))?
            .unwrap_or_default();

        let Some(best) = select_download(&infos, &self.preferred_codec) else {
            debug!(
                "track {track_id}: no {} among {} encodings",
                self.preferred_codec,
                infos.len()
            );
            return Ok(None);
        };

        debug!(
            "track {track_id}: using {} {} kbps",
            best.codec, best.bitrate_in_kbps
        );
        self.fetch_direct_link(&best).map(Some)
    }
}
