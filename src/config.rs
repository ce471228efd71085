use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

pub const TOKEN_ENV_VAR: &str = "YANDEX_MUSIC_TOKEN";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub provider: ProviderConfig,
    pub download: DownloadConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Database {
    InMemory,
    OnDisk { path: PathBuf },
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// OAuth token, falls back to the `YANDEX_MUSIC_TOKEN` environment variable
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_codec")]
    pub preferred_codec: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ProviderConfig {
    pub fn resolve_token(&self) -> anyhow::Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        std::env::var(TOKEN_ENV_VAR).with_context(|| {
            format!("No provider token in config and {TOKEN_ENV_VAR} is not set")
        })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            preferred_codec: default_codec(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.music.yandex.net".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_codec() -> String {
    "mp3".to_string()
}

fn default_page_size() -> u32 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub subdir: Option<String>,
    #[serde(default)]
    pub on_failure: DownloadFailurePolicy,
    /// whole-transfer timeout for one audio file
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_download_timeout_secs() -> u64 {
    300
}

/// What the synchronizer does when a single track fails to download
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadFailurePolicy {
    /// stop the whole sync with the download error
    #[default]
    Abort,
    /// keep the track without a local file and go on
    Skip,
}
