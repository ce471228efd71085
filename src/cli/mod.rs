use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config;
use crate::domain::artist::ArtistSnapshot;
use crate::domain::locator::parse_artist_id;
use crate::download::FileDownloader;
use crate::provider::client::YandexProvider;
use crate::storage::Store;
use crate::storage::db::i64_seconds_to_local_time;
use crate::storage::operations::Storage;
use crate::sync::Synchronizer;

#[derive(Parser)]
#[command(name = "tracksync")]
#[command(version = "0.1")]
#[command(about = "Keeps a local copy of artists' tracks from Yandex Music")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync an artist given a link like https://music.yandex.ru/artist/36800
    Sync {
        locator: String,
        /// Download audio of newly stored tracks
        #[arg(short, long)]
        download: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what is stored for an artist, without contacting the service
    Show {
        locator: String,
        #[arg(long)]
        json: bool,
    },
    /// List stored artists
    List,
    /// Check that the configured token is accepted
    Check,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .to_str()
        .context("Config path is not valid UTF-8")?;
    let cfg = config::Config::load(config_path)?;

    match cli.command {
        Commands::Sync {
            locator,
            download,
            json,
        } => {
            let provider = provider(&cfg)?;
            let downloader = FileDownloader::new(provider.clone(), &cfg.download)
                .context("Failed to prepare download directory")?;
            let download_root = downloader.root().to_path_buf();
            let storage = Storage::new(&cfg.database).context("Failed to initialize storage")?;

            let mut synchronizer = Synchronizer::new(provider, storage, downloader)
                .with_failure_policy(cfg.download.on_failure);
            let snapshot = synchronizer
                .synchronize_locator(&locator, download)
                .with_context(|| format!("Failed to sync {locator}"))?;

            print_snapshot(&snapshot, json)?;
            if download && !json {
                println!("Audio files are in {}", download_root.display());
            }
        }

        Commands::Show { locator, json } => {
            let Some(id) = parse_artist_id(&locator) else {
                bail!("No artist id in {locator}");
            };
            let mut storage =
                Storage::new(&cfg.database).context("Failed to initialize storage")?;

            let Some(artist) = storage.get_artist(id)? else {
                bail!("Artist {id} was never synced");
            };
            let tracks = storage.artist_tracks(id)?;

            print_snapshot(&ArtistSnapshot { artist, tracks }, json)?;
        }

        Commands::List => {
            let mut storage =
                Storage::new(&cfg.database).context("Failed to initialize storage")?;
            let artists = storage.list_artists()?;

            if artists.is_empty() {
                println!("No artists synced yet");
            }
            for summary in artists {
                println!(
                    "{} {}: {} tracks stored, {} downloaded, synced {}",
                    summary.artist.id,
                    summary.artist.name,
                    summary.stored_tracks,
                    summary.downloaded_tracks,
                    i64_seconds_to_local_time(summary.synced_at)?.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        Commands::Check => {
            let status = provider(&cfg)?
                .check_account()
                .context("Token check failed")?;
            println!(
                "Token belongs to {} (uid {}), Plus subscription: {}",
                status.login.as_deref().unwrap_or("<no login>"),
                status.uid,
                if status.has_plus { "yes" } else { "no" }
            );
        }
    }

    Ok(())
}

fn provider(cfg: &config::Config) -> anyhow::Result<YandexProvider> {
    let token = cfg.provider.resolve_token()?;
    YandexProvider::new(&cfg.provider, &token).context("Failed to build API client")
}

fn print_snapshot(snapshot: &ArtistSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let artist = &snapshot.artist;
    println!(
        "{} {} ({} subscribers, {} monthly listeners)",
        artist.id, artist.name, artist.subscribers_count, artist.monthly_listeners
    );
    println!(
        "  {} tracks stored, {} downloaded",
        snapshot.tracks.len(),
        snapshot.downloaded()
    );
    for track in &snapshot.tracks {
        match &track.local_path {
            Some(path) => println!("    - {} {} at {}", track.id, track.title, path),
            None => println!("    - {} {}", track.id, track.title),
        }
    }
    Ok(())
}
