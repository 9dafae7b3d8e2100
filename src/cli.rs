use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::Input;
use tracing::info;

use crate::config::{self, Config, SpotifyConfig};
use crate::core::downloader::Downloader;
use crate::core::playlist::Playlist;
use crate::sources::spotify::SpotifyClient;
use crate::sources::ytdlp::YtDlp;

#[derive(Parser)]
#[command(
    name = "unspotify",
    about = "Download a Spotify playlist as tagged audio files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tracks of a playlist
    List {
        /// Playlist share URL, spotify:playlist: URI or id
        playlist: String,
    },
    /// Download, tag and rename every track of a playlist
    Download {
        /// Playlist share URL, spotify:playlist: URI or id
        playlist: String,
        /// Directory the playlist folder is created in
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Exit without waiting for background tagging to finish
        #[arg(long)]
        no_wait: bool,
    },
    /// Configure Spotify credentials
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List { playlist } => cmd_list(&playlist),
        Commands::Download {
            playlist,
            output,
            no_wait,
        } => cmd_download(&playlist, output, no_wait),
        Commands::Config => cmd_config(),
    }
}

fn connect(cfg: &Config, http: &reqwest::blocking::Client) -> Result<SpotifyClient> {
    if !cfg.spotify.is_configured() {
        anyhow::bail!("Spotify is not configured, run 'unspotify config' first");
    }
    SpotifyClient::new(&cfg.spotify, http.clone())
}

fn cmd_list(playlist_url: &str) -> Result<()> {
    let cfg = config::load_config();
    let http = reqwest::blocking::Client::new();
    let client = connect(&cfg, &http)?;
    let playlist = Playlist::from_url(&client, playlist_url)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Title", "Artists", "Album", "Disc/Track", "Released"]);

    let mut count = 0;
    for track in playlist.tracks() {
        let track = track?;
        count += 1;

        let position = match track.disc_number {
            Some(disc) => format!("{}/{}", disc, track.track_number),
            None => track.track_number.to_string(),
        };
        let released = track
            .release_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(count),
            Cell::new(&track.name),
            Cell::new(track.display_artists()),
            Cell::new(&track.album_name),
            Cell::new(position),
            Cell::new(released),
        ]);
    }

    println!("{}\n", playlist.name);
    println!("{table}");
    println!("\n{} tracks", count);
    Ok(())
}

fn cmd_download(playlist_url: &str, output: Option<PathBuf>, no_wait: bool) -> Result<()> {
    let cfg = config::load_config();
    let http = reqwest::blocking::Client::new();
    let client = connect(&cfg, &http)?;
    let playlist = Playlist::from_url(&client, playlist_url)?;

    let mut settings = cfg.download.clone();
    if let Some(dir) = output {
        settings.output_dir = dir;
    }

    let backend = YtDlp::new(settings.ytdlp_path.clone());
    let downloader = Downloader::new(&backend, http, settings);
    let tasks = downloader
        .download_playlist(&playlist)
        .with_context(|| format!("failed to download «{}»", playlist.name))?;

    if no_wait {
        info!("Not waiting for {} tagging tasks.", tasks.len());
        return Ok(());
    }

    let report = tasks.wait();
    info!(
        "Done: {} tracks saved, {} failed.",
        report.saved, report.failed
    );
    Ok(())
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config();

    println!("Spotify API settings");
    println!("(create credentials at https://developer.spotify.com/dashboard)\n");

    let current_id = cfg.spotify.client_id.clone().unwrap_or_default();

    let client_id: String = Input::new()
        .with_prompt("Client ID")
        .with_initial_text(current_id)
        .interact_text()?;

    let current_secret = cfg.spotify.client_secret.clone().unwrap_or_default();

    let client_secret: String = Input::new()
        .with_prompt("Client Secret")
        .with_initial_text(current_secret)
        .interact_text()?;

    cfg.spotify = SpotifyConfig {
        client_id: Some(client_id),
        client_secret: Some(client_secret),
        access_token: cfg.spotify.access_token.take(),
    };

    config::save_config(&cfg)?;
    println!("\nSettings saved.");
    Ok(())
}
