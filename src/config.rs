use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// User token issued by an external OAuth flow, needed for private playlists.
    pub access_token: Option<String>,
}

impl SpotifyConfig {
    pub fn is_configured(&self) -> bool {
        let has_token = self.access_token.as_ref().is_some_and(|s| !s.is_empty());
        let has_credentials = self.client_id.as_ref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_ref().is_some_and(|s| !s.is_empty());
        has_token || has_credentials
    }

    /// Fills missing credentials from `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`.
    fn apply_env(&mut self) {
        if self.client_id.as_ref().map_or(true, |s| s.is_empty()) {
            self.client_id = std::env::var("SPOTIFY_CLIENT_ID").ok();
        }
        if self.client_secret.as_ref().map_or(true, |s| s.is_empty()) {
            self.client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").ok();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub ytdlp_path: String,
    /// Prepended to every `<artist> <name>` query.
    pub search_prefix: String,
    pub format: String,
    pub audio_codec: String,
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            search_prefix: "ytsearch:".to_string(),
            format: "mp3/bestaudio/best".to_string(),
            audio_codec: "mp3".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("unspotify")
        .join("config.toml")
}

pub fn load_config() -> Config {
    let path = config_path();
    let mut config = if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => parse_config(&content).unwrap_or_else(|e| {
                warn!("ignoring unreadable config {}: {:#}", path.display(), e);
                Config::default()
            }),
            Err(e) => {
                warn!("cannot read config {}: {}", path.display(), e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    config.spotify.apply_env();
    config
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).context("invalid TOML")
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}
