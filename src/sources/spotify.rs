use anyhow::{Context, Result};
use base64::Engine;
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::SpotifyConfig;
use crate::models::PlaylistPage;
use crate::sources::{CatalogError, CatalogSource};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

pub struct SpotifyClient {
    client: reqwest::blocking::Client,
    access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PlaylistNameResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl SpotifyClient {
    /// Builds a client from config. A pre-issued access token wins over
    /// client credentials.
    pub fn new(config: &SpotifyConfig, client: reqwest::blocking::Client) -> Result<Self> {
        if let Some(token) = config.access_token.as_ref().filter(|t| !t.is_empty()) {
            debug!("using configured Spotify access token");
            return Ok(Self {
                client,
                access_token: token.clone(),
            });
        }

        let client_id = config
            .client_id
            .as_ref()
            .context("Spotify client_id is not configured")?;
        let client_secret = config
            .client_secret
            .as_ref()
            .context("Spotify client_secret is not configured")?;

        let access_token = Self::authenticate(&client, client_id, client_secret)?;

        Ok(Self {
            client,
            access_token,
        })
    }

    fn authenticate(
        client: &reqwest::blocking::Client,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String> {
        let credentials = format!("{}:{}", client_id, client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let resp: TokenResponse = client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", encoded))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .context("failed to connect to Spotify")?
            .error_for_status()
            .context("Spotify authentication failed, check client_id and client_secret")?
            .json()
            .context("failed to parse Spotify token response")?;

        debug!("obtained Spotify client-credentials token");
        Ok(resp.access_token)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(&self.access_token)
    }

    fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, CatalogError> {
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            let body = resp.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json()?)
    }
}

impl CatalogSource for SpotifyClient {
    fn playlist_name(&self, playlist_id: &str) -> Result<String, CatalogError> {
        let resp = self
            .get(&format!("/playlists/{playlist_id}"))
            .query(&[("fields", "name")])
            .send()?;

        let playlist: PlaylistNameResponse = Self::read_json(resp)?;
        Ok(playlist.name)
    }

    fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<PlaylistPage>, CatalogError> {
        debug!(playlist_id, limit, offset, "requesting playlist page");

        let resp = self
            .get(&format!("/playlists/{playlist_id}/tracks"))
            .query(&[("limit", limit), ("offset", offset)])
            .send()?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        Self::read_json(resp)
    }
}
