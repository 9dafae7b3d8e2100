pub mod spotify;
pub mod ytdlp;

use thiserror::Error;

use crate::models::PlaylistPage;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered a page request with no result at all.
    #[error("catalog returned no page for playlist {playlist_id} at offset {offset}")]
    MissingPage { playlist_id: String, offset: u32 },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Read access to a remote music catalog.
/// The Spotify client implements this; tests substitute fixture data.
pub trait CatalogSource {
    /// Display name of the playlist.
    fn playlist_name(&self, playlist_id: &str) -> Result<String, CatalogError>;

    /// One page of playlist items starting at `offset`.
    /// `Ok(None)` means the catalog produced no result for the request.
    fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Option<PlaylistPage>, CatalogError>;
}
