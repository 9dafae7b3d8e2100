use chrono::NaiveDate;
use serde::Deserialize;

/// Normalized metadata for one catalog track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    pub artists: Vec<String>,
    pub track_number: u32,
    pub disc_number: Option<u32>,
    pub album_name: String,
    pub album_image_url: Option<String>,
    pub release_date: Option<NaiveDate>,
}

impl TrackInfo {
    /// The first credited artist. Normalized tracks always carry at least one.
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or_default()
    }

    pub fn display_artists(&self) -> String {
        self.artists.join(", ")
    }

    pub fn release_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.release_date.map(|d| d.year())
    }
}

/// One page of the "playlist tracks" endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    /// Null for tracks removed from the catalog or local-only files.
    pub track: Option<RawTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    pub name: String,
    pub artists: Vec<RawArtist>,
    pub track_number: u32,
    #[serde(default)]
    pub disc_number: Option<u32>,
    pub album: RawAlbum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<RawImage>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    pub url: String,
    pub height: Option<u32>,
}
