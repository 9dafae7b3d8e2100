use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::normalizer;
use crate::models::{RawTrack, TrackInfo};
use crate::sources::{CatalogError, CatalogSource};

/// Items requested per catalog call.
pub const PAGE_SIZE: u32 = 100;

/// Extracts a playlist id from a share URL, a `spotify:playlist:` URI or a
/// bare id. For URLs this is the last path segment up to the first `?`.
pub fn playlist_id_from_url(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    if let Some(id) = url.strip_prefix("spotify:playlist:") {
        return id;
    }
    let last = url.rsplit('/').next().unwrap_or(url);
    last.split('?').next().unwrap_or(last)
}

/// Lazy, forward-only sequence of raw tracks, fetched one page at a time.
pub struct PageFetcher<'a> {
    source: &'a dyn CatalogSource,
    playlist_id: String,
    position: u32,
    page: Vec<Option<RawTrack>>,
    done: bool,
}

impl<'a> PageFetcher<'a> {
    pub fn new(source: &'a dyn CatalogSource, playlist_id: impl Into<String>) -> Self {
        Self {
            source,
            playlist_id: playlist_id.into(),
            position: 0,
            page: Vec::new(),
            done: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), CatalogError> {
        let offset = PAGE_SIZE * (self.position / PAGE_SIZE);
        let page = self
            .source
            .playlist_tracks(&self.playlist_id, PAGE_SIZE, offset)?
            .ok_or_else(|| CatalogError::MissingPage {
                playlist_id: self.playlist_id.clone(),
                offset,
            })?;

        debug!(offset, items = page.items.len(), "fetched playlist page");
        self.page = page.items.into_iter().map(|item| item.track).collect();
        Ok(())
    }
}

impl Iterator for PageFetcher<'_> {
    type Item = Result<RawTrack, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.position % PAGE_SIZE == 0 {
                if let Err(e) = self.fetch_page() {
                    self.done = true;
                    return Some(Err(e));
                }
            }

            let index = (self.position % PAGE_SIZE) as usize;
            if index >= self.page.len() {
                self.done = true;
                return None;
            }
            self.position += 1;

            match self.page[index].take() {
                Some(track) => return Some(Ok(track)),
                None => warn!(
                    position = self.position - 1,
                    "skipping playlist item without a track"
                ),
            }
        }
    }
}

/// A named, read-only view over a remote playlist.
pub struct Playlist<'a> {
    pub name: String,
    pub id: String,
    source: &'a dyn CatalogSource,
}

impl<'a> Playlist<'a> {
    /// Fetches the playlist name once; tracks are fetched on demand.
    pub fn new(source: &'a dyn CatalogSource, playlist_id: &str) -> Result<Self> {
        let name = source
            .playlist_name(playlist_id)
            .with_context(|| format!("failed to fetch playlist {playlist_id}"))?;

        Ok(Self {
            name,
            id: playlist_id.to_string(),
            source,
        })
    }

    pub fn from_url(source: &'a dyn CatalogSource, playlist_url: &str) -> Result<Self> {
        Self::new(source, playlist_id_from_url(playlist_url))
    }

    /// Normalized tracks in catalog order, fetched lazily.
    pub fn tracks(&self) -> impl Iterator<Item = Result<TrackInfo>> + 'a {
        PageFetcher::new(self.source, self.id.clone()).map(|raw| {
            let raw = raw?;
            Ok(normalizer::normalize_track(&raw)?)
        })
    }

    /// All tracks, materialized. Stops at the first error.
    pub fn fetch_tracks(&self) -> Result<Vec<TrackInfo>> {
        self.tracks()
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("failed to read tracks of playlist «{}»", self.name))
    }
}
