use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::DownloadConfig;
use crate::core::playlist::Playlist;
use crate::core::{renamer, tagger};
use crate::models::TrackInfo;

/// Options handed to the download backend for a whole batch.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Preferred source format, e.g. `mp3/bestaudio/best`.
    pub format: String,
    /// Codec the audio is transcoded to after download.
    pub audio_codec: String,
    /// Output path template; `%(title)s` and `%(ext)s` are filled per item.
    pub output_template: String,
}

/// One finished download. `index` points into the submitted query list.
#[derive(Debug, Clone)]
pub struct Completion {
    pub index: usize,
    pub path: PathBuf,
}

/// Searches for and downloads a batch of queries, calling `on_complete`
/// inline for every file it produces.
pub trait DownloadBackend {
    fn download(
        &self,
        queries: &[String],
        request: &DownloadRequest,
        on_complete: &mut dyn FnMut(Completion),
    ) -> Result<()>;
}

/// Builds the search query for a track: `<prefix><artist> <name>`.
pub fn build_search_query(prefix: &str, track: &TrackInfo) -> String {
    format!("{}{} {}", prefix, track.primary_artist(), track.name)
}

/// Output template for a playlist: `<output dir>/<playlist name>/%(title)s.%(ext)s`.
pub fn output_template(output_dir: &Path, playlist_name: &str) -> String {
    output_dir
        .join(renamer::sanitize_filename(playlist_name))
        .join("%(title)s.%(ext)s")
        .to_string_lossy()
        .into_owned()
}

/// Outcome of the background tagging work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaggingReport {
    pub saved: usize,
    pub failed: usize,
}

/// Handles of the background tagging threads spawned during a download.
#[derive(Default)]
pub struct TaggingTasks {
    handles: Vec<JoinHandle<Result<PathBuf>>>,
}

impl TaggingTasks {
    fn spawn(&mut self, http: reqwest::blocking::Client, path: PathBuf, track: TrackInfo) {
        let handle = thread::spawn(move || {
            let result = tagger::tag_and_rename(&http, &path, &track);
            if let Err(e) = &result {
                error!("failed to tag «{}» ({}): {:#}", track.name, path.display(), e);
            }
            result
        });
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Blocks until every tagging thread has finished.
    pub fn wait(self) -> TaggingReport {
        let mut report = TaggingReport::default();
        for handle in self.handles {
            match handle.join() {
                Ok(Ok(_)) => report.saved += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(_) => {
                    error!("tagging thread panicked");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Downloads playlist tracks through a [`DownloadBackend`] and tags each
/// file in the background as soon as it lands.
pub struct Downloader<'a> {
    backend: &'a dyn DownloadBackend,
    http: reqwest::blocking::Client,
    settings: DownloadConfig,
}

impl<'a> Downloader<'a> {
    pub fn new(
        backend: &'a dyn DownloadBackend,
        http: reqwest::blocking::Client,
        settings: DownloadConfig,
    ) -> Self {
        Self {
            backend,
            http,
            settings,
        }
    }

    pub fn download_playlist(&self, playlist: &Playlist) -> Result<TaggingTasks> {
        let tracks = playlist.fetch_tracks()?;
        info!("Found {} tracks in «{}».", tracks.len(), playlist.name);
        self.download_tracks(&playlist.name, &tracks)
    }

    /// Submits every track as one batch. Returns without waiting for the
    /// tagging threads.
    pub fn download_tracks(&self, playlist_name: &str, tracks: &[TrackInfo]) -> Result<TaggingTasks> {
        let queries: Vec<String> = tracks
            .iter()
            .map(|t| build_search_query(&self.settings.search_prefix, t))
            .collect();

        let request = DownloadRequest {
            format: self.settings.format.clone(),
            audio_codec: self.settings.audio_codec.clone(),
            output_template: output_template(&self.settings.output_dir, playlist_name),
        };

        let total = tracks.len();
        let mut finished = 0;
        let mut tasks = TaggingTasks::default();

        let result = self.backend.download(&queries, &request, &mut |completion: Completion| {
            let Some(track) = tracks.get(completion.index) else {
                warn!(
                    "download backend reported unknown item {} ({})",
                    completion.index,
                    completion.path.display()
                );
                return;
            };

            finished += 1;
            info!("({}/{}) \tDownloaded «{}»...", finished, total, track.name);
            tasks.spawn(self.http.clone(), completion.path, track.clone());
        });

        if let Err(e) = result {
            let report = tasks.wait();
            error!(
                "download stopped after {} of {} tracks ({} tagged, {} failed)",
                finished, total, report.saved, report.failed
            );
            return Err(e);
        }

        Ok(tasks)
    }
}
