use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use id3::{Tag, TagLike, Timestamp, Version};
use tracing::{debug, info};

use crate::core::renamer;
use crate::models::TrackInfo;

/// Fills `tag` with the text frames for `info`.
/// `original_stem` is recorded as the original file name (TOFN).
fn apply_text_frames(tag: &mut Tag, info: &TrackInfo, original_stem: Option<&str>) {
    if let Some(stem) = original_stem {
        tag.set_text("TOFN", stem);
    }
    tag.set_title(&info.name);
    tag.set_artist(info.display_artists());
    tag.set_album_artist(info.primary_artist());
    tag.set_track(info.track_number);
    if let Some(disc) = info.disc_number {
        tag.set_disc(disc);
    }
    tag.set_album(&info.album_name);
    if let Some(year) = info.release_year() {
        tag.set_original_date_released(Timestamp {
            year,
            month: None,
            day: None,
            hour: None,
            minute: None,
            second: None,
        });
    }
}

/// Writes `info` (and the cover, if given) to the file as ID3v2.4.
/// Existing frames not covered by `info` are kept.
pub fn write_tags(path: &Path, info: &TrackInfo, cover: Option<&[u8]>) -> Result<()> {
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());

    let stem = path.file_stem().and_then(|s| s.to_str());
    apply_text_frames(&mut tag, info, stem);

    if let Some(art_data) = cover {
        tag.remove_all_pictures();
        tag.add_frame(id3::frame::Picture {
            mime_type: detect_mime_type(art_data),
            picture_type: id3::frame::PictureType::CoverFront,
            description: "Cover".to_string(),
            data: art_data.to_vec(),
        });
    }

    tag.write_to_path(path, Version::Id3v24)
        .with_context(|| format!("failed to write tags to {}", path.display()))?;
    Ok(())
}

/// Downloads cover art with a plain GET.
pub fn fetch_cover(http: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>> {
    let data = http
        .get(url)
        .send()
        .context("failed to download cover art")?
        .error_for_status()?
        .bytes()?
        .to_vec();

    debug!(url, bytes = data.len(), "fetched cover art");
    Ok(data)
}

/// Tags a downloaded file with its catalog metadata and renames it to
/// `<artist> - <name>`. Nothing is rolled back if a later step fails.
pub fn tag_and_rename(
    http: &reqwest::blocking::Client,
    path: &Path,
    info: &TrackInfo,
) -> Result<PathBuf> {
    let cover = match info.album_image_url.as_deref() {
        Some(url) => Some(fetch_cover(http, url)?),
        None => None,
    };

    write_tags(path, info, cover.as_deref())?;
    let new_path = renamer::rename_file(path, info)?;

    info!("\tFinished saving «{}».", info.name);
    Ok(new_path)
}

/// Guesses the picture MIME type from its magic bytes.
fn detect_mime_type(data: &[u8]) -> String {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png".to_string()
    } else {
        "image/jpeg".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use chrono::NaiveDate;

    use super::*;

    pub(crate) fn sample_track() -> TrackInfo {
        TrackInfo {
            name: "Digital Love".to_string(),
            artists: vec!["Daft Punk".to_string(), "DJ Sneak".to_string()],
            track_number: 3,
            disc_number: Some(1),
            album_name: "Discovery".to_string(),
            album_image_url: None,
            release_date: NaiveDate::from_ymd_opt(2001, 3, 12),
        }
    }

    /// A few bytes of MPEG frame header; enough for the tag writer.
    pub(crate) fn fake_audio(path: &Path) {
        let mut data = vec![0xFF, 0xFB, 0x90, 0x64];
        data.resize(512, 0);
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn test_write_tags_sets_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Daft Punk - Digital Love (Official Audio).mp3");
        fake_audio(&path);

        write_tags(&path, &sample_track(), None).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Digital Love"));
        assert_eq!(tag.artist(), Some("Daft Punk, DJ Sneak"));
        assert_eq!(tag.album_artist(), Some("Daft Punk"));
        assert_eq!(tag.album(), Some("Discovery"));
        assert_eq!(tag.track(), Some(3));
        assert_eq!(tag.disc(), Some(1));
        assert_eq!(tag.original_date_released().map(|t| t.year), Some(2001));
        assert_eq!(
            tag.get("TOFN").and_then(|f| f.content().text()),
            Some("Daft Punk - Digital Love (Official Audio)")
        );
        assert_eq!(tag.pictures().count(), 0);
    }

    #[test]
    fn test_write_tags_without_release_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        fake_audio(&path);

        let mut track = sample_track();
        track.release_date = None;
        track.disc_number = None;
        write_tags(&path, &track, None).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert!(tag.original_date_released().is_none());
        assert!(tag.disc().is_none());
    }

    #[test]
    fn test_write_tags_embeds_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        fake_audio(&path);

        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        write_tags(&path, &sample_track(), Some(&jpeg)).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        let picture = tag.pictures().next().unwrap();
        assert_eq!(picture.mime_type, "image/jpeg");
        assert_eq!(picture.picture_type, id3::frame::PictureType::CoverFront);
        assert_eq!(picture.data, jpeg);
    }

    #[test]
    fn test_tag_and_rename_without_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Digital Love [HQ].mp3");
        fake_audio(&path);

        let http = reqwest::blocking::Client::new();
        let new_path = tag_and_rename(&http, &path, &sample_track()).unwrap();

        assert_eq!(new_path, dir.path().join("Daft Punk - Digital Love.mp3"));
        assert!(!path.exists());
        let tag = Tag::read_from_path(&new_path).unwrap();
        assert_eq!(tag.title(), Some("Digital Love"));
    }

    /// Answers a single HTTP request with `status` and `body`, returning the URL.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}/cover.jpg")
    }

    fn local_client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn test_tag_and_rename_embeds_fetched_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Digital Love [HQ].mp3");
        fake_audio(&path);

        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 9, 8, 7];
        let mut track = sample_track();
        track.album_image_url = Some(serve_once("200 OK", jpeg.clone()));

        let new_path = tag_and_rename(&local_client(), &path, &track).unwrap();

        assert_eq!(new_path, dir.path().join("Daft Punk - Digital Love.mp3"));
        assert!(!path.exists());
        let tag = Tag::read_from_path(&new_path).unwrap();
        let picture = tag.pictures().next().unwrap();
        assert_eq!(picture.mime_type, "image/jpeg");
        assert_eq!(picture.data, jpeg);
        assert_eq!(tag.title(), Some("Digital Love"));
    }

    #[test]
    fn test_failed_cover_fetch_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Digital Love [HQ].mp3");
        fake_audio(&path);

        let mut track = sample_track();
        track.album_image_url = Some(serve_once("404 Not Found", Vec::new()));

        assert!(tag_and_rename(&local_client(), &path, &track).is_err());

        assert!(path.exists());
        assert!(!dir.path().join("Daft Punk - Digital Love.mp3").exists());
        let untagged = match Tag::read_from_path(&path) {
            Ok(tag) => tag.get("TIT2").is_none(),
            Err(_) => true,
        };
        assert!(untagged);
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "image/png");
        assert_eq!(detect_mime_type(&[0xFF, 0xD8]), "image/jpeg");
    }
}
