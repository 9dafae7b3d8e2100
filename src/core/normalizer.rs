use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{RawImage, RawTrack, TrackInfo};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Unsupported precision «{0}»")]
    UnsupportedPrecision(String),

    #[error("invalid release date «{value}» for precision «{precision}»")]
    InvalidDate { value: String, precision: String },

    #[error("release date missing for precision «{0}»")]
    MissingReleaseDate(String),

    #[error("track «{0}» has no artists")]
    NoArtists(String),
}

/// Converts a raw catalog record into a [`TrackInfo`].
pub fn normalize_track(track: &RawTrack) -> Result<TrackInfo, NormalizeError> {
    if track.artists.is_empty() {
        return Err(NormalizeError::NoArtists(track.name.clone()));
    }

    let release_date = normalize_release_date(
        track.album.release_date.as_deref(),
        track.album.release_date_precision.as_deref(),
    )?;

    Ok(TrackInfo {
        name: track.name.clone(),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        track_number: track.track_number,
        disc_number: track.disc_number,
        album_name: track.album.name.clone(),
        album_image_url: select_cover_url(&track.album.images).map(str::to_string),
        release_date,
    })
}

/// Picks the image with the largest height. Ties keep the earlier image and
/// images without a height never win.
pub fn select_cover_url(images: &[RawImage]) -> Option<&str> {
    let mut best: Option<(&RawImage, u32)> = None;
    for image in images {
        let height = image.height.unwrap_or(0);
        if best.map_or(height > 0, |(_, max)| height > max) {
            best = Some((image, height));
        }
    }
    best.map(|(image, _)| image.url.as_str())
}

/// Maps a release date and its precision tag to a calendar date.
///
/// `month` precision yields the first day of the month *after* the one given
/// ("2024-03" becomes 2024-04-01), so December releases fail with
/// [`NormalizeError::InvalidDate`].
pub fn normalize_release_date(
    value: Option<&str>,
    precision: Option<&str>,
) -> Result<Option<NaiveDate>, NormalizeError> {
    let Some(precision) = precision else {
        return Ok(None);
    };

    let invalid = || NormalizeError::InvalidDate {
        value: value.unwrap_or_default().to_string(),
        precision: precision.to_string(),
    };
    let require_value =
        || value.ok_or_else(|| NormalizeError::MissingReleaseDate(precision.to_string()));

    let date = match precision {
        "day" => {
            let value = require_value()?;
            if value.len() != 10 {
                return Err(invalid());
            }
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?
        }
        "month" => {
            let (year, month) = require_value()?.split_once('-').ok_or_else(invalid)?;
            let year: i32 = year.parse().map_err(|_| invalid())?;
            let month: u32 = month.parse().map_err(|_| invalid())?;
            month
                .checked_add(1)
                .and_then(|m| NaiveDate::from_ymd_opt(year, m, 1))
                .ok_or_else(invalid)?
        }
        "year" => {
            let year: i32 = require_value()?.parse().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?
        }
        other => return Err(NormalizeError::UnsupportedPrecision(other.to_string())),
    };

    Ok(Some(date))
}
