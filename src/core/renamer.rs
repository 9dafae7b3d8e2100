use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::models::TrackInfo;

/// Replaces characters that cannot appear in a file name with `_`.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '/' || c == '\0' {
                return '_';
            }
            if cfg!(target_os = "windows") {
                if matches!(c, '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                    return '_';
                }
                if c.is_ascii_control() {
                    return '_';
                }
            }
            if cfg!(target_os = "macos") && c == ':' {
                return '_';
            }
            c
        })
        .collect()
}

/// Builds `"{artist} - {name}"` plus the given extension, if any.
/// Returns None when the artist or the name is blank.
pub fn build_filename(info: &TrackInfo, extension: Option<&str>) -> Option<String> {
    let artist = info.primary_artist().trim();
    let name = info.name.trim();
    if artist.is_empty() || name.is_empty() {
        return None;
    }
    let stem = format!("{} - {}", sanitize_filename(artist), sanitize_filename(name));
    Some(match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    })
}

/// Renames the file to `"{artist} - {name}"` in the same directory, keeping
/// its extension. Fails if another file already has that name.
pub fn rename_file(old_path: &Path, info: &TrackInfo) -> Result<PathBuf> {
    let extension = old_path.extension().and_then(|e| e.to_str());
    let new_name = match build_filename(info, extension) {
        Some(name) => name,
        None => bail!("both artist and track name are required to rename a file"),
    };

    let dir = old_path.parent().unwrap_or_else(|| Path::new("."));
    let new_path = dir.join(&new_name);

    if old_path == new_path {
        return Ok(new_path);
    }

    if new_path.exists() {
        bail!("file already exists: {}", new_path.display());
    }

    std::fs::rename(old_path, &new_path)?;
    Ok(new_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, name: &str) -> TrackInfo {
        TrackInfo {
            name: name.to_string(),
            artists: vec![artist.to_string(), "Featured".to_string()],
            track_number: 1,
            disc_number: None,
            album_name: "Album".to_string(),
            album_image_url: None,
            release_date: None,
        }
    }

    #[test]
    fn test_sanitize_filename_removes_slash_and_null() {
        assert_eq!(sanitize_filename("a/b\0c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_filename_normal_text() {
        assert_eq!(sanitize_filename("Hello World"), "Hello World");
    }

    #[test]
    fn test_build_filename_uses_primary_artist() {
        assert_eq!(
            build_filename(&track("IU", "Good Day"), Some("mp3")),
            Some("IU - Good Day.mp3".to_string())
        );
    }

    #[test]
    fn test_build_filename_without_extension() {
        assert_eq!(
            build_filename(&track("IU", "Good Day"), None),
            Some("IU - Good Day".to_string())
        );
    }

    #[test]
    fn test_build_filename_blank_name() {
        assert_eq!(build_filename(&track("IU", "  "), Some("mp3")), None);
    }

    #[test]
    fn test_build_filename_sanitizes() {
        assert_eq!(
            build_filename(&track("AC/DC", "Back\0Slash"), Some("opus")),
            Some("AC_DC - Back_Slash.opus".to_string())
        );
    }

    #[test]
    fn test_rename_keeps_extension_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("IU - Good Day (MV).m4a");
        std::fs::write(&old, b"audio").unwrap();

        let new_path = rename_file(&old, &track("IU", "Good Day")).unwrap();
        assert_eq!(new_path, dir.path().join("IU - Good Day.m4a"));
        assert!(new_path.exists());
        assert!(!old.exists());
    }

    #[test]
    fn test_rename_collision_fails() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("download.mp3");
        std::fs::write(&old, b"new").unwrap();
        std::fs::write(dir.path().join("IU - Good Day.mp3"), b"existing").unwrap();

        assert!(rename_file(&old, &track("IU", "Good Day")).is_err());
        assert!(old.exists());
    }

    #[test]
    fn test_rename_same_name_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("IU - Good Day.mp3");
        std::fs::write(&old, b"audio").unwrap();

        assert_eq!(rename_file(&old, &track("IU", "Good Day")).unwrap(), old);
    }
}
