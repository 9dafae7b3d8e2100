use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, error, warn};

use crate::core::downloader::{Completion, DownloadBackend, DownloadRequest};

/// How a line of yt-dlp output is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Suppressed,
    Debug,
    Warning,
    Error,
}

/// `[debug] ` chatter is dropped and errors are surfaced. Warnings and
/// everything else stay at debug level.
pub fn classify_line(line: &str) -> LineLevel {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with("[debug] ") {
        LineLevel::Suppressed
    } else if line.starts_with("ERROR:") {
        LineLevel::Error
    } else if line.starts_with("WARNING:") {
        LineLevel::Warning
    } else {
        LineLevel::Debug
    }
}

/// Whether a line is logged above debug level.
fn is_user_visible(level: LineLevel) -> bool {
    level == LineLevel::Error
}

fn log_line(line: &str) {
    let level = classify_line(line);
    let line = line.trim_end();
    if is_user_visible(level) {
        error!("{}", line);
    } else if level != LineLevel::Suppressed {
        debug!("yt-dlp: {}", line);
    }
}

/// Download backend driving the `yt-dlp` executable.
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(query: &str, request: &DownloadRequest) -> Vec<String> {
        vec![
            "--no-progress".to_string(),
            "-f".to_string(),
            request.format.clone(),
            "-x".to_string(),
            "--audio-format".to_string(),
            request.audio_codec.clone(),
            "-o".to_string(),
            request.output_template.clone(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            query.to_string(),
        ]
    }

    /// Runs one query and returns the final path of the downloaded file.
    fn download_one(&self, query: &str, request: &DownloadRequest) -> Result<Option<PathBuf>> {
        debug!(query, "running yt-dlp");
        let mut child = Command::new(&self.program)
            .args(Self::args(query, request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        let stderr = child.stderr.take().context("failed to capture yt-dlp stderr")?;
        let stderr_reader = thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(|line| line.ok()) {
                log_line(&line);
            }
        });

        let stdout = child.stdout.take().context("failed to capture yt-dlp stdout")?;
        let mut path = None;
        for line in BufReader::new(stdout).lines() {
            let line = line.context("failed to read yt-dlp output")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match classify_line(trimmed) {
                LineLevel::Debug => path = Some(PathBuf::from(trimmed)),
                _ => log_line(trimmed),
            }
        }

        let status = child.wait().context("failed to wait for yt-dlp")?;
        let _ = stderr_reader.join();

        if !status.success() {
            anyhow::bail!("yt-dlp exited with {status} for «{query}»");
        }
        Ok(path)
    }
}

impl DownloadBackend for YtDlp {
    fn download(
        &self,
        queries: &[String],
        request: &DownloadRequest,
        on_complete: &mut dyn FnMut(Completion),
    ) -> Result<()> {
        for (index, query) in queries.iter().enumerate() {
            match self.download_one(query, request) {
                Ok(Some(path)) => on_complete(Completion { index, path }),
                Ok(None) => warn!("yt-dlp reported no file for «{}»", query),
                Err(e) => error!("{:#}", e),
            }
        }
        Ok(())
    }
}
