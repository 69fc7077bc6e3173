use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use rust_embed::RustEmbed;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info};

use crate::model::{Format, VideoMeta};
use crate::progress::{PROGRESS_TEMPLATE, parse_progress_from_line};

/// Optional bundled yt-dlp binary; drop one into assets/ to ship it.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Everything the engine layer can raise. All of these are absorbed into a
/// failure outcome at the worker boundary; none crosses the task.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("yt-dlp not found (bundle it under assets/ or install it on PATH)")]
    ToolMissing,
    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse video metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    /// Failure reported by yt-dlp itself, message shown verbatim.
    #[error("{0}")]
    Engine(String),
}

/// Audio transform step applied by the engine after the raw stream download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPostprocessor {
    pub codec: &'static str,
    pub bitrate_kbps: u32,
}

/// Closed configuration handed to yt-dlp for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Stream selection expression, e.g. `best[height<=720]`.
    pub format_selector: String,
    /// Output path template with title and extension placeholders.
    pub output_template: String,
    pub postprocessor: Option<AudioPostprocessor>,
}

impl EngineConfig {
    /// Maps a target onto the engine configuration.
    ///
    /// Video targets ask for the best stream at or below their ceiling; if
    /// nothing satisfies the constraint, whatever yt-dlp does then is the
    /// behavior. MP3 asks for the best audio stream and transcodes it.
    pub fn for_request(format: Format, downloads_dir: &Path) -> Self {
        let output_template = format!("{}/%(title)s.%(ext)s", downloads_dir.display());
        match format.height_ceiling() {
            Some(height) => Self {
                format_selector: format!("best[height<={}]", height),
                output_template,
                postprocessor: None,
            },
            None => Self {
                format_selector: "bestaudio/best".to_string(),
                output_template,
                postprocessor: Some(AudioPostprocessor {
                    codec: "mp3",
                    bitrate_kbps: 192,
                }),
            },
        }
    }

    /// Renders the yt-dlp argument vector for this configuration.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_owned(),
            self.format_selector.clone(),
            "--no-playlist".to_owned(),
            "-o".to_owned(),
            self.output_template.clone(),
        ];
        if let Some(pp) = &self.postprocessor {
            args.push("-x".to_owned());
            args.push("--audio-format".to_owned());
            args.push(pp.codec.to_owned());
            args.push("--audio-quality".to_owned());
            args.push(format!("{}K", pp.bitrate_kbps));
        }
        args
    }
}

/// Finds a usable yt-dlp: the embedded asset (unpacked once into the temp
/// dir) first, then common install locations, then PATH.
pub fn locate_ytdlp() -> Result<PathBuf, EngineError> {
    let bin = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };

    if let Some(data) = Asset::get(bin) {
        let tmp = std::env::temp_dir().join(bin);
        if !tmp.exists() {
            let mut f = File::create(&tmp)?;
            f.write_all(&data.data)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))?;
            }
        }
        return Ok(tmp);
    }

    for path in ["/opt/homebrew/bin/yt-dlp", "/usr/local/bin/yt-dlp", "/usr/bin/yt-dlp"] {
        if Path::new(path).exists() {
            return Ok(PathBuf::from(path));
        }
    }

    let finder = if cfg!(target_os = "windows") { "where" } else { "which" };
    if let Ok(out) = std::process::Command::new(finder).arg(bin).output() {
        if out.status.success() {
            let path = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
    }

    Err(EngineError::ToolMissing)
}

/// Resolves metadata only; no bytes are written to disk.
pub async fn resolve_metadata(bin: &Path, url: &str) -> Result<VideoMeta, EngineError> {
    debug!(url, "resolving metadata");
    let output = Command::new(bin)
        .args(["--dump-json", "--no-playlist", "--no-warnings", url])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Engine(stderr_message(&stderr).unwrap_or_else(
            || format!("yt-dlp exited with {}", output.status),
        )));
    }

    let meta: VideoMeta = serde_json::from_slice(&output.stdout)?;
    Ok(meta)
}

/// Runs the actual download, streaming progress lines as they arrive.
pub async fn run_download(
    bin: &Path,
    url: &str,
    config: &EngineConfig,
    mut on_progress: impl FnMut(f32),
) -> Result<(), EngineError> {
    let mut args = config.to_args();
    args.push("--newline".to_owned());
    args.push("--progress-template".to_owned());
    args.push(PROGRESS_TEMPLATE.to_owned());
    args.push(url.to_owned());

    info!(url, selector = %config.format_selector, "starting yt-dlp");
    let mut child = Command::new(bin)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::Engine("failed to capture yt-dlp stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| EngineError::Engine("failed to capture yt-dlp stderr".to_string()))?;

    // Collect stderr on the side; it only matters if the engine fails.
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut collected = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            collected.push(line);
        }
        collected.join("\n")
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(fraction) = parse_progress_from_line(&line) {
            on_progress(fraction);
        }
    }

    let status = child.wait().await?;
    let stderr_text = stderr_task.await.unwrap_or_default();
    if !status.success() {
        return Err(EngineError::Engine(stderr_message(&stderr_text).unwrap_or_else(
            || format!("yt-dlp exited with {}", status),
        )));
    }
    Ok(())
}

/// Picks the user-facing message out of yt-dlp stderr. yt-dlp prefixes its
/// own failures with "ERROR:"; prefer those lines over surrounding noise.
fn stderr_message(stderr: &str) -> Option<String> {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return None;
    }
    let errors: Vec<&str> = trimmed
        .lines()
        .filter(|l| l.trim_start().starts_with("ERROR:"))
        .collect();
    if errors.is_empty() {
        Some(trimmed.to_string())
    } else {
        Some(errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mp3_requests_best_audio_with_a_192k_transcode() {
        let config = EngineConfig::for_request(Format::Mp3, Path::new("downloads"));
        assert_eq!(config.format_selector, "bestaudio/best");
        assert_eq!(config.output_template, "downloads/%(title)s.%(ext)s");
        assert_eq!(
            config.postprocessor,
            Some(AudioPostprocessor { codec: "mp3", bitrate_kbps: 192 })
        );

        assert_eq!(
            config.to_args(),
            vec![
                "-f",
                "bestaudio/best",
                "--no-playlist",
                "-o",
                "downloads/%(title)s.%(ext)s",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
            ]
        );
    }

    #[test]
    fn video_targets_use_a_height_ceiling_without_postprocessing() {
        let config = EngineConfig::for_request(Format::Q720, Path::new("downloads"));
        assert_eq!(config.format_selector, "best[height<=720]");
        assert_eq!(config.postprocessor, None);
        assert_eq!(
            config.to_args(),
            vec!["-f", "best[height<=720]", "--no-playlist", "-o", "downloads/%(title)s.%(ext)s"]
        );
    }

    #[test]
    fn every_video_target_maps_to_its_ceiling() {
        let cases = [
            (Format::Q360, "best[height<=360]"),
            (Format::Q480, "best[height<=480]"),
            (Format::Q720, "best[height<=720]"),
            (Format::Q1080, "best[height<=1080]"),
        ];
        for (format, expected) in cases {
            let config = EngineConfig::for_request(format, Path::new("downloads"));
            assert_eq!(config.format_selector, expected);
        }
    }

    #[test]
    fn output_template_follows_the_chosen_directory() {
        let config = EngineConfig::for_request(Format::Q360, Path::new("/tmp/media"));
        assert_eq!(config.output_template, "/tmp/media/%(title)s.%(ext)s");
    }

    #[test]
    fn stderr_message_prefers_error_lines() {
        let raw = "WARNING: some noise\nERROR: Unsupported URL: https://x\nmore noise";
        assert_eq!(stderr_message(raw).unwrap(), "ERROR: Unsupported URL: https://x");
    }

    #[test]
    fn stderr_message_passes_through_unprefixed_text() {
        assert_eq!(stderr_message("connection reset").unwrap(), "connection reset");
        assert_eq!(stderr_message("   \n"), None);
    }
}
