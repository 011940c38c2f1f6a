//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use grabq_media::DEFAULT_YTDLP_BIN;

/// Default directory for downloaded files.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// yt-dlp binary name or path
    pub ytdlp_bin: PathBuf,
    /// Directory outputs are written to
    pub download_dir: PathBuf,
    /// ffmpeg binary or directory, when not on PATH
    pub ffmpeg_location: Option<PathBuf>,
    /// How long shutdown waits for the worker to drain
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ytdlp_bin: PathBuf::from(DEFAULT_YTDLP_BIN),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            ffmpeg_location: None,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ytdlp_bin: std::env::var("YTDLP_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_YTDLP_BIN)),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            ffmpeg_location: std::env::var("FFMPEG_LOCATION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
