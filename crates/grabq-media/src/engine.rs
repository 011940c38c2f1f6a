//! Media engine: runs yt-dlp and streams its events.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::EngineConfig;
use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_line, EngineEvent, EventCallback};

/// Default yt-dlp binary name.
pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";

/// External fetch/transcode engine.
///
/// Implementations call `on_event` zero or more times while the fetch runs
/// and return an error on unrecoverable failure.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn fetch(&self, config: &EngineConfig, on_event: EventCallback) -> MediaResult<()>;
}

/// [`MediaEngine`] backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: PathBuf,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new(DEFAULT_YTDLP_BIN)
    }
}

impl YtDlpEngine {
    /// Create an engine using the given binary name or path.
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Resolve the binary on PATH.
    pub fn resolve(&self) -> MediaResult<PathBuf> {
        which::which(&self.binary).map_err(|_| MediaError::YtDlpNotFound)
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn fetch(&self, config: &EngineConfig, on_event: EventCallback) -> MediaResult<()> {
        let binary = self.resolve()?;
        let args = config.build_args();

        info!(url = %config.url(), format = %config.format(), playlist = config.is_playlist(), "Starting yt-dlp");
        debug!("Running yt-dlp: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("yt-dlp stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("yt-dlp stderr not captured"))?;

        let stderr_handle = tokio::spawn(pump_lines(stderr, on_event.clone()));
        let stdout_diag = pump_lines(stdout, on_event).await;

        let status = child.wait().await?;
        let stderr_diag = stderr_handle.await.unwrap_or_else(|e| {
            warn!("yt-dlp stderr reader failed: {}", e);
            Diagnostics::default()
        });

        if status.success() {
            info!(url = %config.url(), "yt-dlp finished");
            return Ok(());
        }

        let message = stderr_diag
            .last_error
            .or(stdout_diag.last_error)
            .or(stderr_diag.last_line)
            .unwrap_or_else(|| match status.code() {
                Some(code) => format!("yt-dlp exited with status {}", code),
                None => "yt-dlp terminated by signal".to_string(),
            });

        warn!(url = %config.url(), exit_code = ?status.code(), "yt-dlp failed: {}", message);
        Err(MediaError::download_failed(message, status.code()))
    }
}

/// What a stream said besides events.
#[derive(Debug, Default)]
struct Diagnostics {
    last_error: Option<String>,
    last_line: Option<String>,
}

async fn pump_lines<R>(stream: R, on_event: EventCallback) -> Diagnostics
where
    R: AsyncRead + Unpin,
{
    let mut diagnostics = Diagnostics::default();
    let mut lines = BufReader::new(stream).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read yt-dlp output: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Some(event) => {
                if let EngineEvent::Error { message } = &event {
                    diagnostics.last_error = Some(message.clone());
                }
                on_event(event);
            }
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    debug!("yt-dlp: {}", trimmed);
                    diagnostics.last_line = Some(trimmed.to_string());
                }
            }
        }
    }

    diagnostics
}

/// Check if yt-dlp is available.
pub fn check_ytdlp(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    which::which(binary.as_ref()).map_err(|_| MediaError::YtDlpNotFound)
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
