//! yt-dlp wrapper for media fetching.
//!
//! This crate provides:
//! - Type-safe yt-dlp invocation building
//! - Job dispatch from task options to an engine configuration
//! - Progress/finished/error event parsing from yt-dlp output
//! - The `MediaEngine` seam and its yt-dlp implementation

pub mod command;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod progress;

pub use command::{AudioExtraction, EngineConfig, FfmpegArgs};
pub use dispatch::{build_engine_config, format_selector, DispatchTarget};
pub use engine::{check_ffmpeg, check_ytdlp, MediaEngine, YtDlpEngine, DEFAULT_YTDLP_BIN};
pub use error::{MediaError, MediaResult};
pub use progress::{parse_line, EngineEvent, EventCallback};
