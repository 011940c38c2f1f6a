//! Job dispatch: task mode and options to an engine configuration.
//!
//! Pure mapping, identical quality policy for both modes:
//!
//! | choice      | selector                                   | post-processing          |
//! |-------------|--------------------------------------------|--------------------------|
//! | `audio`     | `bestaudio/best`                           | extract to audio format  |
//! | `best`      | `bestvideo+bestaudio/best`                 | merge to mp4             |
//! | height `N`  | `bestvideo[height<=N]+bestaudio/best`      | merge to mp4             |
//! | other       | `bestvideo+bestaudio/best`                 | merge to mp4             |

use std::path::{Path, PathBuf};

use grabq_models::{DownloadMode, FormatChoice, JobOptions};

use crate::command::{EngineConfig, FfmpegArgs};

/// Selector for audio-only jobs.
pub const AUDIO_SELECTOR: &str = "bestaudio/best";

/// Selector for best video plus best audio.
pub const BEST_SELECTOR: &str = "bestvideo+bestaudio/best";

/// Container for merged video jobs.
pub const MERGE_CONTAINER: &str = "mp4";

/// Audio quality passed to the extractor.
pub const AUDIO_QUALITY: &str = "192K";

/// Output name for single items.
pub const SINGLE_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Output name for collection items, prefixed with their position.
pub const COLLECTION_TEMPLATE: &str = "%(playlist_index)03d - %(title)s [%(id)s].%(ext)s";

/// Where and how the engine writes its output.
#[derive(Debug, Clone, Default)]
pub struct DispatchTarget {
    pub download_dir: PathBuf,
    pub ffmpeg_location: Option<PathBuf>,
}

impl DispatchTarget {
    pub fn new(download_dir: impl AsRef<Path>) -> Self {
        Self {
            download_dir: download_dir.as_ref().to_path_buf(),
            ffmpeg_location: None,
        }
    }
}

/// Format selector for a choice.
pub fn format_selector(choice: &FormatChoice) -> String {
    match choice {
        FormatChoice::Audio => AUDIO_SELECTOR.to_string(),
        FormatChoice::MaxHeight(height) => format!("bestvideo[height<={}]+bestaudio/best", height),
        FormatChoice::Best | FormatChoice::Unrecognized(_) => BEST_SELECTOR.to_string(),
    }
}

/// Transcode to H.264/AAC with fixed quality.
pub fn h264_compat_args() -> FfmpegArgs {
    FfmpegArgs::new()
        .video_codec("libx264")
        .preset("fast")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("192k")
}

/// Build the engine configuration for one task.
pub fn build_engine_config(
    url: &str,
    mode: DownloadMode,
    options: &JobOptions,
    target: &DispatchTarget,
) -> EngineConfig {
    let template = match mode {
        DownloadMode::Single => SINGLE_TEMPLATE,
        DownloadMode::Collection => COLLECTION_TEMPLATE,
    };

    let mut config = EngineConfig::new(
        url,
        format_selector(&options.choice),
        target.download_dir.join(template),
    )
    .playlist(mode.is_collection());

    if options.choice.is_audio() {
        config = config.extract_audio(&options.audio_format, AUDIO_QUALITY);
    } else {
        config = config.merge_output_format(MERGE_CONTAINER);
        if options.force_h264 {
            config = config.merger_args(h264_compat_args());
        }
    }

    if let Some(cookies) = &options.cookie_file {
        config = config.cookies(cookies);
    }

    if let Some(location) = &target.ffmpeg_location {
        config = config.ffmpeg_location(location);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(choice: &str, force_h264: bool) -> JobOptions {
        JobOptions {
            choice: FormatChoice::parse(choice),
            force_h264,
            ..JobOptions::default()
        }
    }

    fn target() -> DispatchTarget {
        DispatchTarget::new("/srv/downloads")
    }

    #[test]
    fn test_single_best() {
        let config = build_engine_config("http://x/1", DownloadMode::Single, &options("best", false), &target());

        assert_eq!(config.format(), BEST_SELECTOR);
        assert!(!config.is_playlist());
        assert_eq!(config.merge_format(), Some("mp4"));
        assert_eq!(
            config.output_template(),
            Path::new("/srv/downloads/%(title)s [%(id)s].%(ext)s")
        );
    }

    #[test]
    fn test_collection_max_height() {
        let config = build_engine_config(
            "http://x/playlist",
            DownloadMode::Collection,
            &options("720", false),
            &target(),
        );

        assert_eq!(config.format(), "bestvideo[height<=720]+bestaudio/best");
        assert!(config.is_playlist());
        assert!(config
            .output_template()
            .ends_with("%(playlist_index)03d - %(title)s [%(id)s].%(ext)s"));
        assert!(config.build_args().contains(&"--yes-playlist".to_string()));
    }

    #[test]
    fn test_collection_stops_at_first_failed_item() {
        let config = build_engine_config(
            "http://x/playlist",
            DownloadMode::Collection,
            &options("720", false),
            &target(),
        );

        let args = config.build_args();
        assert!(args.contains(&"--abort-on-error".to_string()));
        assert!(!args.contains(&"--no-abort-on-error".to_string()));
        assert!(!args.contains(&"--ignore-errors".to_string()));
    }

    #[test]
    fn test_audio_ignores_force_h264() {
        let mut opts = options("audio", true);
        opts.audio_format = "m4a".into();
        let config = build_engine_config("http://x/1", DownloadMode::Single, &opts, &target());

        assert_eq!(config.format(), AUDIO_SELECTOR);
        let audio = config.audio_extraction().unwrap();
        assert_eq!(audio.codec, "m4a");
        assert_eq!(audio.quality, "192K");
        assert_eq!(config.merge_format(), None);
        assert!(config.merger_ffmpeg_args().is_empty());
    }

    #[test]
    fn test_unparsed_choice_falls_back_to_best() {
        let config = build_engine_config("http://x/1", DownloadMode::Single, &options("hd", false), &target());
        assert_eq!(config.format(), BEST_SELECTOR);
        assert_eq!(config.merge_format(), Some("mp4"));
    }

    #[test]
    fn test_force_h264_on_video() {
        let config = build_engine_config("http://x/1", DownloadMode::Single, &options("1080", true), &target());
        assert_eq!(config.merger_ffmpeg_args(), &h264_compat_args());
    }

    #[test]
    fn test_cookie_file_and_ffmpeg_location() {
        let mut opts = options("best", false);
        opts.cookie_file = Some(PathBuf::from("/srv/downloads/cookies_t1.txt"));
        let mut target = target();
        target.ffmpeg_location = Some(PathBuf::from("/opt/ffmpeg/bin"));

        let config = build_engine_config("http://x/1", DownloadMode::Single, &opts, &target);
        let args = config.build_args();

        assert_eq!(config.cookie_file(), Some(Path::new("/srv/downloads/cookies_t1.txt")));
        assert!(args.contains(&"--ffmpeg-location".to_string()));
        assert!(args.contains(&"/opt/ffmpeg/bin".to_string()));
    }
}
