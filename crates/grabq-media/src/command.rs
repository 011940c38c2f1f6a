//! yt-dlp invocation builder.

use std::path::{Path, PathBuf};

use crate::progress::{FINISHED_TEMPLATE, PROGRESS_TEMPLATE};

/// FFmpeg output arguments handed to yt-dlp's post-processors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FfmpegArgs {
    args: Vec<String>,
}

impl FfmpegArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.arg("-crf").arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.arg("-preset").arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }
}

/// Audio extraction post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    /// Target container/codec (mp3, m4a, opus, ...)
    pub codec: String,
    /// yt-dlp audio quality, e.g. `192K`
    pub quality: String,
}

/// Complete configuration for one engine call.
///
/// Built by the dispatcher; rendered to a yt-dlp argv by [`EngineConfig::build_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    url: String,
    format: String,
    output_template: PathBuf,
    playlist: bool,
    merge_output_format: Option<String>,
    extract_audio: Option<AudioExtraction>,
    merger_args: FfmpegArgs,
    cookies: Option<PathBuf>,
    ffmpeg_location: Option<PathBuf>,
}

impl EngineConfig {
    /// Create a configuration fetching `url` with the given format selector.
    pub fn new(url: impl Into<String>, format: impl Into<String>, output_template: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            output_template: output_template.as_ref().to_path_buf(),
            playlist: false,
            merge_output_format: None,
            extract_audio: None,
            merger_args: FfmpegArgs::default(),
            cookies: None,
            ffmpeg_location: None,
        }
    }

    /// Enable or disable playlist traversal.
    pub fn playlist(mut self, enabled: bool) -> Self {
        self.playlist = enabled;
        self
    }

    /// Container used when merging separate video and audio streams.
    pub fn merge_output_format(mut self, container: impl Into<String>) -> Self {
        self.merge_output_format = Some(container.into());
        self
    }

    /// Extract audio and transcode it.
    pub fn extract_audio(mut self, codec: impl Into<String>, quality: impl Into<String>) -> Self {
        self.extract_audio = Some(AudioExtraction {
            codec: codec.into(),
            quality: quality.into(),
        });
        self
    }

    /// FFmpeg output arguments for the merge step.
    pub fn merger_args(mut self, args: FfmpegArgs) -> Self {
        self.merger_args = args;
        self
    }

    /// Netscape cookie file.
    pub fn cookies(mut self, path: impl AsRef<Path>) -> Self {
        self.cookies = Some(path.as_ref().to_path_buf());
        self
    }

    /// Directory or binary path of ffmpeg.
    pub fn ffmpeg_location(mut self, path: impl AsRef<Path>) -> Self {
        self.ffmpeg_location = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn output_template(&self) -> &Path {
        &self.output_template
    }

    pub fn is_playlist(&self) -> bool {
        self.playlist
    }

    pub fn merge_format(&self) -> Option<&str> {
        self.merge_output_format.as_deref()
    }

    pub fn audio_extraction(&self) -> Option<&AudioExtraction> {
        self.extract_audio.as_ref()
    }

    pub fn merger_ffmpeg_args(&self) -> &FfmpegArgs {
        &self.merger_args
    }

    pub fn cookie_file(&self) -> Option<&Path> {
        self.cookies.as_deref()
    }

    /// Build the yt-dlp arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            // --quiet hides the progress bar and --print implies simulate
            "--progress".into(),
            "--no-simulate".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "--print".into(),
            FINISHED_TEMPLATE.into(),
            // the CLI default skips failed collection items and keeps going
            "--abort-on-error".into(),
        ];

        args.push(if self.playlist { "--yes-playlist" } else { "--no-playlist" }.into());

        args.push("-f".into());
        args.push(self.format.clone());

        args.push("-o".into());
        args.push(self.output_template.to_string_lossy().to_string());

        if let Some(container) = &self.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(container.clone());
        }

        if let Some(audio) = &self.extract_audio {
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(audio.codec.clone());
            args.push("--audio-quality".into());
            args.push(audio.quality.clone());
        }

        if !self.merger_args.is_empty() {
            args.push("--postprocessor-args".into());
            args.push(format!("Merger+ffmpeg_o:{}", self.merger_args.as_slice().join(" ")));
        }

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".into());
            args.push(cookies.to_string_lossy().to_string());
        }

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.to_string_lossy().to_string());
        }

        // URL after `--` so it can never be read as an option
        args.push("--".into());
        args.push(self.url.clone());

        args
    }
}
