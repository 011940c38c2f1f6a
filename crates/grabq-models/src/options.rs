//! Job options supplied at submission time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many items a job fetches from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Exactly one item; playlist traversal disabled.
    #[default]
    Single,
    /// Every item of a playlist-like source, in order.
    Collection,
}

impl DownloadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadMode::Single => "single",
            DownloadMode::Collection => "collection",
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, DownloadMode::Collection)
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown download mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for DownloadMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "single" => Ok(DownloadMode::Single),
            // "playlist" is what the web form has always sent
            "collection" | "playlist" => Ok(DownloadMode::Collection),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Requested quality/format token.
///
/// Parsing never fails: tokens that are not `audio`, `best` or an integer
/// height are kept verbatim and treated as `best` by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatChoice {
    /// Best audio-only stream, transcoded to the requested audio format.
    Audio,
    /// Best video plus best audio.
    Best,
    /// Best video no taller than the given height, plus best audio.
    MaxHeight(u32),
    /// Anything else, kept as submitted.
    Unrecognized(String),
}

impl FormatChoice {
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token {
            "audio" => FormatChoice::Audio,
            "best" | "" => FormatChoice::Best,
            _ => match token.parse::<u32>() {
                Ok(height) => FormatChoice::MaxHeight(height),
                Err(_) => FormatChoice::Unrecognized(token.to_string()),
            },
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, FormatChoice::Audio)
    }
}

impl Default for FormatChoice {
    fn default() -> Self {
        FormatChoice::Best
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatChoice::Audio => f.write_str("audio"),
            FormatChoice::Best => f.write_str("best"),
            FormatChoice::MaxHeight(h) => write!(f, "{}", h),
            FormatChoice::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl From<String> for FormatChoice {
    fn from(s: String) -> Self {
        FormatChoice::parse(&s)
    }
}

impl From<FormatChoice> for String {
    fn from(choice: FormatChoice) -> Self {
        choice.to_string()
    }
}

/// Default audio container/codec for audio extraction.
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// Quality/format selection for one job. Opaque to the queue and worker;
/// only the dispatcher interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub choice: FormatChoice,
    pub audio_format: String,
    /// Re-encode to H.264/AAC after download (video choices only).
    pub force_h264: bool,
    /// Netscape cookie file uploaded with the submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_file: Option<PathBuf>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            choice: FormatChoice::Best,
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            force_h264: false,
            cookie_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("single".parse::<DownloadMode>(), Ok(DownloadMode::Single));
        assert_eq!("".parse::<DownloadMode>(), Ok(DownloadMode::Single));
        assert_eq!("collection".parse::<DownloadMode>(), Ok(DownloadMode::Collection));
        assert_eq!("Playlist".parse::<DownloadMode>(), Ok(DownloadMode::Collection));
        assert!("channel".parse::<DownloadMode>().is_err());
    }

    #[test]
    fn test_format_choice_parsing() {
        assert_eq!(FormatChoice::parse("audio"), FormatChoice::Audio);
        assert_eq!(FormatChoice::parse("best"), FormatChoice::Best);
        assert_eq!(FormatChoice::parse("720"), FormatChoice::MaxHeight(720));
        assert_eq!(
            FormatChoice::parse("720p"),
            FormatChoice::Unrecognized("720p".to_string())
        );
    }

    #[test]
    fn test_format_choice_serializes_as_token() {
        let json = serde_json::to_string(&FormatChoice::MaxHeight(1080)).unwrap();
        assert_eq!(json, "\"1080\"");

        let back: FormatChoice = serde_json::from_str("\"audio\"").unwrap();
        assert_eq!(back, FormatChoice::Audio);
    }
}
