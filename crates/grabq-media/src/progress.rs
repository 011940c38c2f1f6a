//! yt-dlp event parsing.
//!
//! yt-dlp is asked to print two kinds of marker lines: a progress template
//! for every download tick, and the final file path after post-processing.
//! Fields are `|`-separated and the free-form path always comes last, so a
//! `|` inside a title cannot shift the other fields. Missing values print
//! as `NA`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Prefix of progress lines.
pub const PROGRESS_MARKER: &str = "[grabq:progress]";

/// Prefix of finished-file lines.
pub const FINISHED_MARKER: &str = "[grabq:finished]";

/// `--progress-template` value.
pub const PROGRESS_TEMPLATE: &str = "download:[grabq:progress] %(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s|%(info.playlist_index)s|%(info.playlist_count)s|%(progress.filename)s";

/// `--print` value; fires once per item after the final move.
pub const FINISHED_TEMPLATE: &str =
    "after_move:[grabq:finished] %(playlist_index)s|%(playlist_count)s|%(filepath)s";

const PROGRESS_FIELDS: usize = 9;
const FINISHED_FIELDS: usize = 3;

/// Event reported by the engine while a job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Transfer tick.
    Downloading {
        /// Percent complete, unrounded
        percent: Option<f64>,
        /// Bytes per second
        speed: Option<f64>,
        /// Seconds remaining
        eta: Option<u64>,
        filename: Option<String>,
        /// 1-based playlist position
        item: Option<u32>,
        /// Playlist length
        of: Option<u32>,
    },
    /// One output file is complete and in its final place.
    Finished {
        path: PathBuf,
        item: Option<u32>,
        of: Option<u32>,
    },
    /// Diagnostic from the engine.
    Error { message: String },
}

/// Callback type for engine events.
pub type EventCallback = Arc<dyn Fn(EngineEvent) + Send + Sync + 'static>;

/// Parse one output line from yt-dlp.
///
/// Returns `None` for lines that carry no event.
pub fn parse_line(line: &str) -> Option<EngineEvent> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_progress(rest.trim_start());
    }

    if let Some(rest) = line.strip_prefix(FINISHED_MARKER) {
        return parse_finished(rest.trim_start());
    }

    if let Some(rest) = line.strip_prefix("ERROR:") {
        return Some(EngineEvent::Error {
            message: rest.trim().to_string(),
        });
    }

    None
}

fn parse_progress(rest: &str) -> Option<EngineEvent> {
    let fields: Vec<&str> = rest.splitn(PROGRESS_FIELDS, '|').collect();
    if fields.len() != PROGRESS_FIELDS {
        return None;
    }

    // finished/error ticks are covered by the after_move print and stderr
    if fields[0] != "downloading" {
        return None;
    }

    let downloaded = number(fields[1]);
    let total = number(fields[2]).or_else(|| number(fields[3]));
    let percent = match (downloaded, total) {
        (Some(done), Some(total)) if total > 0.0 => Some((done / total * 100.0).min(100.0)),
        _ => None,
    };

    Some(EngineEvent::Downloading {
        percent,
        speed: number(fields[4]),
        eta: number(fields[5]).map(|eta| eta.max(0.0).round() as u64),
        filename: text(fields[8]),
        item: index(fields[6]),
        of: index(fields[7]),
    })
}

fn parse_finished(rest: &str) -> Option<EngineEvent> {
    let fields: Vec<&str> = rest.splitn(FINISHED_FIELDS, '|').collect();
    if fields.len() != FINISHED_FIELDS {
        return None;
    }

    let path = text(fields[2])?;
    Some(EngineEvent::Finished {
        path: PathBuf::from(path),
        item: index(fields[0]),
        of: index(fields[1]),
    })
}

fn is_missing(value: &str) -> bool {
    matches!(value, "" | "NA" | "None" | "null")
}

fn text(value: &str) -> Option<String> {
    let value = value.trim();
    (!is_missing(value)).then(|| value.to_string())
}

fn number(value: &str) -> Option<f64> {
    let value = value.trim();
    if is_missing(value) {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn index(value: &str) -> Option<u32> {
    number(value).filter(|v| *v >= 0.0).map(|v| v as u32)
}
