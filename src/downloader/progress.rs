//! Machine-readable yt-dlp output lines
//!
//! yt-dlp is told to print two kinds of tagged lines: one per progress tick
//! (`--progress-template`) and one per finished file (`--print after_move:`).
//! Fields are space separated and yt-dlp renders missing values as `NA`.

use super::{PlaylistPosition, ProgressEvent};

pub(super) const PROGRESS_MARKER: &str = "[mediafetch:progress]";
pub(super) const FILE_MARKER: &str = "[mediafetch:file]";

/// `--progress-template` value
pub(super) fn progress_template() -> String {
    format!(
        "download:{PROGRESS_MARKER} %(progress.downloaded_bytes)s %(progress.total_bytes)s \
         %(progress.total_bytes_estimate)s %(info.playlist_index)s %(info.n_entries)s"
    )
}

/// `--print` value reporting the final path after post-processing
pub(super) fn file_template() -> String {
    format!("after_move:{FILE_MARKER} %(playlist_index)s %(n_entries)s %(filepath)s")
}

pub(super) fn parse_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_progress(rest);
    }

    if let Some(rest) = line.strip_prefix(FILE_MARKER) {
        return Some(parse_file(rest));
    }

    None
}

/// Error text yt-dlp prints on stderr, without the `ERROR:` tag
pub(super) fn error_message(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("ERROR:")
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
}

fn parse_progress(rest: &str) -> Option<ProgressEvent> {
    let mut fields = rest.split_whitespace();
    let downloaded_bytes = bytes_field(fields.next()?)?;
    let total = fields.next().and_then(bytes_field);
    let estimate = fields.next().and_then(bytes_field);
    let item = position(fields.next(), fields.next());

    Some(ProgressEvent::Downloading {
        downloaded_bytes,
        total_bytes: total.or(estimate),
        item,
    })
}

fn parse_file(rest: &str) -> ProgressEvent {
    let mut fields = rest.trim_start().splitn(3, ' ');
    let index = fields.next();
    let count = fields.next();
    let filename = fields
        .next()
        .map(str::trim)
        .filter(|path| !path.is_empty() && *path != "NA")
        .map(str::to_owned);

    ProgressEvent::Finished {
        filename,
        item: position(index, count),
    }
}

/// Byte counts arrive as integers, estimates as floats
fn bytes_field(raw: &str) -> Option<u64> {
    if raw == "NA" {
        return None;
    }
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

fn position(index: Option<&str>, count: Option<&str>) -> Option<PlaylistPosition> {
    let index = index?.parse::<u32>().ok()?;
    let count = count?.parse::<u32>().ok()?;
    (index >= 1 && count >= index).then_some(PlaylistPosition { index, count })
}
