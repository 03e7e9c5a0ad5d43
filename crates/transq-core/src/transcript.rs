use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::{sidecar_path, SRT_EXTENSION, TXT_EXTENSION};

/// Gap (seconds) between segments that starts a new transcript paragraph.
pub const DEFAULT_PAUSE_THRESHOLD: f64 = 2.0;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.!?;:])").unwrap());

/// One timestamped stretch of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start, seconds from the beginning of the media
    pub start: f64,
    /// End, seconds from the beginning of the media
    pub end: f64,
    pub text: String,
}

/// `HH:MM:SS,mmm`, as used by SRT cues.
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let whole = total_millis / 1000;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Trim, collapse whitespace runs and drop spaces before punctuation.
pub fn normalize_text(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    SPACE_BEFORE_PUNCT_RE.replace_all(&collapsed, "$1").into_owned()
}

pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            normalize_text(&segment.text)
        );
    }
    out
}

/// Plain transcript: segments joined into paragraphs, broken wherever the
/// silence before the next segment exceeds `pause_threshold` seconds.
pub fn render_txt(segments: &[Segment], pause_threshold: f64) -> String {
    let mut out = String::new();
    let mut paragraph: Vec<String> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let text = normalize_text(&segment.text);
        if !text.is_empty() {
            paragraph.push(text);
        }

        let pause_follows = segments
            .get(i + 1)
            .is_some_and(|next| next.start - segment.end > pause_threshold);
        if pause_follows && !paragraph.is_empty() {
            out.push_str(&paragraph.join(" "));
            out.push_str("\n\n");
            paragraph.clear();
        }
    }

    if !paragraph.is_empty() {
        out.push_str(&paragraph.join(" "));
        out.push('\n');
    }
    out
}

/// Write `<stem>.txt` and `<stem>.srt` beside `media`.
pub fn write_sidecars(media: &Path, segments: &[Segment], pause_threshold: f64) -> Result<()> {
    fs::write(
        sidecar_path(media, TXT_EXTENSION),
        render_txt(segments, pause_threshold),
    )?;
    fs::write(sidecar_path(media, SRT_EXTENSION), render_srt(segments))?;
    Ok(())
}
