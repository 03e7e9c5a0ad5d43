use std::path::{Path, PathBuf};

/// Container/codec extensions that make a file a transcription candidate.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mp3", "wav", "m4a", "opus",
];

/// Subtitle sidecar extension.
pub const SRT_EXTENSION: &str = "srt";

/// Plain transcript sidecar extension.
pub const TXT_EXTENSION: &str = "txt";

/// Case-insensitive membership in [`MEDIA_EXTENSIONS`].
pub fn is_media_extension(ext: &str) -> bool {
    MEDIA_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext))
}

/// File name without its last extension; the identity key of an item.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Path of the sibling sharing `media`'s base name with extension `ext`.
pub fn sidecar_path(media: &Path, ext: &str) -> PathBuf {
    media.with_extension(ext)
}

/// Which sidecar files exist beside a media file. Only existence is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sidecars {
    pub srt: bool,
    pub txt: bool,
}

impl Sidecars {
    pub fn probe(media: &Path) -> Self {
        Self {
            srt: sidecar_path(media, SRT_EXTENSION).is_file(),
            txt: sidecar_path(media, TXT_EXTENSION).is_file(),
        }
    }

    /// Both subtitle and transcript are present.
    pub fn complete(&self) -> bool {
        self.srt && self.txt
    }
}

/// One discovered candidate. Built fresh on every walk, never persisted.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Full path of the media file
    pub path: PathBuf,
    /// Directory the file was found in
    pub dir: PathBuf,
    /// File name without extension
    pub base_name: String,
    /// Matched media extension, as found on disk
    pub extension: String,
    pub sidecars: Sidecars,
    /// From the audio oracle, or assumed true when the check is bypassed
    pub has_audio: bool,
    /// Fixed at discovery: missing either sidecar
    pub needs_transcription: bool,
    /// `dir` is the staging directory itself
    pub located_in_queue: bool,
}

impl MediaItem {
    pub fn new(
        path: PathBuf,
        base_name: String,
        extension: String,
        sidecars: Sidecars,
        has_audio: bool,
        located_in_queue: bool,
    ) -> Self {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            path,
            dir,
            base_name,
            extension,
            sidecars,
            has_audio,
            needs_transcription: !sidecars.complete(),
            located_in_queue,
        }
    }
}
