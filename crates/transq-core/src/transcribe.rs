//! Drives an external speech-to-text engine over staged media and writes the
//! `.srt`/`.txt` sidecars that mark an item as finished.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::media::{self, Sidecars};
use crate::probe::{self, DEFAULT_FFPROBE};
use crate::transcript::{self, Segment, DEFAULT_PAUSE_THRESHOLD};

/// Extensions the engine accepts (case-insensitive).
pub const TRANSCRIBABLE_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "m4a", "aac", "mp4", "avi", "mkv", "mov", "ogg", "opus", "wma",
];

pub const DEFAULT_MODEL: &str = "large-v3";

/// Produces timestamped segments for one media file.
pub trait Transcriber {
    fn transcribe(&self, path: &Path) -> Result<Vec<Segment>>;
}

impl<F> Transcriber for F
where
    F: Fn(&Path) -> Result<Vec<Segment>>,
{
    fn transcribe(&self, path: &Path) -> Result<Vec<Segment>> {
        self(path)
    }
}

/// Runs the `whisper` command line tool and reads back its JSON output.
#[derive(Debug, Clone)]
pub struct WhisperCommand {
    pub program: PathBuf,
    pub model: String,
    pub device: String,
}

impl Default for WhisperCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("whisper"),
            model: DEFAULT_MODEL.to_string(),
            device: "cpu".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WhisperOutput {
    segments: Vec<Segment>,
}

impl Transcriber for WhisperCommand {
    fn transcribe(&self, path: &Path) -> Result<Vec<Segment>> {
        let failure = |reason: String| Error::TranscriberFailure {
            path: path.to_path_buf(),
            reason,
        };

        let out_dir = tempfile::tempdir()?;
        let output = Command::new(&self.program)
            .arg(path)
            .args(["--model", self.model.as_str(), "--device", self.device.as_str()])
            .args(["--fp16", "False", "--verbose", "False", "--output_format", "json"])
            .arg("--output_dir")
            .arg(out_dir.path())
            .output()
            .map_err(|e| failure(format!("could not run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure(format!("exited with {}: {}", output.status, stderr.trim())));
        }

        let stem = media::base_name(path).ok_or_else(|| failure("non UTF-8 file name".into()))?;
        let json_path = out_dir.path().join(format!("{}.json", stem));
        let bytes = fs::read(&json_path)
            .map_err(|e| failure(format!("no output at {}: {}", json_path.display(), e)))?;
        let parsed: WhisperOutput = serde_json::from_slice(&bytes)
            .map_err(|e| failure(format!("unparseable output: {}", e)))?;
        Ok(parsed.segments)
    }
}

#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Program used to read media durations for the timing report
    pub ffprobe: PathBuf,
    pub pause_threshold: f64,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from(DEFAULT_FFPROBE),
            pause_threshold: DEFAULT_PAUSE_THRESHOLD,
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Missing,
    Unsupported,
    /// Both sidecars already exist
    AlreadyDone,
    Transcribed {
        segments: usize,
        /// Media length in seconds, when ffprobe could tell
        media_seconds: Option<f64>,
        elapsed: Duration,
    },
}

pub fn is_transcribable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TRANSCRIBABLE_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(ext)))
}

/// Expand inputs: directories contribute their direct files (sorted,
/// sub-directories skipped); anything else is taken as a file path.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            log::info!("looking in {} for files", input.display());
            let mut entries: Vec<PathBuf> = fs::read_dir(input)?
                .flatten()
                .map(|e| e.path())
                .filter(|p| !p.is_dir())
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Transcribe `path` unless it is missing, unsupported, or already finished.
pub fn transcribe_file(
    path: &Path,
    transcriber: &dyn Transcriber,
    options: &TranscribeOptions,
) -> Result<FileOutcome> {
    if !path.is_file() {
        return Ok(FileOutcome::Missing);
    }
    if !is_transcribable(path) {
        return Ok(FileOutcome::Unsupported);
    }
    if Sidecars::probe(path).complete() {
        return Ok(FileOutcome::AlreadyDone);
    }

    let media_seconds = match probe::media_duration(&options.ffprobe, path) {
        Ok(seconds) => Some(seconds),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    };
    log::info!("processing {}", path.display());

    let start = Instant::now();
    let segments = transcriber.transcribe(path)?;
    let elapsed = start.elapsed();

    transcript::write_sidecars(path, &segments, options.pause_threshold)?;

    Ok(FileOutcome::Transcribed {
        segments: segments.len(),
        media_seconds,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn options() -> TranscribeOptions {
        TranscribeOptions {
            ffprobe: PathBuf::from("/nonexistent/transq-ffprobe"),
            ..TranscribeOptions::default()
        }
    }

    #[test]
    fn test_collect_inputs_is_not_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join("sub/c.mp4"), b"").unwrap();
        let single = dir.path().join("sub/c.mp4");

        let files = collect_inputs(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.mp4"), dir.path().join("b.mp3"), single]
        );
    }

    #[test]
    fn test_skips() {
        let dir = tempdir().unwrap();
        let calls = Cell::new(0);
        let fake = |_: &Path| -> Result<Vec<Segment>> {
            calls.set(calls.get() + 1);
            Ok(vec![])
        };

        assert_eq!(
            transcribe_file(&dir.path().join("gone.mp4"), &fake, &options()).unwrap(),
            FileOutcome::Missing
        );

        let notes = dir.path().join("notes.pdf");
        fs::write(&notes, b"").unwrap();
        assert_eq!(
            transcribe_file(&notes, &fake, &options()).unwrap(),
            FileOutcome::Unsupported
        );

        let done = dir.path().join("done.flac");
        fs::write(&done, b"").unwrap();
        fs::write(dir.path().join("done.srt"), b"").unwrap();
        fs::write(dir.path().join("done.txt"), b"").unwrap();
        assert_eq!(
            transcribe_file(&done, &fake, &options()).unwrap(),
            FileOutcome::AlreadyDone
        );

        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_transcribe_writes_sidecars() {
        let dir = tempdir().unwrap();
        let talk = dir.path().join("talk.mp4");
        fs::write(&talk, b"").unwrap();
        let fake = |_: &Path| -> Result<Vec<Segment>> {
            Ok(vec![Segment {
                start: 0.0,
                end: 1.2,
                text: " Hello world ".into(),
            }])
        };

        match transcribe_file(&talk, &fake, &options()).unwrap() {
            FileOutcome::Transcribed {
                segments,
                media_seconds,
                ..
            } => {
                assert_eq!(segments, 1);
                assert_eq!(media_seconds, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            fs::read_to_string(dir.path().join("talk.srt")).unwrap(),
            "1\n00:00:00,000 --> 00:00:01,200\nHello world\n\n"
        );
    }

    #[test]
    fn test_transcriber_failure_propagates() {
        let dir = tempdir().unwrap();
        let talk = dir.path().join("talk.wav");
        fs::write(&talk, b"").unwrap();
        let whisper = WhisperCommand {
            program: PathBuf::from("/nonexistent/transq-whisper"),
            ..WhisperCommand::default()
        };

        assert!(matches!(
            transcribe_file(&talk, &whisper, &options()),
            Err(Error::TranscriberFailure { .. })
        ));
        assert!(!dir.path().join("talk.srt").exists());
    }

    #[test]
    fn test_whisper_output_parses() {
        let raw = r#"{"text": "hi", "segments": [{"id": 0, "seek": 0, "start": 0.0, "end": 1.5, "text": " hi", "tokens": [1, 2]}], "language": "en"}"#;
        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].end, 1.5);
    }
}
