use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::{self, MediaItem, Sidecars};
use crate::probe::AudioOracle;

/// Turns a discovered path into a [`MediaItem`], or `None` when the path
/// should not enter the pipeline at all.
#[derive(Debug, Clone)]
pub struct Classifier {
    staging_dir: PathBuf,
    check_audio: bool,
}

impl Classifier {
    /// `check_audio = false` skips the oracle and assumes every item has audio.
    pub fn new(staging_dir: impl Into<PathBuf>, check_audio: bool) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            check_audio,
        }
    }

    pub fn classify(&self, path: &Path, oracle: &dyn AudioOracle) -> Result<Option<MediaItem>> {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(None);
        };
        if !media::is_media_extension(extension) {
            return Ok(None);
        }
        let Some(base_name) = media::base_name(path) else {
            log::warn!("skipping non UTF-8 file name: {}", path.display());
            return Ok(None);
        };

        let located_in_queue = path.parent() == Some(self.staging_dir.as_path());
        let sidecars = Sidecars::probe(path);

        // Finished outside the queue: nothing to do, and no probe wanted
        if !located_in_queue && sidecars.complete() {
            return Ok(None);
        }

        let has_audio = if !self.check_audio {
            true
        } else if !path.exists() {
            log::debug!("{} vanished before probing", path.display());
            false
        } else {
            oracle.has_audio(path)?
        };

        Ok(Some(MediaItem::new(
            path.to_path_buf(),
            base_name.to_string(),
            extension.to_string(),
            sidecars,
            has_audio,
            located_in_queue,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_not_media() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), true);
        let oracle = |_: &Path| -> Result<bool> { panic!("oracle must not run") };

        let notes = root.path().join("a/notes.txt");
        touch(&notes);
        assert!(classifier.classify(&notes, &oracle).unwrap().is_none());
        assert!(classifier
            .classify(&root.path().join("a/README"), &oracle)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_completed_outside_queue_skips_oracle() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), true);
        let calls = Cell::new(0);
        let oracle = |_: &Path| -> Result<bool> {
            calls.set(calls.get() + 1);
            Ok(true)
        };

        let done = root.path().join("videos/b/done.mp4");
        touch(&done);
        touch(&root.path().join("videos/b/done.srt"));
        touch(&root.path().join("videos/b/done.txt"));

        assert!(classifier.classify(&done, &oracle).unwrap().is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_completed_inside_queue_is_classified() {
        let root = tempdir().unwrap();
        let staging = root.path().join("TRANSCRIBE");
        let classifier = Classifier::new(&staging, true);
        let oracle = |_: &Path| -> Result<bool> { Ok(true) };

        let talk = staging.join("talk.MP4");
        touch(&talk);
        touch(&staging.join("talk.srt"));
        touch(&staging.join("talk.txt"));

        let item = classifier.classify(&talk, &oracle).unwrap().unwrap();
        assert!(item.located_in_queue);
        assert!(!item.needs_transcription);
        assert_eq!(item.extension, "MP4");
        assert_eq!(item.base_name, "talk");
    }

    #[test]
    fn test_oracle_result_is_used() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), true);
        let oracle = |_: &Path| -> Result<bool> { Ok(false) };

        let silent = root.path().join("videos/c/silent.mp4");
        touch(&silent);
        let item = classifier.classify(&silent, &oracle).unwrap().unwrap();
        assert!(!item.has_audio);
        assert!(!item.located_in_queue);
        assert!(item.needs_transcription);
    }

    #[test]
    fn test_bypass_assumes_audio() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), false);
        let oracle = |_: &Path| -> Result<bool> { panic!("oracle must not run") };

        let talk = root.path().join("videos/a/talk.mkv");
        touch(&talk);
        assert!(classifier.classify(&talk, &oracle).unwrap().unwrap().has_audio);
    }

    #[test]
    fn test_vanished_file_has_no_audio() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), true);
        let oracle = |_: &Path| -> Result<bool> { panic!("oracle must not run") };

        let gone = root.path().join("videos/a/gone.mp4");
        let item = classifier.classify(&gone, &oracle).unwrap().unwrap();
        assert!(!item.has_audio);
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let root = tempdir().unwrap();
        let classifier = Classifier::new(root.path().join("TRANSCRIBE"), true);
        let oracle = |p: &Path| -> Result<bool> {
            Err(Error::OracleFailure {
                path: p.to_path_buf(),
                reason: "boom".into(),
            })
        };

        let talk = root.path().join("videos/a/talk.mp4");
        touch(&talk);
        assert!(matches!(
            classifier.classify(&talk, &oracle),
            Err(Error::OracleFailure { .. })
        ));
    }
}
