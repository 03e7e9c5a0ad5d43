use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::media::MediaItem;
use crate::records::RecordStore;

/// Default staging directory name, created under the scan root.
pub const STAGING_DIRNAME: &str = "TRANSCRIBE";

/// Sub-directory of the staging directory holding items with no known origin.
pub const QUARANTINE_DIRNAME: &str = "find_original_dir";

/// Operating mode for one run. Exactly one is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Stage new work and return finished work
    #[default]
    Full,
    /// Full pass without probing for audio tracks
    Fast,
    /// Report staged items lacking a record; never move anything
    AuditOnly,
    /// Only stage new work; leave staged items alone
    ImportOnly,
    /// Only process already staged items; never stage new work
    #[value(alias = "skip-import")]
    #[serde(alias = "skip-import")]
    ReturnOnly,
    /// Full pass that also evicts staged items without audio
    Cleanup,
}

impl Mode {
    pub fn bypasses_audio_check(self) -> bool {
        matches!(self, Mode::Fast | Mode::AuditOnly)
    }

    /// False only for audit runs, which never move or record regardless of
    /// the execute switch.
    pub fn moves_files(self) -> bool {
        self != Mode::AuditOnly
    }

    fn stages_new_work(self) -> bool {
        !matches!(self, Mode::ReturnOnly | Mode::AuditOnly)
    }
}

/// Why an item was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    /// In the queue, sidecars still missing
    AwaitingTranscription,
    /// In the queue, but this run only imports
    ImportOnly,
    /// In the queue with a valid record; audit has nothing to report
    RecordOnFile,
    /// Inside some staging directory other than ours (or a sub-directory of ours)
    NestedStaging,
    /// Outside the queue, but this run never stages
    StagingDisabled,
    /// Outside the queue and nothing left to transcribe
    Finished,
}

/// Action chosen for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No audio track: excluded from routing for this run
    Discard,
    /// Record `origin`, then move the sibling group into `dest`
    Stage { origin: PathBuf, dest: PathBuf },
    /// Move the sibling group back to its recorded origin
    Return { dest: PathBuf },
    /// Staged with no record: set aside for manual triage
    Quarantine { dest: PathBuf },
    NoAction(Hold),
}

/// The per-item decision table.
#[derive(Debug, Clone)]
pub struct Router {
    root: PathBuf,
    staging_dir: PathBuf,
    mode: Mode,
}

impl Router {
    pub fn new(root: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            root: root.into(),
            staging_dir: staging_dir.into(),
            mode,
        }
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.staging_dir.join(QUARANTINE_DIRNAME)
    }

    pub fn decide(&self, item: &MediaItem, records: &RecordStore) -> Decision {
        // Eviction runs ahead of the blanket discard, otherwise it could never fire
        if self.mode == Mode::Cleanup && item.located_in_queue && !item.has_audio {
            return self.return_or_quarantine(item, records);
        }

        if !item.has_audio {
            return Decision::Discard;
        }

        if item.located_in_queue {
            if !records.has(&item.base_name) {
                return Decision::Quarantine {
                    dest: self.quarantine_dir(),
                };
            }
            return match self.mode {
                Mode::AuditOnly => Decision::NoAction(Hold::RecordOnFile),
                Mode::ImportOnly => Decision::NoAction(Hold::ImportOnly),
                _ if !item.needs_transcription => self.return_or_quarantine(item, records),
                _ => Decision::NoAction(Hold::AwaitingTranscription),
            };
        }

        if self.is_nested_in_staging(&item.path) {
            return Decision::NoAction(Hold::NestedStaging);
        }

        if !self.mode.stages_new_work() {
            return Decision::NoAction(Hold::StagingDisabled);
        }

        if item.needs_transcription {
            return Decision::Stage {
                origin: item.dir.clone(),
                dest: self.staging_dir.clone(),
            };
        }

        Decision::NoAction(Hold::Finished)
    }

    fn return_or_quarantine(&self, item: &MediaItem, records: &RecordStore) -> Decision {
        match records.get(&item.base_name) {
            // Older records hold origins relative to the scan root
            Ok(origin) => Decision::Return {
                dest: self.root.join(origin),
            },
            Err(e) => {
                log::debug!("{}: {}", item.path.display(), e);
                Decision::Quarantine {
                    dest: self.quarantine_dir(),
                }
            }
        }
    }

    /// Anywhere below our staging directory, or below any directory under the
    /// scan root that carries the staging directory's name.
    fn is_nested_in_staging(&self, path: &Path) -> bool {
        if path.starts_with(&self.staging_dir) {
            return true;
        }
        let Some(name) = self.staging_dir.file_name() else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .parent()
            .is_some_and(|dir| dir.components().any(|c| c.as_os_str() == name))
    }
}
