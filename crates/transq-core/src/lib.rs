pub mod cancel;
pub mod classify;
pub mod error;
pub mod media;
pub mod mover;
pub mod probe;
pub mod records;
pub mod router;
pub mod scan;
pub mod transcribe;
pub mod transcript;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::media::MediaItem;
use crate::probe::AudioOracle;
use crate::router::{Decision, Router};

// Re-export the types most callers need
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use probe::FfprobeOracle;
pub use records::{RecordStore, RECORDS_FILENAME};
pub use router::{Mode, QUARANTINE_DIRNAME, STAGING_DIRNAME};

fn default_ffprobe() -> PathBuf {
    PathBuf::from(probe::DEFAULT_FFPROBE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Directory tree to scan
    pub root: PathBuf,
    /// Staging directory (default: `<root>/TRANSCRIBE`)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// Records file (default: `<root>/records.json`)
    #[serde(default)]
    pub records_file: Option<PathBuf>,
    #[serde(default)]
    pub mode: Mode,
    /// Perform moves; false is a dry run that only reports
    #[serde(default)]
    pub execute: bool,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

impl ProcessOptions {
    /// Dry run in full mode over `root` with default locations.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging_dir: None,
            records_file: None,
            mode: Mode::default(),
            execute: false,
            ffprobe: default_ffprobe(),
        }
    }

    pub fn staging_dir(&self, root: &Path) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| root.join(STAGING_DIRNAME))
    }

    pub fn records_file(&self, root: &Path) -> PathBuf {
        self.records_file
            .clone()
            .unwrap_or_else(|| root.join(RECORDS_FILENAME))
    }
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Cancellation token wired to the interrupt handler.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Kind of move a reported file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Stage,
    Return,
    Quarantine,
}

/// One user-visible line of output. Emitted in dry runs and real runs alike,
/// always before the corresponding move is performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Move {
        action: Action,
        from: PathBuf,
        to: PathBuf,
    },
    /// Destination already has a file of that name; the file was left alone
    Collision {
        action: Action,
        from: PathBuf,
        to: PathBuf,
    },
    /// Audit finding: a staged item whose origin is unknown
    MissingRecord { path: PathBuf },
    /// No audio track; excluded for this run
    Discard { path: PathBuf },
}

/// Type alias for the event callback
pub type EventCallback<'a> = dyn Fn(&Event) + 'a;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Media files found by the walk
    pub candidates: u64,
    pub staged: u64,
    pub returned: u64,
    pub quarantined: u64,
    pub discarded: u64,
    /// Audit findings
    pub missing_records: u64,
    /// Files moved (or that would be moved in a dry run)
    pub files_moved: u64,
    pub collisions: u64,
    /// False for dry runs and audits
    pub executed: bool,
}

/// Run one pass with the ffprobe-backed audio oracle and no cancellation.
pub fn process(options: &ProcessOptions, on_event: &EventCallback<'_>) -> Result<ProcessResult> {
    let oracle = FfprobeOracle::new(&options.ffprobe);
    process_with_control(options, &ProcessControl::default(), &oracle, on_event)
}

/// Run one pass: walk, classify, route, and move each candidate.
///
/// The records file is written through on every new record; on cancellation
/// or a failed probe it is flushed once more before the error is returned.
pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
    oracle: &dyn AudioOracle,
    on_event: &EventCallback<'_>,
) -> Result<ProcessResult> {
    let root = fs::canonicalize(&options.root)?;
    let staging_dir = options.staging_dir(&root);
    fs::create_dir_all(&staging_dir)?;
    let staging_dir = fs::canonicalize(&staging_dir)?;

    let mut records = RecordStore::open(options.records_file(&root))?;
    let execute = options.execute && options.mode.moves_files();

    let classifier = Classifier::new(&staging_dir, !options.mode.bypasses_audio_check());
    let router = Router::new(&root, &staging_dir, options.mode);

    let mut candidates = scan::collect_candidates(&root);
    if !staging_dir.starts_with(&root) {
        candidates.extend(scan::collect_queue(&staging_dir));
    }
    let mut result = ProcessResult {
        candidates: candidates.len() as u64,
        executed: execute,
        ..ProcessResult::default()
    };

    // Groups move as a unit, so later candidates may already have been handled
    let mut handled: HashSet<PathBuf> = HashSet::new();

    for path in candidates {
        if handled.contains(&path) {
            log::debug!("{} already moved with its group", path.display());
            continue;
        }
        if control.is_cancelled() {
            records.flush()?;
            return Err(Error::Cancelled);
        }

        let item = match classifier.classify(&path, oracle) {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            // An interrupt also reaches the probe subprocess
            Err(_) if control.is_cancelled() => {
                records.flush()?;
                return Err(Error::Cancelled);
            }
            Err(e) => {
                records.flush()?;
                return Err(e);
            }
        };

        let decision = router.decide(&item, &records);
        log::debug!("{}: {:?}", item.path.display(), decision);

        match decision {
            Decision::NoAction(_) => {}
            Decision::Discard => {
                result.discarded += 1;
                on_event(&Event::Discard { path: item.path });
            }
            Decision::Quarantine { .. } if !options.mode.moves_files() => {
                result.missing_records += 1;
                on_event(&Event::MissingRecord { path: item.path });
            }
            Decision::Quarantine { dest } => {
                result.quarantined += 1;
                apply(&item, &dest, Action::Quarantine, execute, on_event, &mut result, &mut handled)?;
            }
            Decision::Stage { origin, dest } => {
                if !item.path.exists() {
                    log::warn!("{} vanished before it could be staged", item.path.display());
                    continue;
                }
                if execute {
                    records.put(&item.base_name, &origin)?;
                }
                result.staged += 1;
                apply(&item, &dest, Action::Stage, execute, on_event, &mut result, &mut handled)?;
            }
            Decision::Return { dest } => {
                result.returned += 1;
                apply(&item, &dest, Action::Return, execute, on_event, &mut result, &mut handled)?;
            }
        }
    }

    if execute {
        records.flush()?;
    }
    Ok(result)
}

fn apply(
    item: &MediaItem,
    dest: &Path,
    action: Action,
    execute: bool,
    on_event: &EventCallback<'_>,
    result: &mut ProcessResult,
    handled: &mut HashSet<PathBuf>,
) -> Result<()> {
    handled.extend(mover::sibling_group(&item.dir, &item.base_name)?);
    let summary = mover::move_group(item, dest, action, execute, on_event)?;
    result.files_moved += summary.moved;
    result.collisions += summary.collisions;
    Ok(())
}
