use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::error::Result;
use crate::media::{self, MediaItem};
use crate::{Action, Event};

/// Files handled by one [`move_group`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveSummary {
    /// Moved, or reported as would-move in a dry run
    pub moved: u64,
    /// Skipped because the destination already had a file of that name
    pub collisions: u64,
}

/// Every file in `dir` whose base name is exactly `base_name`, sorted.
pub fn sibling_group(dir: &Path, base_name: &str) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut group: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| media::base_name(path) == Some(base_name))
        .collect();
    group.sort();
    Ok(group)
}

/// Move `item` and all of its same-base-name siblings into `dest_dir`.
///
/// Never overwrites: an existing destination file is reported as a collision
/// and left alone while the rest of the group continues. With `execute`
/// false nothing on disk changes, but the same events are reported.
pub fn move_group(
    item: &MediaItem,
    dest_dir: &Path,
    action: Action,
    execute: bool,
    on_event: &dyn Fn(&Event),
) -> Result<MoveSummary> {
    let mut summary = MoveSummary::default();
    let siblings = sibling_group(&item.dir, &item.base_name)?;

    if execute {
        fs::create_dir_all(dest_dir)?;
    }

    for from in siblings {
        let meta = match fs::symlink_metadata(&from) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("{} vanished before it could be moved", from.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if meta.is_dir() {
            log::warn!(
                "unexpected directory sharing the base name '{}': {}",
                item.base_name,
                from.display()
            );
            continue;
        }

        let Some(name) = from.file_name() else {
            continue;
        };
        let to = dest_dir.join(name);

        if fs::symlink_metadata(&to).is_ok() {
            on_event(&Event::Collision { action, from, to });
            summary.collisions += 1;
            continue;
        }

        on_event(&Event::Move {
            action,
            from: from.clone(),
            to: to.clone(),
        });
        if execute {
            match move_file(&from, &to) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound && !from.exists() => {
                    log::warn!("{} vanished before it could be moved", from.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        summary.moved += 1;
    }

    Ok(summary)
}

/// Rename, falling back to copy + remove when the rename is refused
/// (typically across filesystems).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
        Err(e) => e,
    };
    log::debug!(
        "rename {} -> {} failed ({}), copying instead",
        from.display(),
        to.display(),
        rename_err
    );

    let meta = fs::metadata(from)?;
    fs::copy(from, to)?;
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(to, mtime).ok();
    fs::remove_file(from)
}
