use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::media;

/// Walk `root` and collect every file with a media extension.
///
/// Files directly inside `root` are not candidates. The walk completes before
/// anything is moved, so a pass works on a snapshot of the tree.
pub fn collect_candidates(root: &Path) -> Vec<PathBuf> {
    walk_media(root, 2)
}

/// Media files anywhere in a staging directory that lies outside the scan root.
pub fn collect_queue(staging_dir: &Path) -> Vec<PathBuf> {
    walk_media(staging_dir, 1)
}

fn walk_media(root: &Path, min_depth: usize) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(min_depth)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("error walking {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_media = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(media::is_media_extension);
        if is_media {
            candidates.push(entry.into_path());
        }
    }

    log::debug!("{} candidate media files under {}", candidates.len(), root.display());
    candidates
}
