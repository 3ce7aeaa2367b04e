//! Filesystem helpers for whole-directory cache operations.

use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

use nodepack_core::{Error, Result};

/// Remove a directory tree, treating absence as success.
///
/// Returns whether anything was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    let removed = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(e, Some(path.to_path_buf()), "inspect path")),
    };
    match removed {
        Ok(()) => {
            trace!(path = %path.display(), "Removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(e, Some(path.to_path_buf()), "remove path")),
    }
}

/// Copy the tree at `src` to `dest`, which must not exist yet.
///
/// Symlinks are recreated rather than followed, so `node_modules/.bin`
/// entries keep pointing into the tree.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    let mut files = 0;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf);
            Error::io(e.into(), path, "walk directory")
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::configuration(format!("path outside copy root: {e}")))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| Error::io(e, Some(target.clone()), "create directory"))?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())
                .map_err(|e| Error::io(e, Some(entry.path().to_path_buf()), "read symlink"))?;
            symlink(&link, &target)
                .map_err(|e| Error::io(e, Some(target.clone()), "create symlink"))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| Error::io(e, Some(target.clone()), "copy file"))?;
            files += 1;
        }
    }

    trace!(src = %src.display(), dest = %dest.display(), files, "Copied tree");
    Ok(files)
}

#[cfg(unix)]
fn symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}
