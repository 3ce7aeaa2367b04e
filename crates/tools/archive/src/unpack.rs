//! Unpacking `.tar.gz` archives into an install directory.

use flate2::read::GzDecoder;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

use crate::{Error, Result};

/// Unpack a gzip tarball so that its contents end up directly in `dest`.
///
/// A single top-level directory in the archive is stripped. Whatever was
/// at `dest` before is replaced. Files in `dest/bin` are made executable.
pub fn unpack_tarball(data: &[u8], dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::ExtractionFailed(format!("no parent for {}", dest.display())))?;
    std::fs::create_dir_all(parent)?;

    // Unpack beside the destination so the final move is a same-filesystem rename.
    let staging = tempfile::Builder::new()
        .prefix(".nodepack-unpack-")
        .tempdir_in(parent)?;

    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    archive
        .unpack(staging.path())
        .map_err(|e| Error::ExtractionFailed(e.to_string()))?;

    let root = single_top_level_dir(staging.path())?;
    debug!(root = %root.display(), dest = %dest.display(), "Moving unpacked archive into place");

    if dest.exists() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::rename(&root, dest)?;
    mark_bin_executable(dest)?;
    Ok(())
}

/// The archive's lone top-level directory, or a directory holding all its entries.
fn single_top_level_dir(staging: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(staging)?.collect::<std::io::Result<Vec<_>>>()?;
    let lone_dir = match entries.as_slice() {
        [] => return Err(Error::ExtractionFailed("archive is empty".to_string())),
        [only] if only.file_type()?.is_dir() => Some(only.path()),
        _ => None,
    };
    if let Some(dir) = lone_dir {
        return Ok(dir);
    }

    // Several entries: keep them together under a fresh directory.
    let holder = staging.join(".root");
    std::fs::create_dir(&holder)?;
    for entry in entries {
        std::fs::rename(entry.path(), holder.join(entry.file_name()))?;
    }
    Ok(holder)
}

#[cfg(unix)]
fn mark_bin_executable(dest: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bin = dest.join("bin");
    let Ok(entries) = std::fs::read_dir(&bin) else {
        return Ok(());
    };
    for entry in entries {
        let entry = entry?;
        let meta = std::fs::symlink_metadata(entry.path())?;
        if meta.is_file() {
            let mut perms = meta.permissions();
            perms.set_mode(perms.mode() | 0o755);
            std::fs::set_permissions(entry.path(), perms)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn mark_bin_executable(_dest: &Path) -> Result<()> {
    Ok(())
}
