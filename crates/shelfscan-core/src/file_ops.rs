use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, ShelfError};

/// Collect files with the given extension under `dir`, sorted by path.
pub fn collect_files(dir: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ShelfError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    walk(dir, extension, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, extension: &str, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                walk(&path, extension, true, out)?;
            }
        } else if path.is_file() && has_extension(&path, extension) {
            out.push(path);
        }
    }
    Ok(())
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Move `source` to `destination`, creating parent directories.
///
/// Falls back to copy-then-remove when a plain rename crosses filesystems.
pub fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if !source.is_file() {
        return Err(ShelfError::FileNotFound(source.display().to_string()));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(source, destination) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %source.display(), to = %destination.display(), "rename crossed devices, copying");
            fs::copy(source, destination)?;
            fs::remove_file(source)?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// `path` itself when nothing exists there, otherwise the first free
/// `name (N).ext` sibling.
pub fn vacant_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| {
            let name = match &extension {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Move `source` into `dir`, keeping its file name unless a file of that
/// name is already there. Returns the new path.
pub fn move_into_dir(source: &Path, dir: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| ShelfError::ValidationError(format!("no file name in {}", source.display())))?;
    let destination = vacant_path(&dir.join(name));
    move_file(source, &destination)?;
    Ok(destination)
}
