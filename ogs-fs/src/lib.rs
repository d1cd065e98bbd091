//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! Dataset readers, partition writers and the CLI all go through these
//! helpers so path handling stays UTF-8 and capability scoped.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create (or truncate) a file, creating any missing parent directories.
pub fn create_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, file_name) = open_dir_and_file(path)?;
    dir.create(file_name)
}

/// Resolve the ambient parent directory of `path` and return it with the file name.
fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} should include a file name")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Return whether an existing path is a regular file.
///
/// Missing paths surface as [`io::ErrorKind::NotFound`] so callers can tell
/// them apart from directories.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Find every regular file called `file_name` below `root`.
///
/// Returned paths are relative to `root`, use `/` separators and are sorted,
/// so callers can use them directly as stable partition keys.
pub fn find_files_named(root: &Utf8Path, file_name: &str) -> io::Result<Vec<Utf8PathBuf>> {
    let dir = fs_utf8::Dir::open_ambient_dir(root, ambient_authority())?;
    let mut found = Vec::new();
    collect_files_named(&dir, Utf8Path::new(""), file_name, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_files_named(
    dir: &fs_utf8::Dir,
    prefix: &Utf8Path,
    file_name: &str,
    found: &mut Vec<Utf8PathBuf>,
) -> io::Result<()> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name()?;
        let kind = entry.file_type()?;
        let relative = if prefix.as_str().is_empty() {
            Utf8PathBuf::from(&name)
        } else {
            Utf8PathBuf::from(format!("{prefix}/{name}"))
        };
        if kind.is_dir() {
            let child = entry.open_dir()?;
            collect_files_named(&child, &relative, file_name, found)?;
        } else if kind.is_file() && name == file_name {
            found.push(relative);
        }
    }
    Ok(())
}

/// Split a directory path into an ambient base directory and a relative suffix.
///
/// `cap-std` refuses absolute paths on capability handles, so absolute paths
/// are opened at their root (or Windows prefix) and the remainder is returned
/// for relative traversal.
fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}
