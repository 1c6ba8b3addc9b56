use crate::error::{CheckError, Result};
use crate::utils::slash_path;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file under a package's `files/` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesDirEntry {
    /// Basename of the file, the text ebuilds are searched for.
    pub name: String,
    /// Path relative to `files/`, `/`-separated.
    pub relative_path: String,
}

/// Lists every file under `files_dir`, recursing into subdirectories.
///
/// Symlinks are followed: a link to a file is listed under the link's own
/// name, a link to a directory is descended into, and a dangling link is
/// still listed since it is present under `files/`. Entries are sorted by
/// relative path. A missing directory yields an empty list; any other walk
/// failure, including a symlink loop, is an I/O error for the package.
pub fn enumerate(files_dir: &Path) -> Result<Vec<FilesDirEntry>> {
    match std::fs::metadata(files_dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(Vec::new()),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CheckError::io(files_dir, e)),
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(files_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if let Some(path) = dangling_link(&e) {
                    entries.push(make_entry(files_dir, &path));
                    continue;
                }
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| files_dir.to_path_buf());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                return Err(CheckError::io(path, source));
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().is_empty() {
            continue;
        }
        entries.push(make_entry(files_dir, entry.path()));
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

/// Path of a symlink whose target does not exist, if that is what `e` reports.
fn dangling_link(e: &walkdir::Error) -> Option<PathBuf> {
    if e.loop_ancestor().is_some() {
        return None;
    }
    let not_found = e
        .io_error()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
    let path = e.path()?;
    let is_link = std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    (not_found && is_link).then(|| path.to_path_buf())
}

fn make_entry(files_dir: &Path, path: &Path) -> FilesDirEntry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let relative = path.strip_prefix(files_dir).unwrap_or(path);
    FilesDirEntry {
        name,
        relative_path: slash_path(relative),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_files_dir_is_empty() {
        let dir = tempdir().unwrap();
        assert!(enumerate(&dir.path().join("files")).unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_recurses_and_sorts() {
        let dir = tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(files.join("sub/deeper")).unwrap();
        fs::create_dir_all(files.join("empty")).unwrap();
        fs::write(files.join("z.conf"), "").unwrap();
        fs::write(files.join("a.patch"), "").unwrap();
        fs::write(files.join("sub/b.patch"), "").unwrap();
        fs::write(files.join("sub/deeper/c.initd"), "").unwrap();

        let entries = enumerate(&files).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["a.patch", "sub/b.patch", "sub/deeper/c.initd", "z.conf"]
        );
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.patch", "b.patch", "c.initd", "z.conf"]);
    }

    #[test]
    fn test_files_path_that_is_a_file() {
        let dir = tempdir().unwrap();
        let files = dir.path().join("files");
        fs::write(&files, "not a directory").unwrap();
        assert!(enumerate(&files).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_listed() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join("real.patch"), "").unwrap();
        symlink("real.patch", files.join("alias.patch")).unwrap();
        symlink("gone.patch", files.join("dangling.patch")).unwrap();

        let entries = enumerate(&files).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["alias.patch", "dangling.patch", "real.patch"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let shared = dir.path().join("shared");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("common.patch"), "").unwrap();

        // `files/` itself is a link, and so is a subdirectory inside it.
        let real_files = dir.path().join("real-files");
        fs::create_dir_all(&real_files).unwrap();
        fs::write(real_files.join("own.conf"), "").unwrap();
        symlink(&shared, real_files.join("sub")).unwrap();
        let files = dir.path().join("files");
        symlink(&real_files, &files).unwrap();

        let entries = enumerate(&files).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["own.conf", "sub/common.patch"]);
    }
}
