use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

pub(crate) fn read_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    let raw = fs::read_to_string(path).map_err(|e| Error::unreadable(e, path))?;
    let raw = raw.trim();

    Ok(raw.to_string())
}

pub(crate) fn read_u32(path: impl AsRef<Path>) -> Result<u32> {
    let path = path.as_ref();
    let raw = read_string(path)?;

    raw.parse().map_err(|e| Error::unparseable(e, path))
}

/// Reads a single sysfs attribute, treating unreadable or empty files as
/// absent.
pub(crate) fn read_attr(dir: &Path, name: &str) -> Option<String> {
    read_string(dir.join(name)).ok().filter(|v| !v.is_empty())
}

/// Returns the basename of a symbolic link's target, e.g. the bound driver
/// for `<device>/driver`.
pub(crate) fn read_link_name(path: impl AsRef<Path>) -> Option<String> {
    let target = fs::read_link(path).ok()?;
    target.file_name()?.to_str().map(|s| s.to_string())
}

/// Lists the immediate subdirectories of `path`, following symlinks, sorted
/// by name. Unreadable entries are skipped.
pub(crate) fn list_dirs(path: impl AsRef<Path>) -> Vec<(String, PathBuf)> {
    let mut ret = Vec::new();

    let walker = WalkDir::new(path.as_ref())
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();
    for entry in walker.filter_entry(|e| !is_hidden(e)).flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            ret.push((name.to_string(), entry.path().to_path_buf()));
        }
    }

    ret
}

/// Lists the names of every entry directly under `path`, sorted.
pub(crate) fn list_names(path: impl AsRef<Path>) -> Vec<String> {
    let walker = WalkDir::new(path.as_ref())
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();

    walker
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .collect()
}

pub(crate) fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("idVendor"), "1a86\n").unwrap();
        fs::write(dir.path().join("serial"), "  \n").unwrap();

        assert_eq!(read_attr(dir.path(), "idVendor").as_deref(), Some("1a86"));
        assert_eq!(read_attr(dir.path(), "serial"), None);
        assert_eq!(read_attr(dir.path(), "missing"), None);
    }

    #[test]
    fn numbers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("busnum"), "3\n").unwrap();
        fs::write(dir.path().join("devnum"), "x\n").unwrap();

        assert_eq!(read_u32(dir.path().join("busnum")).unwrap(), 3);
        assert!(matches!(
            read_u32(dir.path().join("devnum")).unwrap_err().kind(),
            crate::ErrorKind::Unparseable
        ));
        assert!(matches!(
            read_u32(dir.path().join("nope")).unwrap_err().kind(),
            crate::ErrorKind::Unreadable
        ));
    }

    #[test]
    fn directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2-1")).unwrap();
        fs::create_dir(dir.path().join("1-1")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("file"), "").unwrap();

        let names: Vec<String> = list_dirs(dir.path()).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["1-1", "2-1"]);

        assert!(list_dirs(dir.path().join("absent")).is_empty());
    }
}
