use ignore::{Walk, WalkBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::filters::FileFilter;

/// Recursive walker over the whole tree: no gitignore or hidden-file
/// filtering, symlinks not followed.
fn walker(root: &Path) -> Walk {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false);
    builder.build()
}

/// Every regular file under `root` that passes `filter`.
///
/// Entries that cannot be read are skipped; the walk itself never fails.
pub fn enumerate_files(root: &Path, filter: &FileFilter) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = walker(root)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| filter.should_include_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    debug!("Enumerated {} files under {}", files.len(), root.display());
    files
}

/// Every directory under `root`, `root` included.
pub fn enumerate_directories(root: &Path) -> Vec<PathBuf> {
    let dirs: Vec<PathBuf> = walker(root)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_dir()))
        .map(|entry| entry.into_path())
        .collect();

    debug!(
        "Enumerated {} directories under {}",
        dirs.len(),
        root.display()
    );
    dirs
}

/// Regular files directly inside `dir` that pass `filter` (non-recursive).
///
/// An unreadable directory yields no files.
pub fn direct_files(dir: &Path, filter: &FileFilter) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Cannot list directory {}: {}", dir.display(), err);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .map(|entry| entry.path())
        .filter(|path| filter.should_include_file(path))
        .inspect(|path| trace!("Direct file: {}", path.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join(".hidden"), "h").unwrap();
        fs::write(root.join("sub/b.md"), "b").unwrap();
        fs::write(root.join("sub/deeper/c.txt"), "c").unwrap();
        fs::write(root.join(".gitignore"), "*.txt\n").unwrap();
    }

    #[test]
    fn test_enumerate_files_covers_whole_tree() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let files: BTreeSet<_> = enumerate_files(dir.path(), &FileFilter::default())
            .into_iter()
            .collect();

        let expected: BTreeSet<_> = ["a.txt", ".hidden", "sub/b.md", "sub/deeper/c.txt", ".gitignore"]
            .iter()
            .map(|p| dir.path().join(p))
            .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_enumerate_files_applies_filter() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let filter = FileFilter::new(Some(vec!["txt".to_string()]), &[]).unwrap();
        let files: BTreeSet<_> = enumerate_files(dir.path(), &filter).into_iter().collect();

        let expected: BTreeSet<_> = ["a.txt", "sub/deeper/c.txt"]
            .iter()
            .map(|p| dir.path().join(p))
            .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_enumerate_directories_includes_root() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let dirs: BTreeSet<_> = enumerate_directories(dir.path()).into_iter().collect();
        let expected: BTreeSet<_> = ["", "sub", "sub/deeper", "empty"]
            .iter()
            .map(|p| {
                if p.is_empty() {
                    dir.path().to_path_buf()
                } else {
                    dir.path().join(p)
                }
            })
            .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_direct_files_is_not_recursive() {
        let dir = tempdir().unwrap();
        build_tree(dir.path());

        let files: BTreeSet<_> = direct_files(&dir.path().join("sub"), &FileFilter::default())
            .into_iter()
            .collect();
        assert_eq!(files, BTreeSet::from([dir.path().join("sub/b.md")]));

        assert!(direct_files(&dir.path().join("empty"), &FileFilter::default()).is_empty());
        assert!(direct_files(&dir.path().join("missing"), &FileFilter::default()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("loop")).unwrap();
        fs::write(dir.path().join("loop/file.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop/back")).unwrap();

        let files = enumerate_files(dir.path(), &FileFilter::default());
        assert_eq!(files, vec![dir.path().join("loop/file.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        build_tree(dir.path());
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("inside.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let locked_readable = fs::read_dir(&locked).is_ok();

        let files = enumerate_files(dir.path(), &FileFilter::default());
        assert!(files.contains(&dir.path().join("sub/deeper/c.txt")));
        assert_eq!(files.contains(&locked.join("inside.txt")), locked_readable);

        let dirs = enumerate_directories(dir.path());
        assert!(dirs.contains(&dir.path().join("sub/deeper")));
        assert_eq!(
            direct_files(&locked, &FileFilter::default()).is_empty(),
            !locked_readable
        );

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
