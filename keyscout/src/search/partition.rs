use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;

use super::enumerator::direct_files;
use crate::filters::FileFilter;

/// A disjoint set of files assigned to one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Sequential id, unique within one scan
    pub id: usize,
    /// The directory this unit covers (per-directory strategy only)
    pub directory: Option<PathBuf>,
    /// Files to scan
    pub files: Vec<PathBuf>,
}

impl WorkUnit {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Splits `files` into `min(parallelism, files.len())` contiguous units.
///
/// Every unit but the last holds `len / units` files; the last one also takes
/// the remainder. No files means no units.
pub fn partition_chunks(files: Vec<PathBuf>, parallelism: NonZeroUsize) -> Vec<WorkUnit> {
    let total = files.len();
    let unit_count = parallelism.get().min(total);
    if unit_count == 0 {
        debug!("No files to partition");
        return Vec::new();
    }

    let chunk_size = total / unit_count;
    let mut remaining = files.into_iter();
    let units: Vec<WorkUnit> = (0..unit_count)
        .map(|id| {
            let take = if id + 1 == unit_count {
                usize::MAX
            } else {
                chunk_size
            };
            WorkUnit {
                id,
                directory: None,
                files: remaining.by_ref().take(take).collect(),
            }
        })
        .collect();

    debug!(
        "Partitioned {} files into {} chunks of ~{} files",
        total, unit_count, chunk_size
    );
    units
}

/// One unit per directory holding that directory's direct files.
///
/// Directories without files still get a unit; it simply scans nothing.
pub fn partition_directories(directories: Vec<PathBuf>, filter: &FileFilter) -> Vec<WorkUnit> {
    let units: Vec<WorkUnit> = directories
        .into_iter()
        .enumerate()
        .map(|(id, dir)| {
            let files = direct_files(&dir, filter);
            WorkUnit {
                id,
                directory: Some(dir),
                files,
            }
        })
        .collect();

    debug!("Partitioned tree into {} directory units", units.len());
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::tempdir;

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("f{i}.txt"))).collect()
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_chunks_cover_every_file_exactly_once() {
        for n in 0..40 {
            for p in 1..10 {
                let files = paths(n);
                let units = partition_chunks(files.clone(), nz(p));

                assert_eq!(units.len(), p.min(n), "n={n} p={p}");

                let flattened: Vec<PathBuf> =
                    units.iter().flat_map(|u| u.files.iter().cloned()).collect();
                assert_eq!(flattened, files, "n={n} p={p}");

                let unique: HashSet<_> = flattened.iter().collect();
                assert_eq!(unique.len(), n);
                assert!(units.iter().all(|u| !u.is_empty()));
            }
        }
    }

    #[test]
    fn test_last_chunk_absorbs_remainder() {
        let units = partition_chunks(paths(10), nz(4));
        let sizes: Vec<usize> = units.iter().map(WorkUnit::len).collect();
        assert_eq!(sizes, vec![2, 2, 2, 4]);
        let ids: Vec<usize> = units.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_more_threads_than_files() {
        let units = partition_chunks(paths(3), nz(16));
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.len() == 1));
    }

    #[test]
    fn test_empty_file_list_yields_no_units() {
        assert!(partition_chunks(Vec::new(), nz(8)).is_empty());
    }

    #[test]
    fn test_directory_units() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "b").unwrap();
        fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let dirs = vec![
            dir.path().to_path_buf(),
            dir.path().join("sub"),
            dir.path().join("empty"),
        ];
        let units = partition_directories(dirs, &FileFilter::default());

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].files, vec![dir.path().join("a.txt")]);
        assert_eq!(units[1].len(), 2);
        assert!(units[2].is_empty());
        assert_eq!(units[2].directory.as_deref(), Some(dir.path().join("empty").as_path()));
    }
}
