//! Dataset enumeration and per-file byte caching.
//!
//! A dataset root contains one subdirectory per ground-truth group. Both the
//! group directories and the files within them are enumerated in sorted name
//! order, so a dataset loads identically on every run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::DataError;

/// One source file together with its ground-truth group label.
///
/// Bytes are read from disk at most once and memoized. The cache is
/// thread-safe to *read*, but concurrent first population is avoided by
/// design: the similarity engine warms every file's cache during its
/// sequential standalone-size pass before any parallel dispatch.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    group: Option<usize>,
    bytes: OnceLock<Vec<u8>>,
}

impl SourceFile {
    /// Creates a descriptor for `path`.
    ///
    /// Fails with [`DataError::NotAFile`] unless the path references an
    /// existing regular file at construction time.
    pub fn new(path: impl Into<PathBuf>, group: Option<usize>) -> Result<SourceFile, DataError> {
        let path = path.into();
        if !path.is_file() {
            return Err(DataError::NotAFile(path));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SourceFile {
            path,
            name,
            group,
            bytes: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<usize> {
        self.group
    }

    /// Axis label for matrix rows and columns, `"{group}_{name}"`.
    pub fn label(&self) -> String {
        match self.group {
            Some(group) => format!("{group}_{}", self.name),
            None => self.name.clone(),
        }
    }

    /// The file's raw bytes, read lazily and cached on first access.
    pub fn bytes(&self) -> Result<&[u8], DataError> {
        if let Some(bytes) = self.bytes.get() {
            return Ok(bytes);
        }
        let read = fs::read(&self.path).map_err(|source| DataError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.bytes.get_or_init(|| read).as_slice())
    }
}

/// A deterministic enumeration of group directories, partitioned into a
/// reference set and a disjoint classification set.
///
/// Group ids are assigned by sorted directory name; within each group the
/// first `files_per_group` files (again by sorted name) form the reference
/// set, and the `classification_per_group` files after those form the
/// classification set. The two partitions never overlap.
#[derive(Debug)]
pub struct Dataset {
    root: PathBuf,
    num_groups: usize,
    files_per_group: usize,
    reference: Vec<SourceFile>,
    classification: Vec<SourceFile>,
}

impl Dataset {
    /// Loads a reference-only dataset: the first `files_per_group` files from
    /// each of the first `num_groups` group directories.
    pub fn load(
        root: impl Into<PathBuf>,
        num_groups: usize,
        files_per_group: usize,
    ) -> Result<Dataset, DataError> {
        Self::load_partitioned(root, num_groups, files_per_group, 0)
    }

    /// Loads a dataset split into reference and classification partitions.
    ///
    /// Errors if the root is missing, has fewer than `num_groups`
    /// subdirectories, or if any group cannot supply
    /// `files_per_group + classification_per_group` distinct files.
    pub fn load_partitioned(
        root: impl Into<PathBuf>,
        num_groups: usize,
        files_per_group: usize,
        classification_per_group: usize,
    ) -> Result<Dataset, DataError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DataError::MissingRoot(root));
        }

        let mut group_dirs = read_sorted(&root, |path| path.is_dir())?;
        if group_dirs.len() < num_groups {
            return Err(DataError::NotEnoughGroups {
                requested: num_groups,
                available: group_dirs.len(),
            });
        }
        group_dirs.truncate(num_groups);

        let requested = files_per_group + classification_per_group;
        let mut reference = Vec::with_capacity(num_groups * files_per_group);
        let mut classification = Vec::with_capacity(num_groups * classification_per_group);
        for (group, dir) in group_dirs.iter().enumerate() {
            let paths = read_sorted(dir, |path| path.is_file())?;
            if paths.len() < requested {
                return Err(DataError::NotEnoughFiles {
                    group,
                    requested,
                    available: paths.len(),
                });
            }
            for path in &paths[..files_per_group] {
                reference.push(SourceFile::new(path, Some(group))?);
            }
            for path in &paths[files_per_group..requested] {
                classification.push(SourceFile::new(path, Some(group))?);
            }
        }

        Ok(Dataset {
            root,
            num_groups,
            files_per_group,
            reference,
            classification,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn files_per_group(&self) -> usize {
        self.files_per_group
    }

    /// Reference files, contiguous per group and in ascending group order.
    /// This is the block layout the scoring engine expects.
    pub fn reference_files(&self) -> &[SourceFile] {
        &self.reference
    }

    /// Held-out files for classification, disjoint from the reference set.
    pub fn classification_files(&self) -> &[SourceFile] {
        &self.classification
    }

    /// Group id of each reference file, in reference order.
    pub fn group_ids(&self) -> Vec<usize> {
        self.reference.iter().filter_map(SourceFile::group).collect()
    }
}

fn read_sorted(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, DataError> {
    let entries = fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_group(root: &Path, group: &str, files: &[(&str, &str)]) {
        let dir = root.join(group);
        fs::create_dir(&dir).unwrap();
        for (name, contents) in files {
            fs::write(dir.join(name), contents).unwrap();
        }
    }

    #[test]
    fn construction_fails_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.java");
        assert!(SourceFile::new(missing, Some(0)).is_err());
    }

    #[test]
    fn construction_fails_for_directory() {
        let dir = TempDir::new().unwrap();
        assert!(SourceFile::new(dir.path(), None).is_err());
    }

    #[test]
    fn bytes_are_read_once_and_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.java");
        fs::write(&path, b"class A {}").unwrap();
        let file = SourceFile::new(&path, Some(0)).unwrap();
        assert_eq!(file.bytes().unwrap(), b"class A {}");

        // Later reads come from the cache, not the (now changed) disk file.
        fs::write(&path, b"changed").unwrap();
        assert_eq!(file.bytes().unwrap(), b"class A {}");
    }

    #[test]
    fn label_includes_group_prefix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.java");
        fs::write(&path, b"x").unwrap();
        assert_eq!(SourceFile::new(&path, Some(3)).unwrap().label(), "3_a.java");
        assert_eq!(SourceFile::new(&path, None).unwrap().label(), "a.java");
    }

    #[test]
    fn loads_groups_and_files_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        write_group(dir.path(), "p2", &[("b.java", "bb"), ("a.java", "aa")]);
        write_group(dir.path(), "p1", &[("d.java", "dd"), ("c.java", "cc")]);

        let dataset = Dataset::load(dir.path(), 2, 2).unwrap();
        let labels: Vec<String> = dataset.reference_files().iter().map(|f| f.label()).collect();
        assert_eq!(labels, ["0_c.java", "0_d.java", "1_a.java", "1_b.java"]);
        assert_eq!(dataset.group_ids(), [0, 0, 1, 1]);
    }

    #[test]
    fn partitions_are_disjoint() {
        let dir = TempDir::new().unwrap();
        write_group(
            dir.path(),
            "p1",
            &[("a.java", "a"), ("b.java", "b"), ("c.java", "c")],
        );

        let dataset = Dataset::load_partitioned(dir.path(), 1, 2, 1).unwrap();
        let reference: Vec<&Path> = dataset.reference_files().iter().map(|f| f.path()).collect();
        let held_out: Vec<&Path> = dataset
            .classification_files()
            .iter()
            .map(|f| f.path())
            .collect();
        assert_eq!(reference.len(), 2);
        assert_eq!(held_out.len(), 1);
        assert!(held_out.iter().all(|p| !reference.contains(p)));
    }

    #[test]
    fn errors_when_requests_exceed_availability() {
        let dir = TempDir::new().unwrap();
        write_group(dir.path(), "p1", &[("a.java", "a")]);

        assert!(matches!(
            Dataset::load(dir.path(), 2, 1),
            Err(DataError::NotEnoughGroups { .. })
        ));
        assert!(matches!(
            Dataset::load_partitioned(dir.path(), 1, 1, 1),
            Err(DataError::NotEnoughFiles { .. })
        ));
        assert!(matches!(
            Dataset::load(dir.path().join("missing"), 1, 1),
            Err(DataError::MissingRoot(_))
        ));
    }
}
