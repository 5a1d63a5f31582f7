//! Working directory access
//!
//! Only plain files directly inside the working directory are listed; the
//! repository's own `.gitlet` directory is never touched.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{GitletError, Result};
use crate::object::ObjectId;

/// Name of the repository metadata directory
pub const GITLET_DIR: &str = ".gitlet";

/// Whether `file` names a location inside the working directory and outside
/// `.gitlet`: relative, with no `.` or `..` components.
pub fn is_valid_path(file: &str) -> bool {
    let mut components = Path::new(file).components();
    match components.next() {
        Some(Component::Normal(first)) if first != GITLET_DIR => {}
        _ => return false,
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

/// The user's working files
#[derive(Debug, Clone)]
pub struct WorkTree {
    root: PathBuf,
}

impl WorkTree {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &str) -> Result<PathBuf> {
        if !is_valid_path(file) {
            return Err(GitletError::Corrupt(format!("path escapes the working directory: {file}")));
        }
        Ok(self.root.join(file))
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path(file).is_ok_and(|path| path.is_file())
    }

    pub fn read(&self, file: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(file)?)?)
    }

    /// Write `data`, creating parent directories as needed
    pub fn write(&self, file: &str, data: &[u8]) -> Result<()> {
        let path = self.path(file)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }

    /// Delete a working file; a missing file is not an error
    pub fn delete(&self, file: &str) -> Result<()> {
        match fs::remove_file(self.path(file)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Content hash of a working file, `None` if it does not exist
    pub fn hash(&self, file: &str) -> Result<Option<ObjectId>> {
        if !self.exists(file) {
            return Ok(None);
        }
        Ok(Some(ObjectId::from_data(&self.read(file)?)))
    }

    /// Plain files directly in the working directory
    pub fn plain_files(&self) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name != GITLET_DIR {
                    files.insert(name.to_string());
                }
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_delete() {
        let tmp = TempDir::new().unwrap();
        let wt = WorkTree::new(tmp.path());
        wt.write("a.txt", b"hello").unwrap();
        assert!(wt.exists("a.txt"));
        assert_eq!(wt.read("a.txt").unwrap(), b"hello");
        assert_eq!(wt.hash("a.txt").unwrap(), Some(ObjectId::from_data(b"hello")));
        wt.delete("a.txt").unwrap();
        assert!(!wt.exists("a.txt"));
        assert_eq!(wt.hash("a.txt").unwrap(), None);
        wt.delete("a.txt").unwrap();
    }

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("a.txt"));
        assert!(is_valid_path("sub/a.txt"));
        assert!(is_valid_path(".gitletignore"));
        assert!(!is_valid_path(""));
        assert!(!is_valid_path("/etc/passwd"));
        assert!(!is_valid_path("../outside.txt"));
        assert!(!is_valid_path("sub/../../x"));
        assert!(!is_valid_path("./a.txt"));
        assert!(!is_valid_path(".gitlet"));
        assert!(!is_valid_path(".gitlet/config.json"));
    }

    #[test]
    fn test_paths_outside_root_are_refused() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("work");
        fs::create_dir_all(root.join(GITLET_DIR)).unwrap();
        fs::write(tmp.path().join("outside.txt"), "keep").unwrap();
        fs::write(root.join(GITLET_DIR).join("config.json"), "{}").unwrap();
        let wt = WorkTree::new(&root);

        assert!(!wt.exists("../outside.txt"));
        assert_eq!(wt.hash("../outside.txt").unwrap(), None);
        assert!(matches!(wt.read("../outside.txt"), Err(GitletError::Corrupt(_))));
        assert!(matches!(wt.delete("../outside.txt"), Err(GitletError::Corrupt(_))));
        assert!(matches!(wt.write(".gitlet/config.json", b"x"), Err(GitletError::Corrupt(_))));
        assert!(matches!(wt.delete(".gitlet/config.json"), Err(GitletError::Corrupt(_))));

        assert_eq!(fs::read_to_string(tmp.path().join("outside.txt")).unwrap(), "keep");
        assert_eq!(fs::read_to_string(root.join(GITLET_DIR).join("config.json")).unwrap(), "{}");
    }

    #[test]
    fn test_plain_files_skips_directories() {
        let tmp = TempDir::new().unwrap();
        let wt = WorkTree::new(tmp.path());
        fs::create_dir_all(tmp.path().join(GITLET_DIR)).unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        wt.write("b.txt", b"b").unwrap();
        wt.write("a.txt", b"a").unwrap();
        let files: Vec<_> = wt.plain_files().unwrap().into_iter().collect();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }
}
