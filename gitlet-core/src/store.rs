//! Content-addressed object store
//!
//! Blobs and commit records share one addressing scheme: each entry lives
//! at `objects/{hash[0..2]}/{hash[2..]}`, zstd-compressed on disk. The
//! store is append-only; there is no update or delete.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GitletError, Result};
use crate::object::ObjectId;

/// On-disk object store rooted at an `objects/` directory
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    compression_level: i32,
}

impl ObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: &Path, compression_level: i32) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            compression_level,
        })
    }

    /// Store bytes under their content hash and return it.
    ///
    /// Storing content that is already present is a no-op.
    pub fn put(&self, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::from_data(data);
        self.insert(id, data)?;
        Ok(id)
    }

    /// Store bytes under a caller-computed id (commit records).
    pub(crate) fn insert(&self, id: ObjectId, data: &[u8]) -> Result<()> {
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let compressed = zstd::encode_all(data, self.compression_level)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &compressed)?;
        fs::rename(&tmp_path, &path)?;
        tracing::trace!(%id, bytes = data.len(), "stored object");
        Ok(())
    }

    /// Retrieve the original bytes of an object
    pub fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitletError::NotFound(*id));
            }
            Err(e) => return Err(e.into()),
        };
        zstd::decode_all(compressed.as_slice())
            .map_err(|e| GitletError::Corrupt(format!("object {}: {}", id, e)))
    }

    /// Check if an object exists
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}
