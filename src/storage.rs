//! Crop storage collaborators.
//!
//! The pipeline hands encoded crops to a `CropStore` and moves on; the
//! production deployment backs this with a remote object bucket, which the
//! pipeline treats as a reliable point-to-point call. Store failures are
//! reported by the caller and never abort the frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

/// Destination for exported crops.
pub trait CropStore: Send {
    /// Persist one encoded crop under `key`.
    fn store(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Filesystem store
// ----------------------------------------------------------------------------

/// Stores crops as files under a root directory.
///
/// Stands in for the remote object bucket on-device: a sync job or bucket
/// mount ships the directory's contents upstream.
pub struct FilesystemCropStore {
    root: PathBuf,
}

impl FilesystemCropStore {
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .map_err(|e| anyhow!("failed to create crop directory {}: {}", root.display(), e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl CropStore for FilesystemCropStore {
    fn store(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(key);
        fs::write(&path, bytes)
            .map_err(|e| anyhow!("failed to write crop {}: {}", path.display(), e))?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// In-memory store (tests)
// ----------------------------------------------------------------------------

/// In-memory store for tests. Clones share the same object list, so a test
/// can keep a handle while the pipeline owns another.
#[derive(Clone, Default)]
pub struct InMemoryCropStore {
    objects: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl InMemoryCropStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("crop store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("crop store lock")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn objects(&self) -> Vec<(String, Vec<u8>)> {
        self.objects.lock().expect("crop store lock").clone()
    }
}

impl CropStore for InMemoryCropStore {
    fn store(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .expect("crop store lock")
            .push((key.to_string(), bytes.to_vec()));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_store_writes_under_root() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = FilesystemCropStore::new(dir.path())?;
        store.store("cropped_image_0.jpg", b"not a real jpeg")?;

        let written = fs::read(dir.path().join("cropped_image_0.jpg"))?;
        assert_eq!(written, b"not a real jpeg");
        Ok(())
    }

    #[test]
    fn filesystem_store_creates_missing_root() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("crops").join("run1");
        FilesystemCropStore::new(&nested)?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[test]
    fn in_memory_clones_share_objects() -> Result<()> {
        let store = InMemoryCropStore::new();
        let mut writer = store.clone();
        writer.store("a.jpg", b"aa")?;
        assert_eq!(store.keys(), vec!["a.jpg"]);
        Ok(())
    }
}
