//! Two-layer asset resolution with an mtime-validated content cache.
//!
//! Every asset read checks the operator's override directory first, then the
//! bundled read-only set. Operators can hot-patch a script by dropping a
//! file into the override layer; removing the override layer entirely leaves
//! the app fully functional on the bundled set.
//!
//! The cache is keyed by absolute path and invalidated purely by comparing
//! the file's modification time on every read (stat before read). There are
//! no explicit invalidation events.

use std::collections::HashMap;
use std::io::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

struct CacheEntry {
    mtime: SystemTime,
    content: Arc<Vec<u8>>,
}

pub struct AssetResolver {
    override_dir: PathBuf,
    bundled_dir: PathBuf,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl AssetResolver {
    pub fn new(override_dir: PathBuf, bundled_dir: PathBuf) -> Self {
        Self {
            override_dir,
            bundled_dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Override layer first, bundled layer second.
    pub fn layers(&self) -> [&Path; 2] {
        [&self.override_dir, &self.bundled_dir]
    }

    /// Absolute path of the first layer that carries the asset.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        self.layers()
            .iter()
            .map(|layer| layer.join(relative))
            .find(|path| path.is_file())
    }

    /// Read an asset through the cache. `Ok(None)` means neither layer has
    /// it.
    pub fn read(&self, relative: &str) -> Result<Option<Arc<Vec<u8>>>> {
        match self.resolve(relative) {
            Some(path) => self.read_cached(&path).map(Some),
            None => Ok(None),
        }
    }

    fn read_cached(&self, path: &Path) -> Result<Arc<Vec<u8>>> {
        let mtime = std::fs::metadata(path)?.modified()?;

        let mut cache = self.cache.lock().expect("asset cache poisoned");
        if let Some(entry) = cache.get(path) {
            if entry.mtime == mtime {
                return Ok(entry.content.clone());
            }
            tracing::debug!("asset changed on disk, rereading: {}", path.display());
        }

        let content = Arc::new(std::fs::read(path)?);
        cache.insert(
            path.to_path_buf(),
            CacheEntry {
                mtime,
                content: content.clone(),
            },
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn resolver_with_layers() -> (tempfile::TempDir, tempfile::TempDir, AssetResolver) {
        let overrides = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(
            overrides.path().to_path_buf(),
            bundled.path().to_path_buf(),
        );
        (overrides, bundled, resolver)
    }

    #[test]
    fn test_override_layer_wins() {
        let (overrides, bundled, resolver) = resolver_with_layers();
        std::fs::write(bundled.path().join("a.js"), "bundled").unwrap();
        std::fs::write(overrides.path().join("a.js"), "patched").unwrap();

        let content = resolver.read("a.js").unwrap().unwrap();
        assert_eq!(&**content, b"patched");
    }

    #[test]
    fn test_falls_back_to_bundled_layer() {
        let (_overrides, bundled, resolver) = resolver_with_layers();
        std::fs::write(bundled.path().join("a.js"), "bundled").unwrap();

        let content = resolver.read("a.js").unwrap().unwrap();
        assert_eq!(&**content, b"bundled");
    }

    #[test]
    fn test_missing_everywhere_is_none() {
        let (_overrides, _bundled, resolver) = resolver_with_layers();
        assert!(resolver.read("missing.js").unwrap().is_none());
    }

    #[test]
    fn test_cache_invalidated_by_mtime() {
        let (_overrides, bundled, resolver) = resolver_with_layers();
        let path = bundled.path().join("a.js");
        std::fs::write(&path, "v1").unwrap();
        assert_eq!(&**resolver.read("a.js").unwrap().unwrap(), b"v1");

        // Ensure a distinct mtime on coarse-grained filesystems
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&path, "v2").unwrap();
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();
        std::fs::File::open(&path).unwrap().set_modified(mtime + Duration::from_secs(1)).ok();

        assert_eq!(&**resolver.read("a.js").unwrap().unwrap(), b"v2");
    }
}
