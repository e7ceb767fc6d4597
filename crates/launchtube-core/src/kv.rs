//! Per-service key-value store.
//!
//! Each service gets one flat JSON document under `kv/` in the data root.
//! Every mutation rewrites the whole document; last write wins. Write volume
//! is user-preference scale, so there is no compaction and no partial write.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct KvStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl KvStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            lock: Mutex::new(()),
        }
    }

    fn service_path(&self, service: &str) -> Result<PathBuf> {
        if service.is_empty() || service.contains(['/', '\\', '.']) {
            return Err(Error::InvalidConfig(format!(
                "invalid service id: {service:?}"
            )));
        }
        Ok(self.root.join("kv").join(format!("{service}.json")))
    }

    fn read_document(&self, service: &str) -> Result<Map<String, Value>> {
        let path = self.service_path(service)?;
        if !path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_document(&self, service: &str, doc: &Map<String, Value>) -> Result<()> {
        let path = self.service_path(service)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), doc)?;
        Ok(())
    }

    pub async fn get(&self, service: &str, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document(service)?.get(key).cloned())
    }

    pub async fn get_all(&self, service: &str) -> Result<Map<String, Value>> {
        let _guard = self.lock.lock().await;
        self.read_document(service)
    }

    pub async fn set(&self, service: &str, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_document(service)?;
        doc.insert(key.to_string(), value);
        self.write_document(service, &doc)?;
        tracing::debug!("kv: {}[{}] written", service, key);
        Ok(())
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, service: &str, key: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_document(service)?;
        let existed = doc.remove(key).is_some();
        if existed {
            self.write_document(service, &doc)?;
        }
        Ok(existed)
    }

    pub async fn delete_all(&self, service: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.service_path(service)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        tracing::debug!("kv: {} namespace cleared", service);
        Ok(())
    }
}
