//! Per-profile application entries and their on-disk store.
//!
//! Each profile owns one `apps.json` under the data root. Entries are only
//! mutated through explicit `save_apps` calls; a per-profile read/write lock
//! keeps concurrent saves from interleaving.

use crate::urlmatch;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One launchable entry: a streaming service URL or a native command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Primary URL; the service is matched when a page URL starts with it.
    #[serde(default)]
    pub url: String,
    /// Additional URLs that also match this entry.
    #[serde(default)]
    pub extra_urls: Vec<String>,
    /// Native command line instead of a browser URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Preferred browser name, resolved against the catalog at launch time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    /// Extra options appended to the player command line.
    #[serde(default)]
    pub player_options: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Stable filesystem-safe identifier derived from the display name:
    /// lowercase, spaces become hyphens, `+` is removed.
    pub fn service_id(&self) -> String {
        service_id(&self.name)
    }

    /// Whether a page URL matches this entry's primary or additional URLs.
    pub fn matches(&self, request_url: &str) -> bool {
        if !self.enabled {
            return false;
        }
        urlmatch::url_matches(request_url, &self.url)
            || self
                .extra_urls
                .iter()
                .any(|u| urlmatch::url_matches(request_url, u))
    }
}

/// Derive a service id from a display name ("Disney+" -> "disney",
/// "My Service" -> "my-service").
pub fn service_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('+', "")
}

/// Loads and persists per-profile app entries under a data root.
pub struct ConfigStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl ConfigStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Default data root: `~/.launchtube`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".launchtube"))
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.root.join("profiles").join(profile)
    }

    fn apps_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join("apps.json")
    }

    async fn profile_lock(&self, profile: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(profile.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Load the app entries for a profile. A profile with no saved entries
    /// yet reads as empty.
    pub async fn load_apps(&self, profile: &str) -> Result<Vec<AppConfig>> {
        let lock = self.profile_lock(profile).await;
        let _guard = lock.read().await;

        let path = self.apps_path(profile);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        let apps: Vec<AppConfig> = serde_json::from_str(&data)?;
        tracing::debug!("Loaded {} app entries for profile {}", apps.len(), profile);
        Ok(apps)
    }

    /// Replace the app entries for a profile. The whole file is rewritten.
    pub async fn save_apps(&self, profile: &str, apps: &[AppConfig]) -> Result<()> {
        if profile.is_empty() || profile.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "invalid profile id: {profile:?}"
            )));
        }
        let lock = self.profile_lock(profile).await;
        let _guard = lock.write().await;

        let path = self.apps_path(profile);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), apps)?;
        tracing::info!("Saved {} app entries for profile {}", apps.len(), profile);
        Ok(())
    }

    /// First enabled entry whose primary or additional URLs match, in
    /// configuration order.
    pub async fn find_match(&self, profile: &str, url: &str) -> Result<Option<AppConfig>> {
        let apps = self.load_apps(profile).await?;
        Ok(apps.into_iter().find(|a| a.matches(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, url: &str) -> AppConfig {
        AppConfig {
            name: name.to_string(),
            enabled: true,
            url: url.to_string(),
            extra_urls: vec![],
            command: None,
            browser: None,
            player_options: vec![],
        }
    }

    #[test]
    fn test_service_id_derivation() {
        assert_eq!(service_id("YouTube"), "youtube");
        assert_eq!(service_id("Disney+"), "disney");
        assert_eq!(service_id("Prime Video"), "prime-video");
    }

    #[test]
    fn test_disabled_entry_never_matches() {
        let mut a = app("YouTube", "youtube.com");
        a.enabled = false;
        assert!(!a.matches("https://youtube.com/watch"));
    }

    #[test]
    fn test_extra_urls_match() {
        let mut a = app("YouTube", "youtube.com");
        a.extra_urls.push("youtu.be".to_string());
        assert!(a.matches("https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        let apps = vec![app("YouTube", "youtube.com"), app("Netflix", "netflix.com")];
        store.save_apps("default", &apps).await.unwrap();

        let loaded = store.load_apps("default").await.unwrap();
        assert_eq!(loaded, apps);
    }

    #[tokio::test]
    async fn test_missing_profile_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert!(store.load_apps("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_match_in_configuration_order_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        let apps = vec![app("Broad", "you"), app("Narrow", "youtube.com")];
        store.save_apps("default", &apps).await.unwrap();

        let m = store
            .find_match("default", "https://youtube.com/watch")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.name, "Broad");
    }

    #[tokio::test]
    async fn test_invalid_profile_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert!(store.save_apps("../oops", &[]).await.is_err());
    }
}
