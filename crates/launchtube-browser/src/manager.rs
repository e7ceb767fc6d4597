//! Managed browser process, extension-based variant.
//!
//! The manager owns at most one browser process at a time. Exit is observed
//! in exactly one place (the watcher task spawned at launch), so the
//! lifecycle event fires once per launch no matter how the process died.

use crate::catalog::{self, DetectedBrowser};
use crate::{Error, Result};
use launchtube_core::lifecycle::{ExitNotifier, LifecycleEvent, LifecycleSender};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Extension directory name whose main script drives the cache-bust check.
const PRIMARY_EXTENSION: &str = "launchtube";
const PRIMARY_EXTENSION_SCRIPT: &str = "content.js";

/// Flags that keep a kiosk-style display free of browser chrome.
const KIOSK_FLAGS: &[&str] = &[
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-sync",
    "--disable-session-crashed-bubble",
    "--disable-infobars",
    "--suppress-message-center-popups",
    "--autoplay-policy=no-user-gesture-required",
    "--force-dark-mode",
];

struct BrowserSession {
    pid: u32,
    browser: DetectedBrowser,
}

struct Inner {
    data_root: PathBuf,
    /// Asset search path for extensions: overrides first, then the bundled
    /// set. The first directory that contains a given extension name wins.
    asset_dirs: Vec<PathBuf>,
    session: Mutex<Option<BrowserSession>>,
    events: Option<LifecycleSender>,
}

#[derive(Clone)]
pub struct BrowserManager {
    inner: Arc<Inner>,
}

impl BrowserManager {
    pub fn new(
        data_root: PathBuf,
        asset_dirs: Vec<PathBuf>,
        events: Option<LifecycleSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                data_root,
                asset_dirs,
                session: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn detect_browsers(&self) -> Vec<DetectedBrowser> {
        catalog::detect_browsers()
    }

    /// Launch the named browser (or the first detected one) showing `url`,
    /// with browser state isolated per profile.
    pub async fn launch(
        &self,
        browser_name: Option<&str>,
        url: &str,
        profile_id: &str,
    ) -> Result<u32> {
        let mut session_guard = self.inner.session.lock().await;
        if let Some(existing) = session_guard.as_ref() {
            return Err(Error::Launch(format!(
                "a managed browser is already running (pid {})",
                existing.pid
            )));
        }

        let browser = catalog::resolve_browser(browser_name).ok_or(Error::NoBrowserFound)?;
        let user_data_dir = self.user_data_dir(profile_id);
        std::fs::create_dir_all(&user_data_dir)?;

        let extensions = self.collect_extensions();
        self.bust_stale_service_worker(profile_id, &user_data_dir, &extensions);

        let args = Self::build_args(&browser, url, &user_data_dir, &extensions);
        tracing::info!("launching {} for profile {}", browser.info.name, profile_id);
        tracing::debug!("browser args: {:?}", args);

        let child = Command::new(&browser.path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Launch("browser exited before a pid was assigned".to_string()))?;

        *session_guard = Some(BrowserSession { pid, browser });
        drop(session_guard);

        self.spawn_exit_watcher(child, pid);
        Ok(pid)
    }

    /// Graceful interrupt; tracked state is cleared unconditionally, even if
    /// signal delivery fails. Without a running process this is a no-op and
    /// no lifecycle event fires.
    pub async fn close(&self) {
        let mut guard = self.inner.session.lock().await;
        if let Some(session) = guard.take() {
            tracing::info!("closing browser pid {}", session.pid);
            kill_by_pid(session.pid);
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    pub async fn pid(&self) -> Option<u32> {
        self.inner.session.lock().await.as_ref().map(|s| s.pid)
    }

    fn user_data_dir(&self, profile_id: &str) -> PathBuf {
        self.inner
            .data_root
            .join("profiles")
            .join(profile_id)
            .join("browser")
    }

    fn build_args(
        browser: &DetectedBrowser,
        url: &str,
        user_data_dir: &Path,
        extensions: &[PathBuf],
    ) -> Vec<String> {
        let mut args = vec![
            format!("--user-data-dir={}", user_data_dir.display()),
            browser.info.fullscreen_flag.to_string(),
        ];
        args.extend(KIOSK_FLAGS.iter().map(|f| f.to_string()));
        if !extensions.is_empty() {
            let joined = extensions
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(",");
            args.push(format!("--load-extension={joined}"));
        }
        args.push(url.to_string());
        args
    }

    /// Every extension directory found under the asset search path; the
    /// first directory that carries a given name shadows later ones.
    fn collect_extensions(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        for asset_dir in &self.inner.asset_dirs {
            let extensions_dir = asset_dir.join("extensions");
            let Ok(entries) = std::fs::read_dir(&extensions_dir) else {
                continue;
            };
            let mut names: Vec<(String, PathBuf)> = entries
                .flatten()
                .filter(|e| e.path().is_dir())
                .map(|e| (e.file_name().to_string_lossy().to_string(), e.path()))
                .collect();
            names.sort();
            for (name, path) in names {
                if seen.contains(&name) {
                    continue;
                }
                seen.push(name);
                found.push(path);
            }
        }
        found
    }

    /// If the primary extension's main script is newer than the last launch
    /// with this profile, drop the browser's extension service-worker
    /// storage so the updated script loads instead of a stale cached worker.
    fn bust_stale_service_worker(
        &self,
        profile_id: &str,
        user_data_dir: &Path,
        extensions: &[PathBuf],
    ) {
        let Some(script) = extensions
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == PRIMARY_EXTENSION))
            .map(|p| p.join(PRIMARY_EXTENSION_SCRIPT))
        else {
            return;
        };
        let Ok(script_mtime) = std::fs::metadata(&script).and_then(|m| m.modified()) else {
            return;
        };

        let stamp_path = self
            .inner
            .data_root
            .join("profiles")
            .join(profile_id)
            .join(".extension-stamp");
        let stamped = std::fs::metadata(&stamp_path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        if script_mtime > stamped {
            let worker_storage = user_data_dir.join("Default").join("Service Worker");
            if worker_storage.exists() {
                tracing::info!("extension script changed, clearing service-worker storage");
                if let Err(e) = std::fs::remove_dir_all(&worker_storage) {
                    tracing::warn!("failed to clear service-worker storage: {}", e);
                }
            }
            if let Some(parent) = stamp_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = std::fs::write(&stamp_path, b"");
        }
    }

    fn spawn_exit_watcher(&self, mut child: Child, pid: u32) {
        let manager = self.clone();
        let notifier = ExitNotifier::new(self.inner.events.clone());
        tokio::spawn(async move {
            let status = child.wait().await;
            tracing::debug!("browser pid {} exited: {:?}", pid, status);

            let mut guard = manager.inner.session.lock().await;
            if guard.as_ref().is_some_and(|s| s.pid == pid) {
                *guard = None;
            }
            drop(guard);

            notifier.notify(LifecycleEvent::BrowserExited { pid: Some(pid) });
        });
    }
}

fn kill_by_pid(pid: u32) {
    #[cfg(unix)]
    {
        let _ = std::process::Command::new("kill")
            .args(["-INT", &pid.to_string()])
            .output();
    }

    #[cfg(windows)]
    {
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BrowserInfo;
    use launchtube_core::lifecycle;

    fn fake_browser() -> DetectedBrowser {
        DetectedBrowser {
            info: BrowserInfo {
                name: "chromium",
                executable: "chromium",
                fullscreen_flag: "--start-fullscreen",
            },
            path: PathBuf::from("/usr/bin/chromium"),
        }
    }

    #[test]
    fn test_build_args_isolate_profile_and_suppress_chrome() {
        let browser = fake_browser();
        let extensions = vec![PathBuf::from("/assets/extensions/launchtube")];
        let args = BrowserManager::build_args(
            &browser,
            "https://youtube.com/tv",
            Path::new("/data/profiles/p1/browser"),
            &extensions,
        );

        assert_eq!(args[0], "--user-data-dir=/data/profiles/p1/browser");
        assert!(args.contains(&"--start-fullscreen".to_string()));
        assert!(args.contains(&"--no-first-run".to_string()));
        assert!(args.contains(&"--autoplay-policy=no-user-gesture-required".to_string()));
        assert!(args.contains(&"--load-extension=/assets/extensions/launchtube".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtube.com/tv");
    }

    #[test]
    fn test_build_args_without_extensions_omits_flag() {
        let args = BrowserManager::build_args(
            &fake_browser(),
            "https://example.com",
            Path::new("/tmp/ud"),
            &[],
        );
        assert!(!args.iter().any(|a| a.starts_with("--load-extension")));
    }

    #[test]
    fn test_override_extension_shadows_default() {
        let overrides = tempfile::tempdir().unwrap();
        let defaults = tempfile::tempdir().unwrap();
        for root in [&overrides, &defaults] {
            std::fs::create_dir_all(root.path().join("extensions/launchtube")).unwrap();
        }
        std::fs::create_dir_all(defaults.path().join("extensions/extra")).unwrap();

        let data = tempfile::tempdir().unwrap();
        let manager = BrowserManager::new(
            data.path().to_path_buf(),
            vec![overrides.path().to_path_buf(), defaults.path().to_path_buf()],
            None,
        );
        let extensions = manager.collect_extensions();

        assert_eq!(extensions.len(), 2);
        assert_eq!(extensions[0], overrides.path().join("extensions/launchtube"));
        assert_eq!(extensions[1], defaults.path().join("extensions/extra"));
    }

    #[tokio::test]
    async fn test_close_without_process_is_noop() {
        let (tx, mut rx) = lifecycle::channel(4);
        let dir = tempfile::tempdir().unwrap();
        let manager = BrowserManager::new(dir.path().to_path_buf(), vec![], Some(tx));

        manager.close().await;

        assert!(!manager.is_running().await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accessors_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BrowserManager::new(dir.path().to_path_buf(), vec![], None);
        assert!(!manager.is_running().await);
        assert_eq!(manager.pid().await, None);
    }

    #[test]
    fn test_stale_worker_storage_removed_when_script_newer() {
        let assets = tempfile::tempdir().unwrap();
        let extension_dir = assets.path().join("extensions/launchtube");
        std::fs::create_dir_all(&extension_dir).unwrap();
        std::fs::write(extension_dir.join("content.js"), "// v2").unwrap();

        let data = tempfile::tempdir().unwrap();
        let user_data_dir = data.path().join("profiles/p1/browser");
        let worker_storage = user_data_dir.join("Default/Service Worker");
        std::fs::create_dir_all(&worker_storage).unwrap();

        let manager = BrowserManager::new(
            data.path().to_path_buf(),
            vec![assets.path().to_path_buf()],
            None,
        );
        let extensions = manager.collect_extensions();
        manager.bust_stale_service_worker("p1", &user_data_dir, &extensions);

        // No stamp existed, so the script counts as newer
        assert!(!worker_storage.exists());

        // Second launch with an unchanged script leaves new storage alone
        std::fs::create_dir_all(&worker_storage).unwrap();
        manager.bust_stale_service_worker("p1", &user_data_dir, &extensions);
        assert!(worker_storage.exists());
    }
}
