//! External player process controller.
//!
//! Owns at most one player process. A new play stops the previous one before
//! spawning, so there is never more than one live player system-wide. A
//! watcher task is the single place process exit is observed; it fires the
//! finished item's completion webhook, advances the playlist, and emits the
//! lifecycle event once the queue is exhausted. A poller task refreshes the
//! state snapshot over the IPC channel once per second, best-effort.

use crate::ipc::{ControlChannel, IpcRequest};
use crate::webhook::{self, WebhookDescriptor};
use crate::{Error, Result};
use launchtube_core::lifecycle::{ExitNotifier, LifecycleEvent, LifecycleSender};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};

pub struct PlayerConfig {
    /// Player binary, resolved on PATH.
    pub binary: String,
    pub fullscreen: bool,
    pub poll_interval: Duration,
    /// Minimum gap between two progress webhook deliveries.
    pub progress_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: "mpv".to_string(),
            fullscreen: true,
            poll_interval: Duration::from_secs(1),
            progress_interval: Duration::from_secs(3),
        }
    }
}

/// Snapshot of playback state. Position and duration are refreshed by the
/// poller and may be stale by up to one poll interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerState {
    pub playing: bool,
    pub paused: bool,
    pub position: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub url: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub on_complete: Option<WebhookDescriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayRequest {
    pub url: String,
    pub title: Option<String>,
    pub start_position: f64,
    /// Extra options appended to the player command line.
    pub extra_options: Vec<String>,
    pub on_complete: Option<WebhookDescriptor>,
    pub on_progress: Option<WebhookDescriptor>,
}

struct Session {
    generation: u64,
    pid: u32,
    queue: Vec<PlaylistItem>,
    index: usize,
    extra_options: Vec<String>,
    on_progress: Option<WebhookDescriptor>,
    notifier: Arc<ExitNotifier>,
    stopping: bool,
}

struct Inner {
    config: PlayerConfig,
    channel: Arc<dyn ControlChannel>,
    state: RwLock<PlayerState>,
    session: Mutex<Option<Session>>,
    generation: AtomicU64,
    request_id: AtomicU64,
    http: reqwest::Client,
    events: Option<LifecycleSender>,
}

#[derive(Clone)]
pub struct PlayerController {
    inner: Arc<Inner>,
}

impl PlayerController {
    pub fn new(
        config: PlayerConfig,
        channel: Arc<dyn ControlChannel>,
        events: Option<LifecycleSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                channel,
                state: RwLock::new(PlayerState::default()),
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                request_id: AtomicU64::new(1),
                http: reqwest::Client::new(),
                events,
            }),
        }
    }

    /// Stop any current playback and start the given URL. Returns once the
    /// process has been spawned, not once playback begins.
    pub async fn play(&self, request: PlayRequest) -> Result<()> {
        let queue = vec![PlaylistItem {
            url: request.url,
            item_id: None,
            on_complete: request.on_complete,
        }];
        self.play_queue(
            queue,
            request.start_position,
            request.extra_options,
            request.on_progress,
        )
        .await
    }

    /// Play an ordered list of items. On each player exit the controller
    /// fires that item's completion webhook and advances to the next item;
    /// the lifecycle event fires once, after the final item.
    pub async fn play_playlist(&self, items: Vec<PlaylistItem>, start_position: f64) -> Result<()> {
        self.play_queue(items, start_position, Vec::new(), None).await
    }

    async fn play_queue(
        &self,
        queue: Vec<PlaylistItem>,
        start_position: f64,
        extra_options: Vec<String>,
        on_progress: Option<WebhookDescriptor>,
    ) -> Result<()> {
        if queue.is_empty() {
            return Err(Error::Launch("empty playlist".to_string()));
        }

        let mut session_guard = self.inner.session.lock().await;

        // Stop-before-start: the replaced session is detached (its watcher
        // sees a stale generation and only reaps the process).
        if let Some(old) = session_guard.take() {
            tracing::info!("stopping player pid {} before new playback", old.pid);
            kill_by_pid(old.pid);
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let child = self.spawn_item(&queue[0].url, start_position, &extra_options)?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Launch("player exited before a pid was assigned".to_string()))?;

        tracing::info!("player started: pid {} for {}", pid, queue[0].url);

        *session_guard = Some(Session {
            generation,
            pid,
            queue,
            index: 0,
            extra_options,
            on_progress,
            notifier: ExitNotifier::new(self.inner.events.clone()),
            stopping: false,
        });
        drop(session_guard);

        *self.inner.state.write().await = PlayerState {
            playing: true,
            paused: false,
            position: start_position,
            duration: 0.0,
        };

        self.spawn_watcher(child, generation);
        self.spawn_poller(generation);
        Ok(())
    }

    /// Idempotent. Sends a graceful interrupt to the player; cleanup happens
    /// when the watcher observes the exit.
    pub async fn stop(&self) {
        let mut guard = self.inner.session.lock().await;
        if let Some(session) = guard.as_mut() {
            session.stopping = true;
            let pid = session.pid;
            drop(guard);
            tracing::info!("stopping player pid {}", pid);
            kill_by_pid(pid);
        }
    }

    /// Non-blocking snapshot; never touches the player process.
    pub async fn status(&self) -> PlayerState {
        self.inner.state.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    pub async fn pid(&self) -> Option<u32> {
        self.inner.session.lock().await.as_ref().map(|s| s.pid)
    }

    fn build_args(&self, url: &str, start_position: f64, extra_options: &[String]) -> Vec<String> {
        let mut args = Vec::new();
        if self.inner.config.fullscreen {
            args.push("--fullscreen".to_string());
        }
        args.push(format!("--start={start_position}"));
        args.push(format!("--input-ipc-server={}", self.inner.channel.endpoint()));
        args.extend(extra_options.iter().cloned());
        args.push(url.to_string());
        args
    }

    fn spawn_item(&self, url: &str, start_position: f64, extra_options: &[String]) -> Result<Child> {
        Command::new(&self.inner.config.binary)
            .args(self.build_args(url, start_position, extra_options))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Launch(format!("{}: {}", self.inner.config.binary, e)))
    }

    fn spawn_watcher(&self, mut child: Child, generation: u64) {
        let controller = self.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            tracing::debug!("player exited: {:?}", status);
            controller.handle_exit(generation).await;
        });
    }

    async fn handle_exit(&self, generation: u64) {
        let mut guard = self.inner.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return;
        };
        if session.generation != generation {
            // Replaced by a newer play; nothing left to do for this process.
            return;
        }

        let last_state = self.inner.state.read().await.clone();
        if let Some(hook) = session.queue[session.index].on_complete.clone() {
            webhook::spawn_delivery(
                self.inner.http.clone(),
                hook,
                last_state.position,
                last_state.paused,
            );
        }

        let next = session.index + 1;
        if !session.stopping && next < session.queue.len() {
            let url = session.queue[next].url.clone();
            let extra = session.extra_options.clone();
            match self.spawn_item(&url, 0.0, &extra) {
                Ok(child) => {
                    let new_generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    session.index = next;
                    session.generation = new_generation;
                    session.pid = child.id().unwrap_or_default();
                    tracing::info!("playlist advanced to item {} ({})", next, url);
                    drop(guard);

                    *self.inner.state.write().await = PlayerState {
                        playing: true,
                        ..PlayerState::default()
                    };
                    self.spawn_watcher(child, new_generation);
                    self.spawn_poller(new_generation);
                    return;
                }
                Err(e) => {
                    tracing::error!("failed to advance playlist: {}", e);
                }
            }
        }

        let item_id = session.queue[session.index].item_id.clone();
        let notifier = session.notifier.clone();
        *guard = None;
        drop(guard);

        *self.inner.state.write().await = PlayerState::default();
        notifier.notify(LifecycleEvent::PlayerExited { item_id });
    }

    fn spawn_poller(&self, generation: u64) {
        let controller = self.clone();
        tokio::spawn(async move {
            let mut last_progress = Instant::now();
            loop {
                tokio::time::sleep(controller.inner.config.poll_interval).await;

                let progress_hook = {
                    let guard = controller.inner.session.lock().await;
                    match guard.as_ref() {
                        Some(s) if s.generation == generation => s.on_progress.clone(),
                        _ => break,
                    }
                };

                controller.poll_once().await;

                if let Some(hook) = progress_hook {
                    if last_progress.elapsed() >= controller.inner.config.progress_interval {
                        last_progress = Instant::now();
                        let state = controller.inner.state.read().await.clone();
                        webhook::spawn_delivery(
                            controller.inner.http.clone(),
                            hook,
                            state.position,
                            state.paused,
                        );
                    }
                }
            }
            tracing::debug!("poller released (generation {})", generation);
        });
    }

    /// One polling tick: three property queries over a fresh connection.
    /// Every query is independently best-effort; a missing reply leaves the
    /// previous value in place, and a failed tick is skipped, not retried.
    async fn poll_once(&self) {
        let position_id = self.next_request_id();
        let duration_id = self.next_request_id();
        let pause_id = self.next_request_id();
        let requests = vec![
            IpcRequest::get_property(position_id, "time-pos"),
            IpcRequest::get_property(duration_id, "duration"),
            IpcRequest::get_property(pause_id, "pause"),
        ];

        let responses = match self.inner.channel.exchange(&requests).await {
            Ok(responses) => responses,
            Err(e) => {
                tracing::debug!("poll tick skipped: {}", e);
                return;
            }
        };

        let mut state = self.inner.state.write().await;
        for response in responses {
            if !response.is_success() {
                continue;
            }
            match response.request_id {
                Some(id) if id == position_id => {
                    if let Some(v) = response.data.as_f64() {
                        state.position = v;
                    }
                }
                Some(id) if id == duration_id => {
                    if let Some(v) = response.data.as_f64() {
                        state.duration = v;
                    }
                }
                Some(id) if id == pause_id => {
                    if let Some(v) = response.data.as_bool() {
                        state.paused = v;
                    }
                }
                _ => {}
            }
        }
    }

    fn next_request_id(&self) -> u64 {
        self.inner.request_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Graceful interrupt on POSIX, forceful kill by PID on Windows.
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
