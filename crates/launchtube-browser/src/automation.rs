//! Full-control browser variant driven over the DevTools protocol.
//!
//! Used when the extension-based approach is disabled. The browser is
//! launched with a minimal flag set and the bootstrap script is injected
//! with `Page.addScriptToEvaluateOnNewDocument`, so it runs on every
//! navigation without enabling the wider instrumentation that anti-bot
//! heuristics probe for. The only signal path back out of the page is the
//! console-sentinel channel (see [`crate::sentinel`]): the client subscribes
//! to console-API-called events and forwards matching lines, nothing else.

use crate::sentinel::{self, PageSender};
use crate::{Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, BringToFrontParams, CaptureScreenshotFormat,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use launchtube_core::lifecycle::{ExitNotifier, LifecycleEvent, LifecycleSender};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const BODY_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_WAIT_TICK: Duration = Duration::from_millis(500);

/// Deliberately small: every extra automation flag is a fingerprint.
const AUTOMATION_FLAGS: &[&str] = &[
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-sync",
    "--autoplay-policy=no-user-gesture-required",
    "--start-fullscreen",
];

pub struct AutomationConfig {
    pub data_root: PathBuf,
    /// Injected on every new document.
    pub bootstrap_script: String,
}

struct AutomationSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    console_task: JoinHandle<()>,
}

pub struct AutomationClient {
    config: AutomationConfig,
    session: Mutex<Option<AutomationSession>>,
    events: Option<LifecycleSender>,
    page_tx: PageSender,
}

impl AutomationClient {
    pub fn new(
        config: AutomationConfig,
        events: Option<LifecycleSender>,
        page_tx: PageSender,
    ) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            events,
            page_tx,
        }
    }

    /// Launch the browser under automation control, inject the bootstrap
    /// script, navigate, wait (bounded, non-fatal) for the document body,
    /// and bring the window to front.
    pub async fn launch(&self, url: &str, profile_id: &str) -> Result<()> {
        let mut session_guard = self.session.lock().await;
        if session_guard.is_some() {
            return Err(Error::Launch(
                "an automation session is already running".to_string(),
            ));
        }

        let user_data_dir = self
            .config
            .data_root
            .join("profiles")
            .join(profile_id)
            .join("automation");
        std::fs::create_dir_all(&user_data_dir)?;

        let browser_config = BrowserConfig::builder()
            .with_head()
            .user_data_dir(&user_data_dir)
            .args(AUTOMATION_FLAGS.to_vec())
            .build()
            .map_err(Error::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Error::Launch(e.to_string()))?;
        tracing::info!("automation browser launched for profile {}", profile_id);

        // The handler stream ends when the browser process terminates or the
        // session is torn down; this is the single exit-observation point.
        let notifier = ExitNotifier::new(self.events.clone());
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("automation handler event error: {}", e);
                }
            }
            notifier.notify(LifecycleEvent::BrowserExited { pid: None });
        });

        let page = browser.new_page("about:blank").await?;

        let inject = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(self.config.bootstrap_script.clone())
            .build()
            .map_err(Error::Protocol)?;
        page.execute(inject).await?;

        let console_task = self.spawn_console_forwarder(&page).await?;

        page.goto(url).await?;
        self.wait_for_body(&page).await;

        if let Err(e) = page.execute(BringToFrontParams::default()).await {
            tracing::warn!("bring-to-front failed: {}", e);
        }

        *session_guard = Some(AutomationSession {
            browser,
            page,
            handler_task,
            console_task,
        });
        Ok(())
    }

    /// Subscribe to console-API-called events and feed sentinel lines into
    /// the page bus. Non-sentinel output is dropped here.
    async fn spawn_console_forwarder(&self, page: &Page) -> Result<JoinHandle<()>> {
        let mut events = page.event_listener::<EventConsoleApiCalled>().await?;
        let tx = self.page_tx.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                for arg in &event.args {
                    let Some(text) = arg.value.as_ref().and_then(Value::as_str) else {
                        continue;
                    };
                    if let Some(message) = sentinel::parse(text) {
                        if tx.send(message).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }))
    }

    async fn wait_for_body(&self, page: &Page) {
        let deadline = tokio::time::Instant::now() + BODY_WAIT_TIMEOUT;
        loop {
            match page.evaluate("document.body !== null").await {
                Ok(result) if result.value() == Some(&Value::Bool(true)) => return,
                Ok(_) => {}
                Err(e) => tracing::debug!("body probe failed: {}", e),
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("document body did not appear within {:?}", BODY_WAIT_TIMEOUT);
                return;
            }
            tokio::time::sleep(BODY_WAIT_TICK).await;
        }
    }

    async fn page(&self) -> Result<Page> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.page.clone())
            .ok_or(Error::NotRunning)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page().await?;
        page.goto(url).await?;
        Ok(())
    }

    pub async fn execute_script(&self, js: &str) -> Result<Value> {
        let page = self.page().await?;
        let result = page.evaluate(js).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.page().await?;
        let bytes = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;
        Ok(bytes)
    }

    pub async fn current_url(&self) -> Result<String> {
        let page = self.page().await?;
        let url = page.url().await?;
        url.ok_or_else(|| Error::Protocol("page has no URL".to_string()))
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Tear the session down. Closing the browser ends the handler stream,
    /// which is what fires the lifecycle event.
    pub async fn close(&self) -> Result<()> {
        let Some(mut session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session.console_task.abort();
        if let Err(e) = session.browser.close().await {
            tracing::warn!("browser close failed: {}", e);
        }
        let _ = session.browser.wait().await;
        let _ = session.handler_task.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchtube_core::lifecycle;

    fn test_client() -> (AutomationClient, sentinel::PageReceiver) {
        let (page_tx, page_rx) = sentinel::channel(8);
        let (events_tx, _events_rx) = lifecycle::channel(4);
        let config = AutomationConfig {
            data_root: std::env::temp_dir().join("launchtube-test"),
            bootstrap_script: "console.log('boot')".to_string(),
        };
        (
            AutomationClient::new(config, Some(events_tx), page_tx),
            page_rx,
        )
    }

    #[tokio::test]
    async fn test_operations_require_running_session() {
        let (client, _rx) = test_client();

        assert!(matches!(client.navigate("https://x").await, Err(Error::NotRunning)));
        assert!(matches!(client.execute_script("1 + 1").await, Err(Error::NotRunning)));
        assert!(matches!(client.screenshot().await, Err(Error::NotRunning)));
        assert!(matches!(client.current_url().await, Err(Error::NotRunning)));
        assert!(!client.is_running().await);
    }

    #[tokio::test]
    async fn test_close_without_session_is_noop() {
        let (client, _rx) = test_client();
        client.close().await.unwrap();
    }

    // Launch/navigate/screenshot against a real browser are covered by
    // manual testing; they need an installed Chrome.
}
