use anyhow::{Context, Result};
use console::Term;
use launchtube_browser::sentinel;
use launchtube_browser::{AutomationClient, AutomationConfig, BrowserManager, PageMessage};
use launchtube_core::config::ConfigStore;
use launchtube_core::kv::KvStore;
use launchtube_core::lifecycle::{self, LifecycleEvent};
use launchtube_gateway::{AppState, AssetResolver, bind_first_available, serve as serve_gateway};
use launchtube_player::{PlayerConfig, PlayerController, ipc};
use std::path::PathBuf;
use std::sync::Arc;

/// Bootstrap script injected on every navigation in automation mode.
const BOOTSTRAP_ASSET: &str = "bootstrap.js";

pub fn execute(
    data_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    open: Option<String>,
    profile: &str,
    automation: bool,
    player_binary: String,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run(
        data_dir,
        assets_dir,
        open,
        profile,
        automation,
        player_binary,
    ));

    runtime.shutdown_timeout(std::time::Duration::from_millis(100));
    result
}

async fn run(
    data_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    open: Option<String>,
    profile: &str,
    automation: bool,
    player_binary: String,
) -> Result<()> {
    let data_root = data_dir
        .or_else(ConfigStore::default_root)
        .context("could not determine home directory")?;
    std::fs::create_dir_all(&data_root)?;
    let bundled = assets_dir.unwrap_or_else(|| data_root.join("assets"));
    let overrides = data_root.join("overrides");

    let (events_tx, mut events_rx) = lifecycle::channel(16);

    let player = PlayerController::new(
        PlayerConfig {
            binary: player_binary,
            ..PlayerConfig::default()
        },
        Arc::from(ipc::platform_default()),
        Some(events_tx.clone()),
    );
    let browser = BrowserManager::new(
        data_root.clone(),
        vec![overrides.clone(), bundled.clone()],
        Some(events_tx.clone()),
    );

    let state = Arc::new(AppState {
        config: ConfigStore::new(data_root.clone()),
        kv: KvStore::new(data_root.clone()),
        assets: AssetResolver::new(overrides, bundled),
        player: player.clone(),
        browser: browser.clone(),
    });

    let (listener, port) = bind_first_available()
        .await
        .context("no gateway port available")?;
    println!("✓ Control-plane listening on http://127.0.0.1:{port}");

    let gateway_state = state.clone();
    let gateway_task = tokio::spawn(async move {
        if let Err(e) = serve_gateway(gateway_state, listener).await {
            tracing::error!("gateway stopped: {}", e);
        }
    });

    let automation_client = if automation {
        let bootstrap = state
            .assets
            .read(BOOTSTRAP_ASSET)?
            .map(|content| String::from_utf8_lossy(&content).into_owned())
            .unwrap_or_default();
        if bootstrap.is_empty() {
            tracing::warn!("no {} asset found; pages get no bootstrap", BOOTSTRAP_ASSET);
        }

        let (page_tx, mut page_rx) = sentinel::channel(32);
        let client = Arc::new(AutomationClient::new(
            AutomationConfig {
                data_root: data_root.clone(),
                bootstrap_script: bootstrap,
            },
            Some(events_tx.clone()),
            page_tx,
        ));

        let page_consumer = client.clone();
        tokio::spawn(async move {
            while let Some(message) = page_rx.recv().await {
                match message {
                    PageMessage::CloseRequested => {
                        tracing::info!("page requested close");
                        if let Err(e) = page_consumer.close().await {
                            tracing::warn!("close failed: {}", e);
                        }
                    }
                    PageMessage::Log { level, message } => sentinel::relay_log(level, &message),
                }
            }
        });
        Some(client)
    } else {
        None
    };

    if let Some(url) = open {
        match &automation_client {
            Some(client) => client.launch(&url, profile).await?,
            None => {
                browser.launch(None, &url, profile).await?;
            }
        }
        println!("✓ Opened {url} (profile: {profile})");
    }

    println!("Press any key or Ctrl+C to quit.");

    let mut input_task = tokio::task::spawn_blocking(|| Term::stdout().read_char());
    let mut input_active = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }

            result = &mut input_task, if input_active => {
                match result {
                    Ok(Ok(_)) => break,
                    // No interactive terminal; keep serving until Ctrl+C
                    _ => input_active = false,
                }
            }

            event = events_rx.recv() => {
                match event {
                    Some(LifecycleEvent::PlayerExited { item_id }) => {
                        tracing::info!("playback finished (item: {:?})", item_id);
                    }
                    Some(LifecycleEvent::BrowserExited { pid }) => {
                        tracing::info!("browser exited (pid: {:?})", pid);
                    }
                    None => {}
                }
            }
        }
    }

    println!("Shutting down...");
    player.stop().await;
    browser.close().await;
    if let Some(client) = &automation_client {
        let _ = client.close().await;
    }
    gateway_task.abort();
    Ok(())
}
