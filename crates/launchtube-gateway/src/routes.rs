//! Route table for the control-plane.
//!
//! ```text
//! GET  /api/1/ping                      liveness/identity probe
//! GET  /api/1/match                     page URL -> content script | 204
//! GET  /api/1/service/{id}              unversioned script body
//! GET  /api/1/kv/{service}              whole namespace
//! DEL  /api/1/kv/{service}              clear namespace
//! GET  /api/1/kv/{service}/{key}        value | 404
//! PUT  /api/1/kv/{service}/{key}        set value
//! DEL  /api/1/kv/{service}/{key}        delete value
//! POST /api/1/player/play               start playback
//! POST /api/1/player/playlist           start a playlist
//! GET  /api/1/player/status             state snapshot
//! POST /api/1/player/stop               stop playback
//! POST /api/1/browser/close             close the managed browser
//! POST /api/1/log                       page log relay
//! GET  /launchtube-loader.user.js       userscript bootstrap
//! GET  /setup, /install                 HTML bootstrap pages
//! ```

use crate::handlers::*;
use crate::state::SharedState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

pub fn create_router(state: SharedState) -> Router {
    // Requests come from injected scripts on arbitrary page origins, so the
    // whole surface is CORS-open.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/1/ping", get(ping))
        .route("/api/1/match", get(match_script))
        .route("/api/1/service/{id}", get(service_script))
        .route("/api/1/kv/{service}", get(kv_get_all).delete(kv_delete_all))
        .route(
            "/api/1/kv/{service}/{key}",
            get(kv_get).put(kv_put).delete(kv_delete),
        )
        .route("/api/1/player/play", post(player_play))
        .route("/api/1/player/playlist", post(player_playlist))
        .route("/api/1/player/status", get(player_status))
        .route("/api/1/player/stop", post(player_stop))
        .route("/api/1/browser/close", post(browser_close))
        .route("/api/1/log", post(log_relay))
        .route("/launchtube-loader.user.js", get(loader_userscript))
        .route("/setup", get(setup_page))
        .route("/install", get(install_page))
        .layer(cors)
        .with_state(state)
}
