//! HTTP handlers for the control-plane.
//!
//! Requests originate from scripts injected into arbitrary third-party
//! pages, so every response is JSON (or an explicit script/HTML body) and
//! the whole surface is CORS-open.

use crate::error::ApiError;
use crate::scripts;
use crate::state::SharedState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use http::{StatusCode, header};
use launchtube_browser::sentinel::{self, LogLevel};
use launchtube_player::{PlayRequest, PlaylistItem, WebhookDescriptor};
use serde::Deserialize;
use serde_json::{Value, json};

const APP_NAME: &str = "launchtube";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_PROFILE: &str = "default";

/// Liveness/identity probe. Injected scripts walk the candidate port list
/// and take the first port that answers with our app name.
pub async fn ping() -> Json<Value> {
    Json(json!({"status": "ok", "app": APP_NAME}))
}

#[derive(Deserialize)]
pub struct MatchQuery {
    url: Option<String>,
    profile: Option<String>,
    version: Option<String>,
}

/// Match a page URL to a configured app entry and serve its content script,
/// or 204 when nothing matches.
pub async fn match_script(
    State(state): State<SharedState>,
    Query(query): Query<MatchQuery>,
) -> Result<Response, ApiError> {
    let url = query
        .url
        .ok_or_else(|| ApiError::BadRequest("missing url parameter".to_string()))?;
    let profile = query.profile.as_deref().unwrap_or(DEFAULT_PROFILE);

    let Some(app) = state.config.find_match(profile, &url).await? else {
        tracing::debug!("no app entry matches {}", url);
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let service_id = app.service_id();
    let Some(content) = scripts::resolve_script(&state.assets, &service_id, query.version.as_deref())?
    else {
        tracing::warn!("matched {} but no script exists for {}", app.name, service_id);
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    Ok(script_response(&content))
}

/// Unversioned script body for a known service id.
pub async fn service_script(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let content = scripts::resolve_script(&state.assets, &id, None)?
        .ok_or_else(|| ApiError::NotFound(format!("no script for service {id}")))?;
    Ok(script_response(&content))
}

/// Scripts are served with a version banner so injected code can detect
/// loader/script skew against the native side.
fn script_response(content: &[u8]) -> Response {
    let mut body = format!("window.LAUNCH_TUBE_VERSION = \"{VERSION}\";\n").into_bytes();
    body.extend_from_slice(content);
    (
        [(header::CONTENT_TYPE, mime::TEXT_JAVASCRIPT.as_ref())],
        body,
    )
        .into_response()
}

pub async fn kv_get_all(
    State(state): State<SharedState>,
    Path(service): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let doc = state.kv.get_all(&service).await?;
    Ok(Json(Value::Object(doc)))
}

pub async fn kv_get(
    State(state): State<SharedState>,
    Path((service, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state
        .kv
        .get(&service, &key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no value for {service}/{key}")))
}

pub async fn kv_put(
    State(state): State<SharedState>,
    Path((service, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state.kv.set(&service, &key, value).await?;
    Ok(Json(json!({"status": "ok"})))
}

pub async fn kv_delete(
    State(state): State<SharedState>,
    Path((service, key)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.kv.delete(&service, &key).await?;
    Ok(Json(json!({"status": "deleted"})))
}

pub async fn kv_delete_all(
    State(state): State<SharedState>,
    Path(service): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.kv.delete_all(&service).await?;
    Ok(Json(json!({"status": "deleted"})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayBody {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start_position: f64,
    #[serde(default)]
    player_options: Vec<String>,
    #[serde(default)]
    on_complete: Option<WebhookDescriptor>,
    #[serde(default)]
    on_progress: Option<WebhookDescriptor>,
}

pub async fn player_play(
    State(state): State<SharedState>,
    Json(body): Json<PlayBody>,
) -> Result<Json<Value>, ApiError> {
    let start_position = body.start_position;
    state
        .player
        .play(PlayRequest {
            url: body.url,
            title: body.title,
            start_position,
            extra_options: body.player_options,
            on_complete: body.on_complete,
            on_progress: body.on_progress,
        })
        .await?;
    Ok(Json(json!({"status": "playing", "position": start_position})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistBody {
    items: Vec<PlaylistItem>,
    #[serde(default)]
    start_position: f64,
}

pub async fn player_playlist(
    State(state): State<SharedState>,
    Json(body): Json<PlaylistBody>,
) -> Result<Json<Value>, ApiError> {
    let count = body.items.len();
    state
        .player
        .play_playlist(body.items, body.start_position)
        .await?;
    Ok(Json(json!({"status": "playing", "count": count})))
}

pub async fn player_status(State(state): State<SharedState>) -> Json<launchtube_player::PlayerState> {
    Json(state.player.status().await)
}

pub async fn player_stop(State(state): State<SharedState>) -> Json<Value> {
    state.player.stop().await;
    Json(json!({"status": "stopped"}))
}

pub async fn browser_close(State(state): State<SharedState>) -> Json<Value> {
    state.browser.close().await;
    Json(json!({"status": "closed"}))
}

#[derive(Deserialize)]
pub struct LogBody {
    message: String,
    #[serde(default)]
    level: Option<String>,
}

/// Relay page-script console output into the native log.
pub async fn log_relay(Json(body): Json<LogBody>) -> Json<Value> {
    let level = LogLevel::parse(body.level.as_deref().unwrap_or("info"));
    sentinel::relay_log(level, &body.message);
    Json(json!({"status": "ok"}))
}

/// Userscript bootstrap for browsers without native extension support.
pub async fn loader_userscript(State(state): State<SharedState>) -> Result<Response, ApiError> {
    static_asset(&state, "launchtube-loader.user.js", mime::TEXT_JAVASCRIPT.as_ref())
}

pub async fn setup_page(State(state): State<SharedState>) -> Result<Response, ApiError> {
    static_asset(&state, "setup.html", mime::TEXT_HTML_UTF_8.as_ref())
}

pub async fn install_page(State(state): State<SharedState>) -> Result<Response, ApiError> {
    static_asset(&state, "install.html", mime::TEXT_HTML_UTF_8.as_ref())
}

fn static_asset(state: &SharedState, relative: &str, content_type: &str) -> Result<Response, ApiError> {
    let content = state
        .assets
        .read(relative)?
        .ok_or_else(|| ApiError::NotFound(format!("no such asset: {relative}")))?;
    Ok((
        [(header::CONTENT_TYPE, content_type.to_string())],
        content.to_vec(),
    )
        .into_response())
}
