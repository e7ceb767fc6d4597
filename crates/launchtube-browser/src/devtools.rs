//! One-shot DevTools helpers shared by both browser variants.
//!
//! Target discovery goes over the browser's plain-HTTP `/json` list; a
//! single `Runtime.evaluate` is issued over a fresh WebSocket per call,
//! reading exactly one correlated response. No retry and no connection
//! pooling: the polling paths that use this must never block for long, so
//! every step runs under a short deadline and a failed call is just skipped
//! by the caller.

use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub const DEADLINE: Duration = Duration::from_secs(2);

const EVALUATE_ID: u64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Fetch the browser's target list.
pub async fn list_targets(port: u16) -> Result<Vec<TargetInfo>> {
    let response = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/json"))
        .timeout(DEADLINE)
        .send()
        .await
        .map_err(|e| Error::Protocol(format!("target list: {e}")))?;
    response
        .json()
        .await
        .map_err(|e| Error::Protocol(format!("target list: {e}")))
}

/// First page target whose URL contains the fragment.
pub fn pick_page_target<'a>(targets: &'a [TargetInfo], url_fragment: &str) -> Option<&'a TargetInfo> {
    targets
        .iter()
        .find(|t| t.target_type == "page" && t.url.contains(url_fragment))
}

pub async fn find_page_target(port: u16, url_fragment: &str) -> Result<Option<TargetInfo>> {
    let targets = list_targets(port).await?;
    Ok(pick_page_target(&targets, url_fragment).cloned())
}

fn evaluate_command(id: u64, expression: &str) -> Value {
    json!({
        "id": id,
        "method": "Runtime.evaluate",
        "params": {"expression": expression, "returnByValue": true}
    })
}

fn extract_result(message: &Value, id: u64) -> Option<Value> {
    if message.get("id").and_then(Value::as_u64) != Some(id) {
        return None;
    }
    Some(
        message
            .pointer("/result/result/value")
            .cloned()
            .unwrap_or(Value::Null),
    )
}

/// Open one WebSocket to a target's debugger URL and issue a single
/// `Runtime.evaluate`, returning the by-value result.
pub async fn evaluate(ws_url: &str, expression: &str) -> Result<Value> {
    let exchange = async {
        let (mut stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Protocol(format!("debugger socket: {e}")))?;

        let command = evaluate_command(EVALUATE_ID, expression);
        stream
            .send(Message::Text(command.to_string().into()))
            .await
            .map_err(|e| Error::Protocol(format!("evaluate send: {e}")))?;

        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| Error::Protocol(format!("evaluate recv: {e}")))?;
            let Message::Text(text) = message else {
                continue;
            };
            let Ok(parsed) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            if let Some(value) = extract_result(&parsed, EVALUATE_ID) {
                let _ = stream.close(None).await;
                return Ok(value);
            }
        }
        Err(Error::Protocol("debugger socket closed mid-call".to_string()))
    };

    tokio::time::timeout(DEADLINE, exchange)
        .await
        .map_err(|_| Error::Protocol("evaluate deadline exceeded".to_string()))?
}

/// Discover the matching page target, then evaluate in it.
pub async fn evaluate_in_page(port: u16, url_fragment: &str, expression: &str) -> Result<Value> {
    let target = find_page_target(port, url_fragment)
        .await?
        .ok_or_else(|| Error::Protocol(format!("no page target matching {url_fragment:?}")))?;
    let ws_url = target
        .web_socket_debugger_url
        .ok_or_else(|| Error::Protocol("target has no debugger URL".to_string()))?;
    evaluate(&ws_url, expression).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(target_type: &str, url: &str) -> TargetInfo {
        TargetInfo {
            id: "t1".to_string(),
            target_type: target_type.to_string(),
            title: String::new(),
            url: url.to_string(),
            web_socket_debugger_url: Some("ws://127.0.0.1:9222/devtools/page/t1".to_string()),
        }
    }

    #[test]
    fn test_pick_skips_non_page_targets() {
        let targets = vec![
            target("service_worker", "https://youtube.com/sw.js"),
            target("page", "https://youtube.com/watch?v=abc"),
        ];
        let picked = pick_page_target(&targets, "youtube.com").unwrap();
        assert_eq!(picked.target_type, "page");
    }

    #[test]
    fn test_pick_first_match_wins() {
        let targets = vec![
            target("page", "https://youtube.com/a"),
            target("page", "https://youtube.com/b"),
        ];
        assert_eq!(
            pick_page_target(&targets, "youtube.com").unwrap().url,
            "https://youtube.com/a"
        );
        assert!(pick_page_target(&targets, "netflix.com").is_none());
    }

    #[test]
    fn test_evaluate_command_shape() {
        let command = evaluate_command(1, "document.title");
        assert_eq!(command["method"], "Runtime.evaluate");
        assert_eq!(command["params"]["returnByValue"], true);
        assert_eq!(command["params"]["expression"], "document.title");
    }

    #[test]
    fn test_extract_result_correlates_by_id() {
        let reply = json!({"id": 1, "result": {"result": {"type": "string", "value": "Title"}}});
        assert_eq!(extract_result(&reply, 1), Some(json!("Title")));

        let event = json!({"method": "Page.frameNavigated", "params": {}});
        assert_eq!(extract_result(&event, 1), None);

        let other = json!({"id": 2, "result": {}});
        assert_eq!(extract_result(&other, 1), None);
    }

    #[test]
    fn test_target_list_deserializes_devtools_shape() {
        let raw = r#"[{
            "description": "",
            "id": "AB12",
            "title": "YouTube",
            "type": "page",
            "url": "https://www.youtube.com/",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/AB12"
        }]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(raw).unwrap();
        assert_eq!(targets[0].id, "AB12");
        assert_eq!(targets[0].target_type, "page");
        assert!(targets[0].web_socket_debugger_url.is_some());
    }
}
