//! Webhook descriptors and fire-and-forget delivery.
//!
//! Delivery is best-effort by contract: one attempt, 10 second timeout,
//! failures logged and dropped. Progress sync toward a media server is
//! inherently lossy; a missed report is corrected by the next one.

use launchtube_core::ticks;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const POSITION_TOKEN: &str = "${positionTicks}";
const PAUSED_TOKEN: &str = "${isPaused}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDescriptor {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Resolve placeholder tokens against the current playback state. String
/// values get `${positionTicks}` and `${isPaused}` substituted; everything
/// else passes through unchanged.
pub fn render_body(template: &Value, position_seconds: f64, paused: bool) -> Value {
    match template {
        Value::String(s) => {
            let ticks = ticks::seconds_to_ticks(position_seconds).to_string();
            let paused = if paused { "true" } else { "false" };
            Value::String(s.replace(POSITION_TOKEN, &ticks).replace(PAUSED_TOKEN, paused))
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_body(v, position_seconds, paused)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_body(v, position_seconds, paused))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// One delivery attempt. Never retried, never surfaced to the caller.
pub async fn deliver(
    client: &reqwest::Client,
    hook: &WebhookDescriptor,
    position_seconds: f64,
    paused: bool,
) {
    let method = match hook.method.to_uppercase().parse::<reqwest::Method>() {
        Ok(m) => m,
        Err(_) => {
            tracing::warn!("webhook: invalid method {:?}, skipping", hook.method);
            return;
        }
    };

    let mut request = client
        .request(method, &hook.url)
        .timeout(DELIVERY_TIMEOUT);
    for (name, value) in &hook.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &hook.body {
        request = request.json(&render_body(body, position_seconds, paused));
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!("webhook delivered: {}", hook.url);
        }
        Ok(response) => {
            tracing::warn!("webhook {} answered {}", hook.url, response.status());
        }
        Err(e) => {
            tracing::warn!("webhook {} failed: {}", hook.url, e);
        }
    }
}

/// Detach delivery from the caller entirely.
pub fn spawn_delivery(
    client: reqwest::Client,
    hook: WebhookDescriptor,
    position_seconds: f64,
    paused: bool,
) {
    tokio::spawn(async move {
        deliver(&client, &hook, position_seconds, paused).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_substitutes_tokens_as_literal_strings() {
        let template = json!({
            "PositionTicks": "${positionTicks}",
            "IsPaused": "${isPaused}",
            "ItemId": "abc123"
        });
        let rendered = render_body(&template, 125.5, false);
        assert_eq!(rendered["PositionTicks"], json!("1255000000"));
        assert_eq!(rendered["IsPaused"], json!("false"));
        assert_eq!(rendered["ItemId"], json!("abc123"));
    }

    #[test]
    fn test_render_non_string_values_pass_through() {
        let template = json!({"count": 3, "nested": {"flag": true, "p": "${isPaused}"}});
        let rendered = render_body(&template, 0.0, true);
        assert_eq!(rendered["count"], json!(3));
        assert_eq!(rendered["nested"]["flag"], json!(true));
        assert_eq!(rendered["nested"]["p"], json!("true"));
    }

    #[test]
    fn test_render_arrays() {
        let template = json!(["${positionTicks}", 7]);
        let rendered = render_body(&template, 1.0, false);
        assert_eq!(rendered, json!(["10000000", 7]));
    }

    #[tokio::test]
    async fn test_delivery_posts_rendered_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut seen = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read until the JSON body (which ends the request) has arrived
            while !seen.ends_with(b"}") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&chunk[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&seen).to_string()
        });

        let hook = WebhookDescriptor {
            url: format!("http://{addr}/progress"),
            method: "POST".to_string(),
            headers: HashMap::from([("x-token".to_string(), "t".to_string())]),
            body: Some(json!({"PositionTicks": "${positionTicks}"})),
        };

        let client = reqwest::Client::new();
        deliver(&client, &hook, 30.0, false).await;

        let seen = server.await.unwrap();
        assert!(seen.starts_with("POST /progress"));
        assert!(seen.contains("x-token"));
        assert!(seen.contains("300000000"));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        // Nothing listens here; deliver must neither panic nor return an error.
        let hook = WebhookDescriptor {
            url: "http://127.0.0.1:1/unreachable".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            body: None,
        };
        let client = reqwest::Client::new();
        deliver(&client, &hook, 0.0, false).await;
    }
}
