//! Line-delimited JSON control channel to the player process.
//!
//! mpv exposes `--input-ipc-server` as a Unix domain socket (or a named pipe
//! on Windows) speaking newline-delimited JSON: `{"command": [...],
//! "request_id": N}` in, `{"request_id": N, "data": ..., "error": ...}` out.
//! The player also emits unsolicited event lines with no `request_id`; the
//! correlator skips those.
//!
//! A fresh connection is opened per exchange. The player is slow to bind its
//! endpoint right after launch, and a short-lived connection per poll tick
//! tolerates that without reconnect bookkeeping.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize)]
pub struct IpcRequest {
    pub command: Vec<Value>,
    pub request_id: u64,
}

impl IpcRequest {
    pub fn get_property(request_id: u64, name: &str) -> Self {
        Self {
            command: vec![Value::from("get_property"), Value::from(name)],
            request_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpcResponse {
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl IpcResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.error.as_deref(), None | Some("success"))
    }
}

/// A local control channel to the player process.
///
/// Implementations differ only in how the socket is reached; the wire format
/// and correlation logic are shared.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Value passed to the player's `--input-ipc-server` flag.
    fn endpoint(&self) -> String;

    /// Open one connection, send every request, and collect the correlated
    /// replies. Requests whose reply does not arrive before the deadline are
    /// simply absent from the result.
    async fn exchange(&self, requests: &[IpcRequest]) -> Result<Vec<IpcResponse>>;
}

/// Select the platform's channel with its conventional endpoint.
pub fn platform_default() -> Box<dyn ControlChannel> {
    #[cfg(unix)]
    {
        Box::new(UnixSocketChannel::new(
            PathBuf::from("/tmp/launchtube-mpv.sock"),
            DEFAULT_TIMEOUT,
        ))
    }
    #[cfg(windows)]
    {
        Box::new(NamedPipeChannel::new(
            r"\\.\pipe\launchtube-mpv".to_string(),
            DEFAULT_TIMEOUT,
        ))
    }
}

async fn exchange_over_stream<S>(stream: S, requests: &[IpcRequest]) -> Result<Vec<IpcResponse>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);

    let mut wanted: HashSet<u64> = HashSet::new();
    for request in requests {
        wanted.insert(request.request_id);
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        write_half.write_all(&line).await?;
    }
    write_half.flush().await?;

    let mut responses = Vec::with_capacity(requests.len());
    let mut lines = BufReader::new(read_half).lines();
    while !wanted.is_empty() {
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let response: IpcResponse = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("ipc: skipping unparseable line: {}", e);
                continue;
            }
        };
        match response.request_id {
            Some(id) if wanted.remove(&id) => responses.push(response),
            // Unsolicited player events carry no request_id
            _ => continue,
        }
    }
    Ok(responses)
}

#[cfg(unix)]
pub struct UnixSocketChannel {
    path: PathBuf,
    timeout: Duration,
}

#[cfg(unix)]
impl UnixSocketChannel {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }
}

#[cfg(unix)]
#[async_trait]
impl ControlChannel for UnixSocketChannel {
    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    async fn exchange(&self, requests: &[IpcRequest]) -> Result<Vec<IpcResponse>> {
        let exchange = async {
            let stream = tokio::net::UnixStream::connect(&self.path).await?;
            exchange_over_stream(stream, requests).await
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::Protocol(format!("ipc timeout on {}", self.endpoint())))?
    }
}

#[cfg(windows)]
pub struct NamedPipeChannel {
    name: String,
    timeout: Duration,
}

#[cfg(windows)]
impl NamedPipeChannel {
    pub fn new(name: String, timeout: Duration) -> Self {
        Self { name, timeout }
    }
}

#[cfg(windows)]
#[async_trait]
impl ControlChannel for NamedPipeChannel {
    fn endpoint(&self) -> String {
        self.name.clone()
    }

    async fn exchange(&self, requests: &[IpcRequest]) -> Result<Vec<IpcResponse>> {
        use tokio::net::windows::named_pipe::ClientOptions;
        let exchange = async {
            let stream = ClientOptions::new().open(&self.name)?;
            exchange_over_stream(stream, requests).await
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::Protocol(format!("ipc timeout on {}", self.endpoint())))?
    }
}
