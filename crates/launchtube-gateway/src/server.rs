//! Gateway server bootstrap.
//!
//! The server binds the first available port from a fixed candidate list;
//! injected page scripts probe the same list with `/api/1/ping` to find the
//! local instance.

use crate::routes;
use crate::state::SharedState;
use std::io;
use tokio::net::TcpListener;

pub const PORT_CANDIDATES: &[u16] = &[8765, 8766, 8767, 8768];

/// Bind the first free candidate port on loopback.
pub async fn bind_first_available() -> io::Result<(TcpListener, u16)> {
    for &port in PORT_CANDIDATES {
        match TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => tracing::debug!("port {} unavailable: {}", port, e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        "every candidate port is taken",
    ))
}

/// Serve the control-plane until the task is dropped or the listener fails.
pub async fn serve(state: SharedState, listener: TcpListener) -> io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("gateway listening on http://{}", addr);
    axum::serve(listener, routes::create_router(state)).await
}
