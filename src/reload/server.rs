//! WebSocket listener for live-reload clients.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::ReloadHub;
use crate::core::is_shutdown;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Start accepting live-reload clients on `interface:base_port`.
///
/// Returns the bound port, which may differ from `base_port` when that one
/// is taken.
pub fn start_ws_server(interface: &str, base_port: u16, hub: Arc<ReloadHub>) -> Result<u16> {
    let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        while !is_shutdown() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!("reload"; "client connected: {}", addr);
                    // Handshake needs a blocking socket
                    let _ = stream.set_nonblocking(false);
                    hub.add_client(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    hub.drain_clients();
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    log!("reload"; "accept error: {}", e);
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    });

    Ok(port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: &str, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_bind_port_skips_taken() {
        let (held, port) = try_bind_port("127.0.0.1", 0, 1).unwrap();
        let (_next, next_port) = try_bind_port("127.0.0.1", port, 3).unwrap();
        assert_ne!(next_port, port);
        drop(held);
    }
}
