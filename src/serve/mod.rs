//! Development server with live reload.
//!
//! Serves the output root over HTTP, accepts live-reload clients on a
//! WebSocket port and, with `serve.watch`, reruns tasks on source edits.

mod path;
mod response;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver};
use tiny_http::{Request, Server};

use crate::core::{is_shutdown, register_server};
use crate::embed::serve::LIVERELOAD_URL;
use crate::reload::{ReloadHub, start_ws_server};
use crate::task::TaskContext;
use crate::watch::SourceWatcher;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Request handler threads.
const REQUEST_THREADS: usize = 4;

/// Bind to `interface:base_port`, moving to the next port while taken.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Run the dev server until Ctrl+C.
///
/// With `serve.watch`, the WebSocket listener and the source watcher are
/// up before the first request is served.
pub fn run(ctx: &TaskContext) -> Result<()> {
    let serve = &ctx.config.serve;
    let root = ctx.config.dist().to_path_buf();

    let (server, addr) = bind_with_retry(serve.interface, serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    let mut ws_port = None;
    let mut watcher = None;
    if serve.watch {
        let hub = Arc::new(ReloadHub::new());
        let port = start_ws_server(&serve.interface.to_string(), serve.ws_port, Arc::clone(&hub))?;
        debug!("reload"; "ws://{}:{}", serve.interface, port);
        ws_port = Some(port);

        let watch_ctx = ctx.clone().with_notifier(hub);
        watcher = Some(spawn_watcher(watch_ctx, shutdown_rx)?);
    }

    log!("serve"; "http://{}", addr);
    run_request_loop(&server, root, ws_port)?;
    wait_for_shutdown(watcher);
    Ok(())
}

fn spawn_watcher(ctx: TaskContext, shutdown_rx: Receiver<()>) -> Result<JoinHandle<()>> {
    let watcher = SourceWatcher::new(ctx)?;
    thread::Builder::new()
        .name("runnel-watch".into())
        .spawn(move || watcher.run(shutdown_rx))
        .context("failed to spawn watcher thread")
}

fn run_request_loop(server: &Server, root: PathBuf, ws_port: Option<u16>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create request pool")?;
    let root = Arc::new(root);

    for request in server.incoming_requests() {
        let root = Arc::clone(&root);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &root, ws_port) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }
    Ok(())
}

fn handle_request(request: Request, root: &Path, ws_port: Option<u16>) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    debug!("serve"; "{} {}", request.method(), request.url());

    if let Some(port) = ws_port
        && request.url().split('?').next() == Some(LIVERELOAD_URL)
    {
        return response::respond_livereload_js(request, port);
    }

    match path::resolve_path(request.url(), root) {
        Some(path) => response::respond_file(request, &path, ws_port),
        None => response::respond_not_found(request, root, ws_port),
    }
}

/// Give the watcher up to two seconds to finish its current batch.
fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
