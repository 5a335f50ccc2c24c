//! Live reload for the development server.
//!
//! Tasks report written outputs as [`Notification`]s through the
//! [`Notifier`] in their context. The [`ReloadHub`] turns them into
//! [`ReloadMessage`]s and broadcasts them to every connected browser.
//!
//! ```text
//! task --Notification--> ReloadHub --ReloadMessage--> WebSocket clients
//! ```

pub mod message;
mod server;

pub use message::ReloadMessage;
pub use server::start_ws_server;

use std::net::TcpStream;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::debug;
use crate::task::TaskId;

/// Outputs written by one task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub task: TaskId,
    /// URL paths of the changed outputs, e.g. `/css/index.css`.
    pub paths: Vec<String>,
    /// Collapse to a single reload for the whole run.
    pub once: bool,
    /// Swap stylesheets in place instead of reloading.
    pub inject: bool,
}

/// Receiver of task output notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, note: Notification);
}

/// Notifier for builds without a server.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _note: Notification) {}
}

/// Messages a notification turns into.
///
/// - `once`: one reload
/// - `inject`: one `css` message per stylesheet (maps are ignored)
/// - otherwise: one reload per path
pub fn messages_for(note: &Notification) -> Vec<ReloadMessage> {
    if note.paths.is_empty() {
        return Vec::new();
    }
    if note.once {
        return vec![ReloadMessage::reload(None)];
    }
    if note.inject {
        return note
            .paths
            .iter()
            .filter(|p| p.ends_with(".css"))
            .map(ReloadMessage::css)
            .collect();
    }
    note.paths
        .iter()
        .map(|p| ReloadMessage::reload(Some(p.clone())))
        .collect()
}

/// Connected browsers.
#[derive(Default)]
pub struct ReloadHub {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the WebSocket handshake and register the client.
    pub fn add_client(&self, stream: TcpStream) {
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                let hello = ReloadMessage::connected().to_json();
                if let Err(e) = ws.send(Message::Text(hello.into())) {
                    debug!("reload"; "failed to greet client: {}", e);
                    return;
                }
                // Reads are polled by `drain_clients`
                let _ = ws.get_ref().set_nonblocking(true);

                let mut clients = self.clients.lock();
                clients.push(ws);
                debug!("reload"; "client connected (total: {})", clients.len());
            }
            Err(e) => debug!("reload"; "handshake failed: {}", e),
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send to all clients, dropping the ones that fail.
    pub fn broadcast(&self, msg: &ReloadMessage) {
        let text = msg.to_json();
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            return;
        }
        clients.retain_mut(|ws| match ws.send(Message::Text(text.clone().into())) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client dropped: {}", e);
                false
            }
        });
        debug!("reload"; "sent {} to {} clients", text, clients.len());
    }

    /// Read pending frames and remove closed connections.
    pub fn drain_clients(&self) {
        self.clients.lock().retain_mut(|ws| loop {
            match ws.read() {
                Ok(Message::Close(_)) => break false,
                Ok(_) => continue,
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    break true;
                }
                Err(_) => break false,
            }
        });
    }
}

impl Notifier for ReloadHub {
    fn notify(&self, note: Notification) {
        for msg in messages_for(&note) {
            self.broadcast(&msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(task: TaskId, paths: &[&str]) -> Notification {
        Notification {
            task,
            paths: paths.iter().map(|p| p.to_string()).collect(),
            once: task.notify_once(),
            inject: task == TaskId::Style,
        }
    }

    #[test]
    fn test_once_collapses() {
        let msgs = messages_for(&note(TaskId::Img, &["/img/a.png", "/img/b.png"]));
        assert_eq!(msgs, vec![ReloadMessage::reload(None)]);
    }

    #[test]
    fn test_style_injects_css_only() {
        let msgs = messages_for(&note(
            TaskId::Style,
            &["/css/index.css", "/maps/index.css.map"],
        ));
        assert_eq!(msgs, vec![ReloadMessage::css("/css/index.css")]);
    }

    #[test]
    fn test_reload_per_path() {
        let msgs = messages_for(&note(TaskId::Html, &["/index.html", "/about.html"]));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1], ReloadMessage::reload(Some("/about.html".into())));
    }

    #[test]
    fn test_empty_notification() {
        assert!(messages_for(&note(TaskId::Copy, &[])).is_empty());
    }

    #[test]
    fn test_hub_without_clients() {
        let hub = ReloadHub::new();
        hub.notify(note(TaskId::Html, &["/index.html"]));
        assert_eq!(hub.client_count(), 0);
    }
}
