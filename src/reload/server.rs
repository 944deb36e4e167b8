//! WebSocket server for live reload.
//!
//! An acceptor thread performs the handshake and registers clients; a reader
//! thread polls them so closed connections are pruned even when nothing is
//! being broadcast.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::ReloadMessage;
use crate::core::is_shutdown;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of the acceptor and reader threads
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Shared handle to the live reload server.
pub type ReloadHandle = Arc<LiveReload>;

/// Connected browser clients and the port they connect to.
pub struct LiveReload {
    port: u16,
    clients: Clients,
}

impl LiveReload {
    /// Bind the WebSocket port (retrying successive ports) and start the
    /// acceptor and reader threads.
    pub fn start(interface: IpAddr, base_port: u16) -> Result<ReloadHandle> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));

        let accept_clients = Arc::clone(&clients);
        thread::spawn(move || accept_loop(&listener, &accept_clients));

        let reader_clients = Arc::clone(&clients);
        thread::spawn(move || client_reader_loop(&reader_clients));

        Ok(Arc::new(Self { port, clients }))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Ask every client to reload the page.
    pub fn reload_all(&self, reason: &str) {
        debug!("reload"; "full reload: {}", reason);
        self.broadcast(&ReloadMessage::reload(reason));
    }

    /// Ask every client to swap the given stylesheets.
    pub fn reload_css(&self, paths: &[String]) {
        debug!("reload"; "css: {}", paths.join(", "));
        self.broadcast(&ReloadMessage::css(paths.to_vec()));
    }

    /// Send to every client, dropping the ones that fail.
    fn broadcast(&self, msg: &ReloadMessage) {
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return;
        }

        let text = msg.to_json();
        clients.retain_mut(|ws| match ws.send(Message::Text(text.clone().into())) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        debug!("reload"; "broadcast to {} clients", clients.len());
    }
}

fn accept_loop(listener: &TcpListener, clients: &Clients) {
    while !is_shutdown() {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!("reload"; "client connected: {}", addr);
                if let Some(ws) = handshake(stream) {
                    clients.lock().push(ws);
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log!("reload"; "accept error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Blocking handshake, then non-blocking for polling reads.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let _ = stream.set_nonblocking(false);

    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            log!("reload"; "handshake failed: {}", e);
            return None;
        }
    };
    let _ = ws.get_ref().set_nonblocking(true);

    if let Err(e) = ws.send(Message::Text(ReloadMessage::connected().to_json().into())) {
        log!("reload"; "failed to send connected message: {}", e);
        return None;
    }
    Some(ws)
}

fn client_reader_loop(clients: &Clients) {
    while !is_shutdown() {
        thread::sleep(POLL_INTERVAL);

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        });
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    log!("reload"; "port {} in use, using {} instead", base_port, actual_port);
                }
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
