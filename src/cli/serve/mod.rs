//! Development server with live reload support.
//!
//! [`DevServer`] is a session object: starting it binds the HTTP and
//! WebSocket ports and returns a handle the watch loop uses to signal
//! browsers. It serves the project root as-is; HTML gets the live reload
//! script injected.

mod content;
mod lifecycle;
mod path;
mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use rayon::ThreadPool;
use tiny_http::{Request, Server};

use crate::config::ProjectConfig;
use crate::core::{is_shutdown, register_server};
use crate::embed::serve::LIVERELOAD_URL;
use crate::reload::{LiveReload, ReloadHandle};
use crate::{debug, log};

/// Threads answering HTTP requests
const REQUEST_THREADS: usize = 4;

/// A running development server.
pub struct DevServer {
    addr: SocketAddr,
    reload: ReloadHandle,
    server: Arc<Server>,
    request_loop: Option<JoinHandle<()>>,
}

impl DevServer {
    /// Bind both ports and start serving the project root.
    pub fn start(config: &ProjectConfig) -> Result<Self> {
        let reload = LiveReload::start(config.serve.interface, config.serve.livereload_port)
            .context("failed to start live reload server")?;
        let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
        let server = Arc::new(server);
        register_server(Arc::clone(&server));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .build()
            .context("failed to create request thread pool")?;

        let root = config.get_root().to_path_buf();
        let ws_port = reload.port();
        let loop_server = Arc::clone(&server);
        let request_loop =
            thread::spawn(move || run_request_loop(&loop_server, &pool, root, ws_port));

        debug!("reload"; "ws://{}:{}", addr.ip(), ws_port);

        Ok(Self {
            addr,
            reload,
            server,
            request_loop: Some(request_loop),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for stages and subscriptions that signal browsers.
    pub fn reload_handle(&self) -> ReloadHandle {
        Arc::clone(&self.reload)
    }

    /// Stop accepting requests and wait for the request loop to end.
    pub fn stop(mut self) {
        self.server.unblock();
        if let Some(handle) = self.request_loop.take() {
            let _ = handle.join();
        }
    }
}

fn run_request_loop(server: &Server, pool: &ThreadPool, root: PathBuf, ws_port: u16) {
    let root = Arc::new(root);
    for request in server.incoming_requests() {
        let root = Arc::clone(&root);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &root, ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, ws_port: u16) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    if path::normalize_url(request.url()) == LIVERELOAD_URL.trim_start_matches('/') {
        return response::respond_livereload_js(request, ws_port);
    }

    match path::resolve_path(request.url(), root) {
        Some(path) => response::respond_file(request, &path),
        None => {
            debug!("serve"; "404 {}", request.url());
            response::respond_not_found(request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServeConfig;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn get(addr: SocketAddr, url: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {url} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn start(dir: &TempDir) -> DevServer {
        let mut config = ProjectConfig::for_root(dir.path());
        config.serve = ServeConfig {
            port: 0,
            livereload_port: 0,
            ..ServeConfig::default()
        };
        DevServer::start(&config).unwrap()
    }

    #[test]
    fn test_serves_html_with_script() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        let server = start(&dir);

        let response = get(server.addr(), "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#"hi<script src="/__livereload.js"></script></body>"#));

        let script = get(server.addr(), "/__livereload.js");
        assert!(script.contains(&format!("var port = {};", server.reload_handle().port())));

        let reload = server.reload_handle();
        reload.reload_all("template changed");
        reload.reload_css(&["/assets/css/style.css".into()]);
        server.stop();
    }

    #[test]
    fn test_missing_and_traversal_are_404() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let mut config = ProjectConfig::for_root(&dir.path().join("site"));
        config.serve.port = 0;
        config.serve.livereload_port = 0;
        let server = DevServer::start(&config).unwrap();

        assert!(get(server.addr(), "/nope.html").starts_with("HTTP/1.1 404"));
        assert!(get(server.addr(), "/../secret.txt").starts_with("HTTP/1.1 404"));
        server.stop();
    }
}
