//! IPC Server
//!
//! Accepts newline-delimited JSON requests on the daemon socket and answers
//! each with a single response line.

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{socket_path, IpcRequest, IpcResponse};

/// Max bytes read per request
const MAX_REQUEST_BYTES: u64 = 4096;
const ACCEPT_POLL: Duration = Duration::from_millis(100);
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

type Handler = Arc<dyn Fn(IpcRequest) -> IpcResponse + Send + Sync>;

pub struct IpcServer {
    path: PathBuf,
    running: Arc<AtomicBool>,
    accept_thread: Option<thread::JoinHandle<()>>,
}

impl IpcServer {
    /// Server on the per-user default socket
    pub fn new() -> Self {
        Self::at(socket_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            running: Arc::new(AtomicBool::new(false)),
            accept_thread: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bind the socket and serve on a background thread; `handler` answers
    /// each request
    pub fn start<F>(&mut self, handler: F) -> Result<()>
    where
        F: Fn(IpcRequest) -> IpcResponse + Send + Sync + 'static,
    {
        let listener = bind_private(&self.path)?;
        listener.set_nonblocking(true)?;

        self.running.store(true, Ordering::SeqCst);
        info!("🔌 IPC server listening on {:?}", self.path);

        let running = self.running.clone();
        let path = self.path.clone();
        let handler: Handler = Arc::new(handler);
        self.accept_thread = Some(thread::spawn(move || {
            accept_loop(&listener, &running, &handler);
            let _ = fs::remove_file(&path);
            info!("🔌 IPC server stopped");
        }));
        Ok(())
    }

    /// Stop accepting and remove the socket
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for IpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bind `path`, replacing a stale socket, readable by the owner only
fn bind_private(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        debug!("Removing stale socket {:?}", path);
        let _ = fs::remove_file(path);
    }

    let listener =
        UnixListener::bind(path).with_context(|| format!("cannot bind {}", path.display()))?;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        let _ = fs::remove_file(path);
        return Err(e).context("cannot restrict IPC socket permissions");
    }
    debug!("🔒 IPC socket permissions set to 0600");

    Ok(listener)
}

fn accept_loop(listener: &UnixListener, running: &AtomicBool, handler: &Handler) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                let handler = handler.clone();
                thread::spawn(move || {
                    if let Err(e) = serve_client(stream, handler.as_ref()) {
                        warn!("⚠️ IPC client error: {:#}", e);
                    }
                });
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!("⚠️ IPC accept error: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Read one request line and write one response line
fn serve_client(
    mut stream: UnixStream,
    handler: &(dyn Fn(IpcRequest) -> IpcResponse + Send + Sync),
) -> Result<()> {
    // Accepted sockets may inherit non-blocking mode
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;

    let mut line = String::new();
    BufReader::new(stream.try_clone()?)
        .take(MAX_REQUEST_BYTES)
        .read_line(&mut line)?;

    if line.is_empty() {
        return Ok(());
    }
    if !line.ends_with('\n') && line.len() as u64 >= MAX_REQUEST_BYTES {
        return Err(anyhow::anyhow!(
            "request exceeds {} bytes",
            MAX_REQUEST_BYTES
        ));
    }

    let request: IpcRequest =
        serde_json::from_str(line.trim()).context("malformed IPC request")?;
    debug!("📨 IPC request: {:?}", request);

    let response = handler(request);
    let mut reply = serde_json::to_string(&response)?;
    reply.push('\n');
    stream.write_all(reply.as_bytes())?;
    Ok(())
}
