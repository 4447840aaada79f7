//! WebSocket listener serving inbound sessions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use wirelink_core::{DefaultHandler, MessageHandler, RetryPolicy};
use wirelink_session::{Recv, Session};

/// Bound on draining in-flight connection tasks during `stop`.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handler slot shared with every connection task; swapped atomically.
type SharedHandler = Arc<RwLock<Arc<dyn MessageHandler>>>;

/// Listener error.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("bind failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepts inbound sessions and loop-dispatches their messages.
///
/// Every accepted connection gets its own [`Session`], keyed by a
/// connection id in a registry, so concurrent clients never share (or
/// overwrite) a transport handle. Replies go back on the connection the
/// message arrived on.
pub struct Listener {
    host: String,
    port: u16,
    handler: SharedHandler,
    shutdown: CancellationToken,
    bound: OnceLock<SocketAddr>,
    connections: Arc<tokio::sync::RwLock<HashMap<Uuid, SocketAddr>>>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Listener {
    /// Create a listener for `host:port` with the default handler.
    ///
    /// Port 0 binds an ephemeral port, observable via [`Self::local_addr`]
    /// once `start` has bound.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            handler: Arc::new(RwLock::new(Arc::new(DefaultHandler))),
            shutdown: CancellationToken::new(),
            bound: OnceLock::new(),
            connections: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Replace the default handler before starting.
    #[must_use]
    pub fn with_handler(self, handler: Arc<dyn MessageHandler>) -> Self {
        *self.handler.write().unwrap() = handler;
        self
    }

    /// Atomically swap the active handler.
    ///
    /// Takes effect starting with the next inbound message; messages
    /// already dispatched keep the handler they saw.
    pub fn set_handler(&self, handler: Arc<dyn MessageHandler>) {
        *self.handler.write().unwrap() = handler;
        tracing::info!("message handler swapped");
    }

    /// Address actually bound, once `start` has bound it.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    /// Number of currently served connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Bind and serve inbound connections until stopped.
    ///
    /// # Errors
    /// Returns an error only if the bind itself fails; per-connection
    /// failures are logged and never abort the accept loop.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let addr = format!("{}:{}", self.host, self.port);
        let tcp = TcpListener::bind(&addr).await?;
        let local = tcp.local_addr()?;
        let _ = self.bound.set(local);
        tracing::info!(%local, "listener started");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                accepted = tcp.accept() => match accepted {
                    Ok((stream, peer)) => self.accept_connection(stream, peer).await,
                    Err(err) => tracing::warn!(%err, "accept failed"),
                },
            }
        }

        tracing::info!(%local, "listener stopped accepting");
        Ok(())
    }

    /// Stop accepting, then await in-flight connection handling (bounded)
    /// and disconnect anything lingering.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        if !handles.is_empty() {
            tracing::info!(task_count = handles.len(), "draining in-flight connections");
            let drain = futures::future::join_all(handles);
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
                tracing::warn!("shutdown drain timed out, some connections were cut");
            }
        }

        self.connections.write().await.clear();
        tracing::info!("listener stopped");
    }

    async fn accept_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let conn_id = Uuid::new_v4();
        let handler = Arc::clone(&self.handler);
        let connections = Arc::clone(&self.connections);
        let token = self.shutdown.child_token();

        // Register before the handshake task runs so the registry never
        // lags behind a connection the peer already observes as live.
        self.connections.write().await.insert(conn_id, peer);

        let task = tokio::spawn(async move {
            serve_connection(stream, peer, conn_id, &handler, &token).await;
            connections.write().await.remove(&conn_id);
        });

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(task);
    }
}

/// Serve one accepted connection on its own session.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: Uuid,
    handler: &SharedHandler,
    token: &CancellationToken,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::warn!(%peer, %err, "websocket handshake failed");
            return;
        }
    };

    let mut session = Session::new(RetryPolicy::once());
    session.attach(Box::new(ws)).await;
    tracing::info!(%peer, %conn_id, "connection accepted");

    loop {
        let recv = tokio::select! {
            () = token.cancelled() => break,
            recv = session.receive(None) => recv,
        };

        match recv {
            Recv::Message(message) => {
                tracing::debug!(%peer, %conn_id, %message, "received message");
                let current = { Arc::clone(&handler.read().unwrap()) };
                match current.handle(&message) {
                    Ok(reply) => session.send(reply, None).await,
                    Err(err) => {
                        session.handle_error(&err);
                        break;
                    }
                }
            }
            Recv::TimedOut => {}
            Recv::Closed | Recv::Failed(_) => break,
        }
    }

    session.disconnect().await;
    tracing::info!(%peer, %conn_id, "connection closed");
}
