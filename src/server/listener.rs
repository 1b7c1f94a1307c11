//! Stream server listener
//!
//! Accepts WebSocket subscribers on the fan-out port. Each connection is
//! registered once its handshake completes and removed when it closes; a
//! per-connection task drains the subscriber's frame queue into the socket.
//! Plain HTTP requests on the same port get the browser viewer page.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::viewer;

/// WebSocket fan-out server
///
/// Owns the listening socket and the subscriber registry it feeds. The
/// broadcaster holds a clone of the same registry.
pub struct StreamServer {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl StreamServer {
    /// Bind the listening socket with a fresh registry
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_registry(config, Arc::new(SubscriberRegistry::new())).await
    }

    /// Bind the listening socket, registering subscribers in `registry`
    pub async fn bind_with_registry(
        config: ServerConfig,
        registry: Arc<SubscriberRegistry>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let connection_semaphore = if config.max_subscribers > 0 {
            Some(Arc::new(Semaphore::new(config.max_subscribers)))
        } else {
            None
        };

        Ok(Self {
            config,
            listener,
            local_addr,
            registry,
            connection_semaphore,
        })
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept subscribers until `shutdown` fires
    ///
    /// On shutdown every subscriber is marked closed and its connection task
    /// is awaited before returning.
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(addr = %self.local_addr, "Stream server listening");

        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(socket, peer_addr, &shutdown, &tracker);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        tracker.close();
        self.registry.close_all().await;
        tracker.wait().await;

        tracing::info!(addr = %self.local_addr, "Stream server stopped");
        Ok(())
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        shutdown: &CancellationToken,
        tracker: &TaskTracker,
    ) {
        // Check subscriber limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Subscriber rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        tracing::debug!(peer = %peer_addr, "New connection");

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let shutdown = shutdown.clone();

        tracker.spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(socket, peer_addr, &config, &registry, &shutdown).await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Subscriber connection error");
            }

            tracing::debug!(peer = %peer_addr, "Connection closed");
        });
    }
}

/// Time allowed for a close frame to reach a subscriber that stopped reading
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// What a new connection turned out to be
enum Accepted {
    Subscriber(WebSocketStream<TcpStream>),
    Viewer(TcpStream, usize),
}

fn timed_out(what: &'static str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::TimedOut, what))
}

/// Tell viewer requests apart from upgrades, then run the WebSocket handshake
async fn accept(socket: TcpStream, serve_viewer: bool) -> Result<Accepted> {
    if serve_viewer {
        let head = viewer::peek_request_head(&socket).await?;
        if !viewer::is_websocket_upgrade(&head) {
            return Ok(Accepted::Viewer(socket, head.len()));
        }
    }

    Ok(Accepted::Subscriber(
        tokio_tungstenite::accept_async(socket).await?,
    ))
}

/// Run one connection from handshake to disconnect
async fn serve_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: &ServerConfig,
    registry: &SubscriberRegistry,
    shutdown: &CancellationToken,
) -> Result<()> {
    let accepted = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        accepted = tokio::time::timeout(config.handshake_timeout, accept(socket, config.viewer)) => {
            accepted.map_err(|_| timed_out("WebSocket handshake timed out"))??
        }
    };

    let ws = match accepted {
        Accepted::Subscriber(ws) => ws,
        Accepted::Viewer(socket, head_len) => {
            tracing::debug!(peer = %peer_addr, "Serving viewer page");
            return viewer::serve(socket, head_len, config.write_timeout).await;
        }
    };

    let (subscriber, mut frames) =
        Subscriber::channel(registry.next_id(), peer_addr, config.subscriber_queue);
    let subscriber = Arc::new(subscriber);
    registry.add(Arc::clone(&subscriber)).await;

    let (mut sink, mut incoming) = ws.split();

    let result = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            frame = frames.recv() => match frame {
                Some(frame) => {
                    // A subscriber that stops reading must not hold up shutdown
                    let sent = tokio::select! {
                        _ = shutdown.cancelled() => break Ok(()),
                        sent = tokio::time::timeout(
                            config.write_timeout,
                            sink.send(Message::Binary(frame)),
                        ) => sent,
                    };
                    match sent {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => break Err(Error::from(e)),
                        Err(_) => break Err(timed_out("subscriber write timed out")),
                    }
                }
                None => break Ok(()),
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {} // Subscribers have nothing to say
                Some(Err(e)) => break Err(Error::from(e)),
            },
        }
    };

    // Disconnect hook
    subscriber.mark_closed();
    registry.remove(subscriber.id()).await;
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;

    result
}
