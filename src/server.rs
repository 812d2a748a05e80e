//! Listener
//!
//! Accepts connections, assigns each a fresh id, registers it and spawns
//! its session. Connections arriving while the registry is full are told
//! so and closed; no session is created for them. The accept loop never
//! waits on a session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::client::ClientRecord;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::AppError;
use crate::handler::run_session;
use crate::interpreter::SessionContext;
use crate::registry::ClientRegistry;
use crate::router::MessageRouter;
use crate::types::IdAllocator;

/// Line sent to a connection rejected at capacity
pub const SERVER_FULL: &str = "server is full";

/// First pause after a failed accept; doubles per consecutive failure
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before retrying after `failures` consecutive accept errors
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// The chat server: listening socket plus shared client state
pub struct ChatServer {
    listener: TcpListener,
    registry: ClientRegistry,
    router: MessageRouter,
    ids: IdAllocator,
    config: Arc<ServerConfig>,
}

impl ChatServer {
    /// Bind and listen according to `config`
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: ServerConfig) -> Result<Self, AppError> {
        config.validate()?;
        let addr = config.bind_addr()?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(AppError::Socket)?;
        socket.set_reuseaddr(true).map_err(AppError::Socket)?;
        socket
            .bind(addr)
            .map_err(|source| AppError::Bind { addr, source })?;
        let listener = socket
            .listen(config.backlog)
            .map_err(|source| AppError::Listen { addr, source })?;

        let registry = ClientRegistry::new(config.max_clients);
        Ok(Self {
            listener,
            router: MessageRouter::new(registry.clone()),
            registry,
            ids: IdAllocator::new(),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Run the accept loop forever
    pub async fn run(self) {
        info!(
            "Chat relay accepting on {} (max {} clients)",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            self.config.max_clients
        );

        let mut failures: u32 = 0;
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    failures = 0;
                    self.admit(stream, peer).await;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let pause = accept_backoff(failures);
                    error!(
                        "Failed to accept connection: {} (retrying in {:?})",
                        e, pause
                    );
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    /// Register a new connection and start its session, or reject it
    async fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let connection = Connection::new(stream, peer, self.config.outbound_buffer);
        let id = self.ids.next_id();
        let record = ClientRecord::new(id, connection.outbox().clone());
        let name = record.display_name().to_string();

        match self.registry.add(record).await {
            Ok(slot) => {
                info!("Client {} connected from {} (slot {})", id, peer, slot);
                self.router.broadcast(&format!("{} joined", name)).await;

                let outbox = connection.outbox().clone();
                let ctx = SessionContext::new(id, self.router.clone(), outbox);
                tokio::spawn(run_session(ctx, connection));
            }
            Err(e) => {
                warn!("Rejecting {} from {}: {}", id, peer, e);
                tokio::spawn(reject(connection));
            }
        }
    }
}

async fn reject(connection: Connection) {
    let _ = connection.outbox().deliver(SERVER_FULL);
    connection.close().await;
}

/// A listener running in the background
pub struct RunningServer {
    local_addr: SocketAddr,
    registry: ClientRegistry,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Stop accepting; existing sessions keep running
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the accept loop, which only ends if aborted
    pub async fn wait(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Bind, listen and start accepting in a background task
pub fn start_listener(config: ServerConfig) -> Result<RunningServer, AppError> {
    let server = ChatServer::bind(config)?;
    let local_addr = server.local_addr()?;
    let registry = server.registry().clone();
    let task = tokio::spawn(server.run());
    Ok(RunningServer {
        local_addr,
        registry,
        task,
    })
}
