//! Session handler
//!
//! Drives one registered connection: read a line, hand it to the
//! interpreter, repeat. End of stream, a read error, or `\QUIT` all lead
//! to the same teardown: leave the registry, announce the departure,
//! close the connection.

use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::interpreter::{Flow, SessionContext};

/// Why a session stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed the stream
    Eof,
    /// Client sent `\QUIT`
    Quit,
    /// Read failed; handled like end of stream
    ReadError,
}

/// Run a session to completion
///
/// The client must already be in the registry. Returns once the
/// connection has been closed.
pub async fn run_session(ctx: SessionContext, mut connection: Connection) -> SessionEnd {
    debug!("Session {} active ({})", ctx.id, connection.peer_addr());

    let end = loop {
        match connection.next_line().await {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if ctx.handle_line(&line).await == Flow::Quit {
                    break SessionEnd::Quit;
                }
            }
            Some(Err(e)) => {
                warn!("Read error for client {}: {}", ctx.id, e);
                break SessionEnd::ReadError;
            }
            None => break SessionEnd::Eof,
        }
    };

    teardown(&ctx).await;
    connection.close().await;

    info!("Client {} disconnected ({:?})", ctx.id, end);
    end
}

/// Remove the client and tell everyone else it left
///
/// Safe to call more than once; only the first call announces.
pub async fn teardown(ctx: &SessionContext) {
    let Some(record) = ctx.registry.remove(ctx.id).await else {
        debug!("Client {} already removed", ctx.id);
        return;
    };

    let delivered = ctx
        .router
        .broadcast(&format!("{} left", record.display_name()))
        .await;
    debug!(
        "Departure of {} announced to {} clients, {} remaining",
        ctx.id,
        delivered,
        ctx.registry.len().await
    );
}
