//! Connection wrapper
//!
//! Wraps one accepted TCP stream. The read half stays with the session
//! that owns the connection; the write half is driven by a dedicated
//! writer task fed through a bounded queue, the [`Outbox`].
//!
//! Any number of tasks may hold an `Outbox` clone and queue lines at the
//! same time. Each queued line is written as one frame, so lines from
//! concurrent broadcasts never interleave.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::error::{CodecError, SendError};

/// How long `close` waits for queued lines to reach a slow peer
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Sending side of a connection's outbound queue
///
/// Cheap to clone. Sending never waits: a full queue or a closed
/// connection is reported as a [`SendError`].
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<String>,
    peer: SocketAddr,
}

impl Outbox {
    pub fn new(sender: mpsc::Sender<String>, peer: SocketAddr) -> Self {
        Self { sender, peer }
    }

    /// Queue one line (without terminator) for delivery
    pub fn deliver(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender.try_send(line.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Remote address of the connection, for logging
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// One accepted client connection
///
/// Owned exclusively by its session and closed exactly once via
/// [`Connection::close`].
pub struct Connection {
    peer: SocketAddr,
    reader: FramedRead<OwnedReadHalf, LineCodec>,
    outbox: Outbox,
    close_tx: oneshot::Sender<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Split the stream and start its writer task
    pub fn new(stream: TcpStream, peer: SocketAddr, outbound_buffer: usize) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (line_tx, line_rx) = mpsc::channel(outbound_buffer.max(1));
        let (close_tx, close_rx) = oneshot::channel();

        let sink = FramedWrite::new(write_half, LineCodec::new());
        let writer = tokio::spawn(write_loop(sink, line_rx, close_rx, peer));

        Self {
            peer,
            reader: FramedRead::new(read_half, LineCodec::new()),
            outbox: Outbox::new(line_tx, peer),
            close_tx,
            writer,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Wait for the next inbound line
    ///
    /// `None` means the peer closed the stream.
    pub async fn next_line(&mut self) -> Option<Result<String, CodecError>> {
        self.reader.next().await
    }

    /// Flush lines already queued, then shut the socket down
    ///
    /// A peer that stops reading gets [`CLOSE_GRACE`] to drain; after that
    /// the writer is aborted and pending lines are lost.
    pub async fn close(self) {
        self.close_within(CLOSE_GRACE).await
    }

    /// [`Connection::close`] with an explicit drain limit
    pub async fn close_within(self, grace: Duration) {
        let Connection {
            peer,
            reader,
            outbox,
            close_tx,
            mut writer,
        } = self;

        drop(outbox);
        let _ = close_tx.send(());
        match tokio::time::timeout(grace, &mut writer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Writer task for {} ended abnormally: {}", peer, e),
            Err(_) => {
                warn!("Peer {} not draining, dropping unsent lines", peer);
                writer.abort();
            }
        }
        drop(reader);
        debug!("Connection {} closed", peer);
    }
}

/// Write queued lines until the connection is closed or the peer goes away
async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, LineCodec>,
    mut lines: mpsc::Receiver<String>,
    mut close_rx: oneshot::Receiver<()>,
    peer: SocketAddr,
) {
    loop {
        tokio::select! {
            biased;

            line = lines.recv() => {
                let Some(line) = line else { break };
                if let Err(e) = sink.send(line).await {
                    debug!("Write to {} failed: {}", peer, e);
                    return;
                }
            }
            _ = &mut close_rx => {
                while let Ok(line) = lines.try_recv() {
                    if sink.feed(line).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = SinkExt::<String>::close(&mut sink).await {
        debug!("Shutdown of {} failed: {}", peer, e);
    }
}
