//! Message router
//!
//! Delivers rendered lines to registered clients. Targets are taken from
//! a registry snapshot, and each delivery is a non-blocking enqueue on the
//! target's outbox: a failed target is skipped and left for its own
//! session to clean up.

use tracing::{debug, warn};

use crate::client::ClientRecord;
use crate::connection::Outbox;
use crate::error::SendError;
use crate::registry::ClientRegistry;
use crate::types::ClientId;

/// Routes lines to the clients in a registry
#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: ClientRegistry,
}

impl MessageRouter {
    pub fn new(registry: ClientRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Deliver to every registered client
    ///
    /// Returns the number of clients the line was queued for.
    pub async fn broadcast(&self, text: &str) -> usize {
        let targets = self.registry.enumerate().await;
        deliver_all(targets.iter(), text)
    }

    /// Deliver to every registered client except `sender`
    pub async fn broadcast_except(&self, text: &str, sender: ClientId) -> usize {
        let targets = self.registry.enumerate().await;
        deliver_all(targets.iter().filter(|c| c.id != sender), text)
    }

    /// Deliver to one client
    ///
    /// Returns `false` if no client with that id is registered.
    pub async fn unicast(&self, text: &str, target: ClientId) -> bool {
        match self.registry.lookup(target).await {
            Some(client) => {
                deliver_one(&client, text);
                true
            }
            None => {
                debug!("Unicast target {} not registered", target);
                false
            }
        }
    }

    /// Write straight back to the requesting connection
    pub fn reply(&self, text: &str, to: &Outbox) {
        if let Err(e) = to.deliver(text) {
            debug!("Reply to {} dropped: {}", to.peer(), e);
        }
    }
}

fn deliver_all<'a>(targets: impl Iterator<Item = &'a ClientRecord>, text: &str) -> usize {
    targets.filter(|client| deliver_one(client, text)).count()
}

fn deliver_one(client: &ClientRecord, text: &str) -> bool {
    match client.send(text) {
        Ok(()) => true,
        Err(SendError::QueueFull) => {
            warn!("Dropping line for slow client {}", client.id);
            false
        }
        Err(SendError::ChannelClosed) => {
            debug!("Client {} connection already closed", client.id);
            false
        }
    }
}
