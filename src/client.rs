//! Client record definition
//!
//! Represents a registered client: its identity, current display name,
//! and the outbound side of its connection.

use crate::connection::Outbox;
use crate::error::SendError;
use crate::types::{ClientId, DisplayName};

/// Connected client information
///
/// The unit stored in the registry. `id` never changes; `name` can be
/// replaced any number of times through the rename command.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Current display name (defaults to the id)
    pub name: DisplayName,
    /// Server → Client line queue
    pub outbox: Outbox,
}

impl ClientRecord {
    /// Create a new client record carrying the default name
    pub fn new(id: ClientId, outbox: Outbox) -> Self {
        Self {
            id,
            name: DisplayName::from_id(id),
            outbox,
        }
    }

    /// Queue a line for this client
    ///
    /// Returns an error if the client's queue is full or its connection
    /// has closed.
    pub fn send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.outbox.deliver(line)
    }

    /// Get the display name for this client
    pub fn display_name(&self) -> &str {
        self.name.as_str()
    }

    /// Replace the client's display name, returning the previous one
    pub fn rename(&mut self, name: DisplayName) -> DisplayName {
        std::mem::replace(&mut self.name, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn outbox() -> (Outbox, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (Outbox::new(tx, "127.0.0.1:4000".parse().unwrap()), rx)
    }

    #[test]
    fn test_client_creation() {
        let (outbox, _rx) = outbox();
        let client = ClientRecord::new(ClientId(3), outbox);

        assert_eq!(client.id, ClientId(3));
        assert_eq!(client.display_name(), "3");
    }

    #[test]
    fn test_client_rename_twice() {
        let (outbox, _rx) = outbox();
        let mut client = ClientRecord::new(ClientId(1), outbox);

        let old = client.rename(DisplayName::parse("bob").unwrap());
        assert_eq!(old.as_str(), "1");
        let old = client.rename(DisplayName::parse("carol").unwrap());
        assert_eq!(old.as_str(), "bob");
        assert_eq!(client.display_name(), "carol");
    }

    #[test]
    fn test_client_send() {
        let (outbox, mut rx) = outbox();
        let client = ClientRecord::new(ClientId(1), outbox);

        client.send("hello").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }
}
