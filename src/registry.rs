//! Client registry
//!
//! The single piece of shared mutable state in the server: a bounded
//! table of live client records. Every operation takes the one lock that
//! guards the whole table, so adds, removes, renames and enumerations are
//! serialized against each other. Enumeration hands out a snapshot; the
//! caller delivers to it after the lock has been released.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::ClientRecord;
use crate::error::RegistryError;
use crate::types::{ClientId, DisplayName};

/// Fixed-capacity slot table
#[derive(Debug)]
struct Slots {
    slots: Vec<Option<ClientRecord>>,
    live: usize,
}

impl Slots {
    fn position(&self, id: ClientId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|c| c.id == id))
    }
}

/// Shared handle to the registry
///
/// Clones refer to the same table.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Slots>>,
    capacity: usize,
}

impl ClientRegistry {
    /// Create an empty registry holding at most `capacity` clients
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Slots {
                slots: (0..capacity).map(|_| None).collect(),
                live: 0,
            })),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a record into the first free slot
    ///
    /// Returns the slot index. Fails when every slot is taken or a live
    /// record already has the same id.
    pub async fn add(&self, record: ClientRecord) -> Result<usize, RegistryError> {
        let mut table = self.inner.lock().await;

        if table.position(record.id).is_some() {
            return Err(RegistryError::DuplicateId(record.id));
        }

        let Some(index) = table.slots.iter().position(Option::is_none) else {
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        };

        debug!("Client {} stored in slot {}", record.id, index);
        table.slots[index] = Some(record);
        table.live += 1;
        Ok(index)
    }

    /// Remove the record with this id
    ///
    /// Removing an absent id is a no-op, so teardown may run more than once.
    pub async fn remove(&self, id: ClientId) -> Option<ClientRecord> {
        let mut table = self.inner.lock().await;
        let index = table.position(id)?;
        let record = table.slots[index].take();
        table.live -= 1;
        record
    }

    /// Look up a record by id
    pub async fn lookup(&self, id: ClientId) -> Option<ClientRecord> {
        let table = self.inner.lock().await;
        let index = table.position(id)?;
        table.slots[index].clone()
    }

    /// Replace a client's display name, returning the old one
    ///
    /// `None` if the client is no longer registered.
    pub async fn rename(&self, id: ClientId, name: DisplayName) -> Option<DisplayName> {
        let mut table = self.inner.lock().await;
        let index = table.position(id)?;
        table.slots[index].as_mut().map(|c| c.rename(name))
    }

    /// Snapshot of every live record, in slot order
    pub async fn enumerate(&self) -> Vec<ClientRecord> {
        let table = self.inner.lock().await;
        table.slots.iter().flatten().cloned().collect()
    }

    /// Number of live records
    pub async fn len(&self) -> usize {
        self.inner.lock().await.live
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
