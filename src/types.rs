//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: server-assigned, monotonically increasing client identifier
//! - `DisplayName`: length-checked, mutable display name of a client
//!
//! Also holds the size bounds of the text protocol.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CommandError;

/// Maximum display name length in bytes
pub const MAX_NAME_LEN: usize = 32;

/// Maximum chat / private message length in bytes (longer text is truncated)
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Maximum inbound line length in bytes, terminator excluded
pub const MAX_LINE_LEN: usize = 8192;

/// Unique client identifier (newtype pattern)
///
/// Assigned by the listener in accept order. Never reused within the
/// lifetime of a server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(ClientId)
    }
}

/// Hands out fresh client ids, starting at 1
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> ClientId {
        ClientId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Display name of a client
///
/// Non-empty, at most [`MAX_NAME_LEN`] bytes. Defaults to the decimal
/// form of the client's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate a user-supplied name
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(CommandError::EmptyName);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(CommandError::NameTooLong { max: MAX_NAME_LEN });
        }
        Ok(Self(name.to_string()))
    }

    /// The default name for a freshly connected client
    pub fn from_id(id: ClientId) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cut `text` down to at most `max` bytes without splitting a character
pub fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
