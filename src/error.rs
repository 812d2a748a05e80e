//! Error types for the chat relay
//!
//! Defines bootstrap errors, registry/delivery errors, protocol errors
//! reported back to clients, and codec/config errors.
//! Uses thiserror for ergonomic error definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level (bootstrap) errors
///
/// All of these are fatal: they happen before any connection is accepted.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not create the listening socket
    #[error("cannot create socket: {0}")]
    Socket(#[source] std::io::Error),

    /// Could not bind the listening socket
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Could not put the socket into listening state
    #[error("cannot listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every slot is taken
    #[error("registry full ({capacity} clients)")]
    Full { capacity: usize },

    /// A live record already carries this id
    #[error("client {0} already registered")]
    DuplicateId(crate::types::ClientId),
}

/// Message send errors
///
/// Occurs when a line cannot be queued for a client's connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The connection's writer has gone away
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its queue fast enough
    #[error("Outbound queue full")]
    QueueFull,
}

/// Protocol errors
///
/// The Display text is sent back verbatim to the issuing client;
/// the session continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("name too long (max {max} bytes)")]
    NameTooLong { max: usize },

    #[error("reference required")]
    MissingReference,

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("message required")]
    MissingMessage,
}

/// Line codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Peer sent more than `max` bytes without a line terminator
    #[error("line exceeds maximum length ({max} bytes)")]
    LineTooLong { max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid client capacity: {0}")]
    InvalidMaxClients(String),

    #[error("invalid host address: {0}")]
    InvalidHost(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("cannot read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
