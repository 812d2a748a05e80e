//! Line-oriented TCP Chat Relay Library
//!
//! A chat room server built on tokio: every connected client gets a
//! unique id, plain lines are relayed to everyone else, and lines starting
//! with a backslash are commands.
//!
//! # Features
//! - Bounded client registry with monotonically assigned ids
//! - Chat broadcast to all other clients
//! - Rename (`\NAME`), private messages (`\PRIVATE`), client listing
//!   (`\ACTIVE`), `\PING`, `\HELP` and `\QUIT`
//! - Join / rename / leave announcements
//! - Rejection of connections beyond capacity
//!
//! # Architecture
//! One task per connection:
//! - The listener accepts, registers and spawns a session per client
//! - Each session reads its own lines and runs the command interpreter
//! - Each connection has a writer task draining a bounded line queue, so
//!   any session can deliver to any other without blocking on it
//! - The registry is the only shared state, guarded by one lock
//!
//! # Example
//! ```ignore
//! use chat_relay::{start_listener, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = start_listener(ServerConfig::default()).unwrap();
//!     println!("listening on {}", server.local_addr());
//!     server.wait().await.unwrap();
//! }
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod interpreter;
pub mod registry;
pub mod router;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::ClientRecord;
pub use codec::LineCodec;
pub use command::{Command, COMMAND_PREFIX};
pub use config::ServerConfig;
pub use connection::{Connection, Outbox};
pub use error::{AppError, CodecError, CommandError, ConfigError, RegistryError, SendError};
pub use handler::{run_session, SessionEnd};
pub use interpreter::{Flow, SessionContext};
pub use registry::ClientRegistry;
pub use router::MessageRouter;
pub use server::{start_listener, ChatServer, RunningServer};
pub use types::{ClientId, DisplayName, MAX_LINE_LEN, MAX_MESSAGE_LEN, MAX_NAME_LEN};
