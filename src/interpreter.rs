//! Command interpreter
//!
//! Executes one parsed line on behalf of a session: mutates the issuing
//! client's record, routes messages, or ends the session. Runs entirely
//! in the issuing session's task and never waits on another session.

use tracing::{debug, info};

use crate::command::{Command, HELP_TEXT};
use crate::connection::Outbox;
use crate::registry::ClientRegistry;
use crate::router::MessageRouter;
use crate::types::{ClientId, DisplayName};

/// What the session should do after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything a session needs to execute commands
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: ClientId,
    pub registry: ClientRegistry,
    pub router: MessageRouter,
    /// The session's own connection, for self-replies
    pub outbox: Outbox,
}

impl SessionContext {
    pub fn new(id: ClientId, router: MessageRouter, outbox: Outbox) -> Self {
        Self {
            id,
            registry: router.registry().clone(),
            router,
            outbox,
        }
    }

    /// Parse and execute one trimmed, non-empty line
    pub async fn handle_line(&self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                debug!("Client {} protocol error: {}", self.id, e);
                self.reply(&e.to_string());
                Flow::Continue
            }
        }
    }

    /// Execute a parsed command
    pub async fn execute(&self, command: Command) -> Flow {
        match command {
            Command::Chat(text) => {
                let line = format!("{}: {}", self.current_name().await, text);
                let delivered = self.router.broadcast_except(&line, self.id).await;
                debug!("Chat from {} delivered to {} clients", self.id, delivered);
            }
            Command::Rename(name) => self.rename(name).await,
            Command::Quit => {
                debug!("Client {} requested quit", self.id);
                return Flow::Quit;
            }
            Command::Ping => self.reply("PONG"),
            Command::Private { target, text } => {
                let line = format!("[PM][{}] {}", self.current_name().await, text);
                if !self.router.unicast(&line, target).await {
                    self.reply(&format!("no client with id {}", target));
                }
            }
            Command::ListActive => {
                let clients = self.registry.enumerate().await;
                let mut lines = Vec::with_capacity(clients.len() + 1);
                lines.push(format!("active clients: {}", clients.len()));
                lines.extend(
                    clients
                        .iter()
                        .map(|c| format!("#{} {}", c.id, c.display_name())),
                );
                self.reply(&lines.join("\r\n"));
            }
            Command::Help => self.reply(HELP_TEXT),
            Command::Unknown(word) => {
                self.reply(&format!("unknown command: {}", word));
            }
        }
        Flow::Continue
    }

    async fn rename(&self, name: DisplayName) {
        let announcement = name.to_string();
        match self.registry.rename(self.id, name).await {
            Some(old) => {
                info!("Client {} renamed '{}' -> '{}'", self.id, old, announcement);
                self.router
                    .broadcast(&format!("{} is now known as {}", old, announcement))
                    .await;
            }
            None => debug!("Rename for unregistered client {}", self.id),
        }
    }

    /// The issuing client's display name right now
    pub async fn current_name(&self) -> String {
        match self.registry.lookup(self.id).await {
            Some(client) => client.display_name().to_string(),
            None => self.id.to_string(),
        }
    }

    fn reply(&self, text: &str) {
        self.router.reply(text, &self.outbox);
    }
}
