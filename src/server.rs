//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: the account store and the
//! connection registry. Negotiation tasks and connection handlers talk to it
//! only through `ServerCommand`s, so neither structure needs a lock.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::account::AccountStore;
use crate::connection::Connection;
use crate::error::{AccountError, AppError};
use crate::message::{
    color_for_index, online_reply, ClientMessage, Command, ServerMessage, HELLO_REPLY,
    UNKNOWN_COMMAND_REPLY,
};
use crate::registry::ConnectionRegistry;
use crate::types::{AccountId, ClientId};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Resolve a username to its account
    LookupAccount {
        username: String,
        reply: oneshot::Sender<Option<AccountId>>,
    },
    /// Check an account's password
    Authenticate {
        account: AccountId,
        password: String,
        reply: oneshot::Sender<bool>,
    },
    /// Register a new account, replying with its index
    CreateAccount {
        username: String,
        password: String,
        reply: oneshot::Sender<Result<usize, AccountError>>,
    },
    /// Remove an account by username
    ///
    /// No client menu offers deletion; this is for embedding code and tests.
    DeleteAccount {
        username: String,
        reply: oneshot::Sender<Result<(), AccountError>>,
    },
    /// Authenticated client joins the broadcast set
    Admit {
        client_id: ClientId,
        account: AccountId,
        sender: mpsc::Sender<ServerMessage>,
        close_signal: oneshot::Sender<()>,
        reply: oneshot::Sender<bool>,
    },
    /// Admitted client disconnected
    Disconnect { client_id: ClientId },
    /// One read from an admitted client, newline stripped
    Line { client_id: ClientId, text: Vec<u8> },
}

/// Send a command carrying a reply channel and wait for the answer
///
/// Fails with `ServerUnavailable` if the actor has stopped.
pub async fn request<T>(
    cmd_tx: &mpsc::Sender<ServerCommand>,
    make: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
) -> Result<T, AppError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(make(reply_tx))
        .await
        .map_err(|_| AppError::ServerUnavailable)?;
    reply_rx.await.map_err(|_| AppError::ServerUnavailable)
}

/// The main ChatServer actor
pub struct ChatServer {
    /// Registered accounts
    accounts: AccountStore,
    /// Admitted connections
    registry: ConnectionRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            accounts: AccountStore::new(),
            registry: ConnectionRegistry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::LookupAccount { username, reply } => {
                let account = self
                    .accounts
                    .find(&username)
                    .and_then(|i| self.accounts.id_at(i));
                let _ = reply.send(account);
            }
            ServerCommand::Authenticate {
                account,
                password,
                reply,
            } => {
                let ok = self
                    .accounts
                    .index_of(account)
                    .is_some_and(|i| self.accounts.verify(i, &password));
                let _ = reply.send(ok);
            }
            ServerCommand::CreateAccount {
                username,
                password,
                reply,
            } => {
                let result = self.accounts.create(&username, &password);
                match &result {
                    Ok(index) => info!("Account '{}' created at index {}", username, index),
                    Err(e) => debug!("Account '{}' not created: {}", username, e),
                }
                let _ = reply.send(result);
            }
            ServerCommand::DeleteAccount { username, reply } => {
                let result = self.accounts.delete(&username);
                if result.is_ok() {
                    info!("Account '{}' deleted", username);
                }
                let _ = reply.send(result);
            }
            ServerCommand::Admit {
                client_id,
                account,
                sender,
                close_signal,
                reply,
            } => {
                let admitted = self.handle_admit(client_id, account, sender, close_signal);
                let _ = reply.send(admitted);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Line { client_id, text } => {
                self.handle_line(client_id, text);
            }
        }
    }

    /// Handle admission of an authenticated client
    ///
    /// The display color is fixed here from the account's current index.
    fn handle_admit(
        &mut self,
        client_id: ClientId,
        account: AccountId,
        sender: mpsc::Sender<ServerMessage>,
        close_signal: oneshot::Sender<()>,
    ) -> bool {
        let Some(index) = self.accounts.index_of(account) else {
            warn!("Client {} refused: account {} no longer exists", client_id, account);
            return false;
        };

        let color = color_for_index(index);
        let admitted = self
            .registry
            .admit(Connection::new(client_id, account, color, sender, close_signal));
        if admitted {
            info!(
                "Client {} admitted as '{}' (color {})",
                client_id,
                self.accounts.username_at(index).unwrap_or_default(),
                color
            );
            debug!("Online clients: {}", self.registry.len());
        }
        admitted
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        if self.registry.remove(client_id).is_some() {
            info!("Client {} closed", client_id);
            debug!("Online clients: {}", self.registry.len());
        }
    }

    /// Handle one line from an admitted client
    fn handle_line(&mut self, client_id: ClientId, text: Vec<u8>) {
        let Some(sender) = self.registry.get(client_id) else {
            return;
        };
        debug!(
            "Client {} activity: {:?}",
            client_id,
            String::from_utf8_lossy(&text)
        );

        match ClientMessage::parse(&text) {
            ClientMessage::Command(command) => {
                let reply = match command {
                    Command::Online => online_reply(
                        self.registry
                            .online()
                            .map(|c| self.accounts.username_of(c.account).unwrap_or("(deleted)")),
                    ),
                    Command::Hello => HELLO_REPLY.to_string(),
                    Command::Unknown(name) => {
                        debug!("Client {} sent unknown command {}", client_id, name);
                        UNKNOWN_COMMAND_REPLY.to_string()
                    }
                };
                if let Err(e) = sender.try_send(ServerMessage::Reply(reply)) {
                    warn!("Reply to {} failed: {}", client_id, e);
                    self.registry.remove(client_id);
                }
            }
            ClientMessage::Chat(text) => {
                let color = sender.color;
                self.broadcast(client_id, color, text);
            }
        }
    }

    /// Deliver a chat line to every active connection except the sender
    ///
    /// A peer that cannot take the message is dropped; delivery to the
    /// remaining peers continues.
    fn broadcast(&mut self, from: ClientId, color: u8, text: Vec<u8>) {
        debug!(
            "Client {} broadcast: {}",
            from,
            String::from_utf8_lossy(&text)
        );
        let msg = ServerMessage::Chat { color, text };

        for peer_id in self.registry.peers_of(from) {
            let Some(peer) = self.registry.get(peer_id) else {
                continue;
            };
            if let Err(e) = peer.try_send(msg.clone()) {
                warn!("Write to {} failed: {}; closing", peer_id, e);
                self.registry.remove(peer_id);
            }
        }
    }
}
