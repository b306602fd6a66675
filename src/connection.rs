//! Connection struct definition
//!
//! Represents an admitted client with its account binding, display color
//! and outbound message queue.

use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{AccountId, ClientId};

/// Admitted connection information
///
/// Holds everything the server needs to route messages to one client.
/// Dropping it drops `close_signal`, which tells the connection's handler
/// to close the socket even if its writer is stuck on a peer that has
/// stopped reading.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Account this connection logged in as
    pub account: AccountId,
    /// ANSI foreground color used when broadcasting this client's lines
    pub color: u8,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
    /// Never sent on; the handler watches for it being dropped
    pub close_signal: oneshot::Sender<()>,
}

impl Connection {
    /// Create a new connection record
    pub fn new(
        id: ClientId,
        account: AccountId,
        color: u8,
        sender: mpsc::Sender<ServerMessage>,
        close_signal: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            account,
            color,
            sender,
            close_signal,
        }
    }

    /// Queue a message without waiting
    ///
    /// A full queue is reported as an error so one slow reader cannot
    /// stall the server.
    pub fn try_send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_send_delivers() {
        let (tx, mut rx) = mpsc::channel(4);
        let (close_tx, _close_rx) = oneshot::channel();
        let conn = Connection::new(ClientId::next(), AccountId::new(), 31, tx, close_tx);

        conn.try_send(ServerMessage::Reply("hi".to_string())).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::Reply("hi".to_string()))
        );
    }

    #[tokio::test]
    async fn test_try_send_full() {
        let (tx, _rx) = mpsc::channel(1);
        let (close_tx, _close_rx) = oneshot::channel();
        let conn = Connection::new(ClientId::next(), AccountId::new(), 31, tx, close_tx);

        conn.try_send(ServerMessage::Reply("one".to_string())).unwrap();
        let err = conn.try_send(ServerMessage::Reply("two".to_string()));

        assert!(matches!(err, Err(SendError::ChannelFull)));
    }

    #[tokio::test]
    async fn test_try_send_closed() {
        let (tx, rx) = mpsc::channel(1);
        let (close_tx, _close_rx) = oneshot::channel();
        let conn = Connection::new(ClientId::next(), AccountId::new(), 31, tx, close_tx);
        drop(rx);

        let err = conn.try_send(ServerMessage::Reply("gone".to_string()));

        assert!(matches!(err, Err(SendError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_drop_fires_close_signal() {
        let (tx, _rx) = mpsc::channel(1);
        let (close_tx, close_rx) = oneshot::channel();
        let conn = Connection::new(ClientId::next(), AccountId::new(), 31, tx, close_tx);

        drop(conn);

        assert!(close_rx.await.is_err());
    }
}
