//! Error types for the chat server
//!
//! Defines application-level errors, account store errors and
//! outbound send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Every variant ends the connection it occurred on; none of them
/// propagate to other connections.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the client socket (fatal for that connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server actor is gone (command channel closed)
    #[error("Server unavailable")]
    ServerUnavailable,

    /// The server would not admit an authenticated client
    #[error("Admission refused")]
    AdmissionRefused,
}

/// Account store errors
///
/// Reported back to the client as the reason an account could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// Another account already uses this username
    #[error("Username already exists")]
    UsernameTaken,

    /// Empty username
    #[error("Username must not be empty")]
    EmptyUsername,

    /// Username longer than the store allows
    #[error("Username longer than {max} characters")]
    UsernameTooLong { max: usize },

    /// Password longer than the store allows
    #[error("Password longer than {max} characters")]
    PasswordTooLong { max: usize },

    /// No account with this username
    #[error("No such account")]
    NotFound,
}

/// Message send errors
///
/// Occurs when a peer's outbound queue can no longer accept messages.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The peer is not draining its queue
    #[error("Channel full")]
    ChannelFull,
}
