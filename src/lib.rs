//! Multi-client TCP Chatroom Library
//!
//! A line-oriented chat server: each client logs in (or creates an account)
//! through a small text menu, then every line it types is broadcast in its
//! own ANSI color to everyone else.
//!
//! # Features
//! - Interactive login and account creation menus
//! - In-memory account store
//! - Colored broadcast to all other online clients
//! - `/online` and `/hello` commands
//! - Disconnection handling
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the account store and the
//!   connection registry
//! - Each connection has a `handler` task that runs the login menus and then
//!   relays lines to and from the server
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use chatroom::{bind, serve, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ServerConfig::new("0.0.0.0:4000".parse().unwrap());
//!     let listener = bind(&config).unwrap();
//!     serve(listener, config).await.unwrap();
//! }
//! ```

pub mod account;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use account::{Account, AccountStore};
pub use config::{Args, ServerConfig};
pub use connection::Connection;
pub use error::{AccountError, AppError, SendError};
pub use handler::handle_connection;
pub use listener::{bind, serve};
pub use message::{ClientMessage, Command, ServerMessage};
pub use registry::ConnectionRegistry;
pub use server::{ChatServer, ServerCommand};
pub use session::{negotiate, Outcome};
pub use types::{AccountId, ClientId};
