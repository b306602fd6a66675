//! Listening socket and accept loop

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::ChatServer;

/// Bind the listening socket with `SO_REUSEADDR` and the configured backlog
pub fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    let socket = if config.bind_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(config.bind_addr)?;
    socket.listen(config.backlog)
}

/// Start the ChatServer actor and accept connections forever
///
/// Accept errors are logged and skipped. Returns only if the ChatServer
/// actor has stopped, which leaves no way to serve clients.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<(), AppError> {
    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_queue);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        if cmd_tx.is_closed() {
            error!("ChatServer actor stopped");
            return Err(AppError::ServerUnavailable);
        }

        match listener.accept().await {
            Ok((stream, _)) => {
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, config).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
