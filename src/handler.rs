//! TCP connection handler
//!
//! Handles one client from accept to close: runs the login menus, asks the
//! ChatServer to admit the client, then shuttles lines in and rendered
//! messages out until either side goes away.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::message::{strip_newline, ServerMessage};
use crate::server::{request, ServerCommand};
use crate::session::{negotiate, Outcome};
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Negotiation runs in this task, so a slow or silent client only holds up
/// itself. The connection joins the broadcast set once the ChatServer has
/// processed its `Admit` command.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: ServerConfig,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let client_id = ClientId::next();
    info!("Client {} connected from {}", client_id, peer_addr);

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::with_capacity(config.read_chunk, read_half);

    let account = match negotiate(&mut reader, &mut write_half, &cmd_tx).await? {
        Outcome::Authenticated(account) => account,
        Outcome::Exit => {
            info!("Client {} left without logging in", client_id);
            return Ok(());
        }
    };

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(config.outbound_queue);
    // Resolves once the registry drops this connection
    let (close_tx, mut close_rx) = oneshot::channel::<()>();

    let admitted = request(&cmd_tx, |reply| ServerCommand::Admit {
        client_id,
        account,
        sender: msg_tx,
        close_signal: close_tx,
        reply,
    })
    .await?;
    if !admitted {
        return Err(AppError::AdmissionRefused);
    }

    let cmd_tx_read = cmd_tx.clone();
    let chunk_size = config.read_chunk;

    // Spawn read task (socket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        loop {
            let n = match reader.fill_buf().await {
                Ok(buf) => buf.len().min(chunk_size),
                Err(e) => {
                    warn!("Read from {} failed: {}", client_id, e);
                    break;
                }
            };
            if n == 0 {
                debug!("Client {} sent EOF", client_id);
                break;
            }

            let text = strip_newline(&reader.buffer()[..n]).to_vec();
            reader.consume(n);

            if cmd_tx_read
                .send(ServerCommand::Line { client_id, text })
                .await
                .is_err()
            {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
        }
    });

    // Spawn write task (ServerMessage -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = write_half.write_all(&msg.render()).await {
                warn!("Write to {} failed: {}", client_id, e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
        }
        _ = &mut close_rx => {
            info!("Client {} dropped by server", client_id);
        }
    }
    read_task.abort();
    write_task.abort();
    // Both halves are dropped once the tasks finish, closing the socket
    let _ = read_task.await;
    let _ = write_task.await;

    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}
