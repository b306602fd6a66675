//! Connection registry
//!
//! Tracks every admitted connection by `ClientId` and remembers the order
//! in which they came online.

use std::collections::HashMap;

use crate::connection::Connection;
use crate::types::ClientId;

/// Admitted connections plus their admission order
///
/// Every id in `online` has an entry in `connections`, and vice versa.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ClientId, Connection>,
    online: Vec<ClientId>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection
    ///
    /// Returns false if the id is already registered.
    pub fn admit(&mut self, conn: Connection) -> bool {
        if self.connections.contains_key(&conn.id) {
            return false;
        }
        self.online.push(conn.id);
        self.connections.insert(conn.id, conn);
        true
    }

    /// Deactivate a connection, returning its record
    pub fn remove(&mut self, id: ClientId) -> Option<Connection> {
        let conn = self.connections.remove(&id)?;
        self.online.retain(|&other| other != id);
        Some(conn)
    }

    /// Look up an active connection
    pub fn get(&self, id: ClientId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Check if a connection is active
    pub fn is_active(&self, id: ClientId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Active connections in admission order
    pub fn online(&self) -> impl Iterator<Item = &Connection> {
        self.online.iter().filter_map(|id| self.connections.get(id))
    }

    /// Ids of every active connection except `sender`, in admission order
    pub fn peers_of(&self, sender: ClientId) -> Vec<ClientId> {
        self.online
            .iter()
            .copied()
            .filter(|&id| id != sender)
            .collect()
    }

    /// Number of active connections
    pub fn len(&self) -> usize {
        self.online.len()
    }

    /// Check if no connection is active
    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }
}
