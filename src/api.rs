// The three remote operations, mapped onto the registry.

use crate::registry::LeaseRegistry;
use crate::ClientId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Connection status reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// Number of clients sharing the link.
    pub current_clients: usize,
    /// True if the link is up.
    pub is_connected: bool,
    /// Whole seconds the link has been up this session.
    pub seconds_connected: u64,
}

/// Stateless shim between the transport and the registry.
///
/// Registry operations are total, so every call here reports success;
/// clients learn the actual link state by polling `get_status`.
pub struct Api {
    registry: Arc<LeaseRegistry>,
}

impl Api {
    pub fn new(registry: Arc<LeaseRegistry>) -> Self {
        Self { registry }
    }

    /// Register the client, dialing if needed. Always succeeds.
    pub fn connect(&self, client_id: ClientId) -> bool {
        info!(client = %client_id, "connected");
        self.registry.add_lease(client_id);
        true
    }

    /// Drop the client's lease; with `all` set, hang up for everyone
    /// regardless of remaining leases. Always succeeds.
    pub fn disconnect(&self, client_id: &ClientId, all: bool) -> bool {
        if all {
            info!(client = %client_id, "disconnected (all users)");
        } else {
            info!(client = %client_id, "disconnected");
        }
        self.registry.remove_lease(client_id);
        if all {
            self.registry.disconnect();
        }
        true
    }

    /// Refresh the caller's lease and report the shared state. Polling
    /// status is what keeps a quiet client from being swept.
    pub fn get_status(&self, client_id: &ClientId) -> Status {
        self.registry.refresh_lease(client_id);
        Status {
            current_clients: self.registry.count(),
            is_connected: self.registry.is_held(),
            seconds_connected: self.registry.elapsed(),
        }
    }
}
