//! Transport runtime.
//!
//! Thin owner of the UDS listener with a uniform error surface. The runtime
//! builds frame headers from `(type, correlation id)` pairs and leaves
//! `payload_size` for the listener to fill from the actual payload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use phi_adapter_protocol::{CorrelationId, FrameHeader, MessageType};

use crate::error::TransportResult;
use crate::socket::{TransportEvent, UdsServer};

/// Event-driven IPC runtime for one sidecar socket.
///
/// The owning program drives [`SidecarRuntime::poll_once`] from its own
/// loop; the runtime never spawns threads. Events come back in arrival
/// order, so frame delivery order matches byte arrival order.
pub struct SidecarRuntime {
    server: UdsServer,
}

impl SidecarRuntime {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            server: UdsServer::new(socket_path),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.server.socket_path()
    }

    pub fn is_client_connected(&self) -> bool {
        self.server.is_client_connected()
    }

    /// Binds and starts listening.
    pub fn start(&mut self) -> TransportResult<()> {
        self.server.start()
    }

    /// Closes the client and listener and unlinks the socket path.
    pub fn stop(&mut self) {
        self.server.stop();
    }

    /// Runs one poll cycle, appending transport events in arrival order.
    pub fn poll_once(
        &mut self,
        timeout: Duration,
        events: &mut Vec<TransportEvent>,
    ) -> TransportResult<()> {
        self.server.poll_once(timeout, events)
    }

    /// Frames and sends one payload with the given type and correlation id.
    pub fn send(
        &mut self,
        kind: MessageType,
        correlation_id: CorrelationId,
        payload: &[u8],
    ) -> TransportResult<()> {
        let header = FrameHeader::new(kind, correlation_id);
        self.server.send(&header, payload)
    }
}
