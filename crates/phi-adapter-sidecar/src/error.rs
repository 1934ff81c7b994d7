//! Transport error types.

use std::io;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the sidecar transport.
///
/// Syscall failures carry the failing call as a message prefix
/// (`"bind: address already in use"`), so diagnostics name the exact
/// operation that failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket path does not fit the OS `sockaddr_un` path field.
    #[error("socket path too long: {path}")]
    PathTooLong { path: String },

    /// An OS call failed.
    #[error("{syscall}: {source}")]
    Io {
        syscall: &'static str,
        #[source]
        source: io::Error,
    },

    /// Poll or send before `start` (or after `stop`).
    #[error("transport not started")]
    NotStarted,

    /// Send attempted while no core is connected.
    #[error("no connected client")]
    NoClient,

    /// A frame arrived with bad magic or an unsupported version; the client
    /// connection was closed.
    #[error("invalid frame header")]
    InvalidFrameHeader,
}

impl TransportError {
    pub(crate) fn io(syscall: &'static str, source: io::Error) -> Self {
        Self::Io { syscall, source }
    }
}
