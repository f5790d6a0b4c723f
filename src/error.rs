//! Error types for nws-client.

use thiserror::Error;

/// Main error type for all NWS operations.
#[derive(Debug, Error)]
pub enum NwsError {
    /// DNS resolution or TCP connect failed.
    #[error("unable to connect to the NWS server at {addr}: {source}")]
    Connect {
        /// `host:port` that was attempted.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The server answered the handshake with the legacy protocol token.
    #[error("old/unsupported protocol (server replied {0:?})")]
    UnsupportedProtocol(String),

    /// Peer closed the connection, or the session was closed locally.
    #[error("NWS server connection dropped")]
    ConnectionDropped,

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame (non-decimal numeric field, oversized payload, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Nonzero status returned by the server.
    #[error("{0} failed")]
    Operation(String),

    /// Variable declaration rejected, typically a mode conflict.
    #[error("declaration of variable {var:?} as {mode} failed")]
    DeclarationFailed {
        /// Variable name.
        var: String,
        /// Requested mode.
        mode: String,
    },

    /// `open ws` / `use ws` on an absent workspace with create disabled.
    #[error("workspace {0:?} doesn't exist")]
    NoWorkspace(String),

    /// Value could not be encoded by the serializer.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// Payload could not be reconstructed into the requested type.
    #[error("deserialize error: {0}")]
    Deserialize(String),

    /// Local precondition violated; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Cursor has no further values.
    #[error("variable {0:?} has no values")]
    NoSuchElement(String),
}

impl NwsError {
    /// Whether the error leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NwsError::ConnectionDropped | NwsError::Io(_) | NwsError::Protocol(_)
        )
    }
}

/// Result type alias using NwsError.
pub type Result<T> = std::result::Result<T, NwsError>;
