//! Transport module - the TCP connection to the server.
//!
//! Provides connect + handshake, buffered writes with explicit flush, and
//! exact-length reads that report a peer hang-up as `ConnectionDropped`.

mod tcp;

pub use tcp::Transport;
