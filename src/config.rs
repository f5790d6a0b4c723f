//! Connection and workspace configuration.
//!
//! [`SessionConfig`] deserializes with serde, so it can be embedded in an
//! application's own config file:
//!
//! ```
//! use nws_client::SessionConfig;
//!
//! let config: SessionConfig = serde_json::from_str(r#"{ "host": "nws.internal" }"#).unwrap();
//! assert_eq!(config.host, "nws.internal");
//! assert_eq!(config.port, 8765);
//! ```

use serde::Deserialize;

use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8765;

/// Settings for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Owner id sent when opening workspaces. Defaults to the process id.
    pub owner: Option<String>,
    /// Largest payload accepted from the server, in bytes.
    pub max_payload_size: u64,
}

impl SessionConfig {
    /// Owner id sent with `open ws`.
    pub fn owner_id(&self) -> String {
        self.owner
            .clone()
            .unwrap_or_else(|| std::process::id().to_string())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            owner: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// How a workspace is opened or used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkspaceOptions {
    /// Keep the workspace after its owner disconnects.
    pub persistent: bool,
    /// Create the workspace if it does not exist.
    pub create: bool,
}

impl WorkspaceOptions {
    /// Default options: ephemeral, created on demand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the workspace outlives its owner.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Set whether a missing workspace is created.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            persistent: false,
            create: true,
        }
    }
}

/// Wire form of a boolean option.
pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
