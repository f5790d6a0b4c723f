//! Session builder and connection handling.
//!
//! A [`Session`] owns one server connection. It is a cheap handle: clones
//! share the connection, and every [`Workspace`] built from it holds one.
//! Requests are strictly sequential; the connection is locked for each
//! request/response exchange.
//!
//! # Example
//!
//! ```ignore
//! use nws_client::{Mode, Session};
//!
//! let session = Session::builder().host("localhost").port(8765).connect().await?;
//! let ws = session.open_workspace("demo").await?;
//! ws.declare("jobs", Mode::Fifo).await?;
//! ws.store("jobs", &42).await?;
//! let job: i32 = ws.fetch("jobs").await?;
//! session.close().await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::codec::MsgPackCodec;
use crate::config::{yes_no, SessionConfig, WorkspaceOptions};
use crate::error::{NwsError, Result};
use crate::protocol::{
    decode_status, ops, Request, Response, ResponseKind, ValueHeader, STATUS_WIDTH,
    VALUE_HEADER_SIZE,
};
use crate::transport::Transport;
use crate::workspace::Workspace;

/// Default template for [`Session::mktemp_workspace`].
pub const DEFAULT_MKTEMP_TEMPLATE: &str = "__rws__%d";

/// Builder for configuring and connecting a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder with default settings (`localhost:8765`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the owner id sent when opening workspaces.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.config.owner = Some(owner.into());
        self
    }

    /// Set the largest payload accepted from the server.
    ///
    /// Default: 1 GB
    pub fn max_payload_size(mut self, limit: u64) -> Self {
        self.config.max_payload_size = limit;
        self
    }

    /// Connect and handshake.
    pub async fn connect(self) -> Result<Session> {
        Session::from_config(self.config).await
    }
}

/// The transport plus a marker for an exchange that never completed.
struct Connection {
    transport: Transport,
    in_flight: bool,
}

struct SessionInner {
    config: SessionConfig,
    handshake: [u8; 4],
    conn: Mutex<Option<Connection>>,
    closed: watch::Sender<bool>,
}

/// A connection to an NWS server.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Connect to `host:port` with default settings otherwise.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::builder().host(host).port(port).connect().await
    }

    /// Connect using a full configuration.
    pub async fn from_config(config: SessionConfig) -> Result<Self> {
        let transport = Transport::connect(&config.host, config.port).await?;
        let handshake = *transport.handshake_reply();
        let (closed, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                handshake,
                conn: Mutex::new(Some(Connection {
                    transport,
                    in_flight: false,
                })),
                closed,
            }),
        })
    }

    /// Server host.
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Server port.
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Token the server answered the handshake with.
    pub fn handshake(&self) -> &[u8; 4] {
        &self.inner.handshake
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Close the connection.
    ///
    /// A request blocked on the server (for example a `fetch` on an empty
    /// variable) fails with `ConnectionDropped`, as does every later request
    /// through this session or anything built on it.
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.send_replace(true);
        let conn = self.inner.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.transport.shutdown().await?;
        }
        Ok(())
    }

    /// Send one request and read its response.
    pub(crate) async fn request(&self, request: Request) -> Result<Response> {
        let kind = ResponseKind::for_op(request.op());
        let mut closed = self.inner.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(NwsError::ConnectionDropped);
        }

        let mut guard = self.inner.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(NwsError::ConnectionDropped);
        };
        if conn.in_flight {
            tracing::warn!(
                "Discarding connection to {}: previous request was abandoned mid-exchange",
                self
            );
            *guard = None;
            return Err(NwsError::ConnectionDropped);
        }

        tracing::trace!("-> {}", String::from_utf8_lossy(request.op()));
        conn.in_flight = true;
        let result = tokio::select! {
            r = exchange(&mut conn.transport, &request, kind, self.inner.config.max_payload_size) => r,
            _ = closed.wait_for(|c| *c) => Err(NwsError::ConnectionDropped),
        };
        conn.in_flight = false;

        match &result {
            Ok(response) => tracing::trace!(
                "<- {} status {}",
                String::from_utf8_lossy(request.op()),
                response.status
            ),
            Err(e) if e.is_fatal() => {
                tracing::debug!("Connection to {} dropped: {}", self, e);
                *guard = None;
            }
            Err(_) => {}
        }
        result
    }

    /// Open a workspace, claiming ownership and creating it if absent.
    pub async fn open_workspace(&self, name: &str) -> Result<Workspace<MsgPackCodec>> {
        self.open_workspace_with(name, WorkspaceOptions::default())
            .await
    }

    /// Open a workspace with explicit options.
    ///
    /// # Errors
    ///
    /// `NoWorkspace` if the workspace is absent and `create` is off.
    pub async fn open_workspace_with(
        &self,
        name: &str,
        options: WorkspaceOptions,
    ) -> Result<Workspace<MsgPackCodec>> {
        let owner = self.inner.config.owner_id();
        self.attach(ops::OPEN_WS, name, &owner, options).await
    }

    /// Use a workspace without claiming ownership, creating it if absent.
    pub async fn use_workspace(&self, name: &str) -> Result<Workspace<MsgPackCodec>> {
        self.use_workspace_with(name, WorkspaceOptions::default())
            .await
    }

    /// Use a workspace with explicit options.
    ///
    /// # Errors
    ///
    /// `NoWorkspace` if the workspace is absent and `create` is off.
    pub async fn use_workspace_with(
        &self,
        name: &str,
        options: WorkspaceOptions,
    ) -> Result<Workspace<MsgPackCodec>> {
        self.attach(ops::USE_WS, name, "", options).await
    }

    async fn attach(
        &self,
        op: &str,
        name: &str,
        owner: &str,
        options: WorkspaceOptions,
    ) -> Result<Workspace<MsgPackCodec>> {
        let request = Request::new(op)
            .text(name)
            .text(owner)
            .text(yes_no(options.persistent))
            .text(yes_no(options.create));

        let response = self.request(request).await?;
        if !response.is_success() {
            return Err(NwsError::NoWorkspace(name.to_string()));
        }
        tracing::debug!("{} workspace {:?} on {}", op, name, self);
        Ok(Workspace::new(self.clone(), name))
    }

    /// Delete a workspace.
    pub async fn delete_workspace(&self, name: &str) -> Result<()> {
        let response = self.request(Request::new(ops::DELETE_WS).text(name)).await?;
        if !response.is_success() {
            return Err(NwsError::Operation(format!("deleteWs {:?}", name)));
        }
        Ok(())
    }

    /// List the workspaces on the server, as the server formats them.
    pub async fn list_workspaces(&self) -> Result<String> {
        let response = self.request(Request::new(ops::LIST_WSS)).await?;
        if !response.is_success() {
            return Err(NwsError::Operation("listWss".to_string()));
        }
        Ok(response.payload_text())
    }

    /// List the variables of any workspace, as the server formats them.
    pub async fn list_vars(&self, workspace: &str) -> Result<String> {
        let response = self
            .request(Request::new(ops::LIST_VARS).text(workspace))
            .await?;
        if !response.is_success() {
            return Err(NwsError::Operation(format!("listVars {:?}", workspace)));
        }
        Ok(response.payload_text())
    }

    /// Create a uniquely named workspace and return its name.
    ///
    /// The server substitutes a counter for `%d` in `template`; `None` uses
    /// [`DEFAULT_MKTEMP_TEMPLATE`].
    pub async fn mktemp_workspace(&self, template: Option<&str>) -> Result<String> {
        let template = template.unwrap_or(DEFAULT_MKTEMP_TEMPLATE);
        let response = self
            .request(Request::new(ops::MKTEMP_WS).text(template))
            .await?;
        if !response.is_success() {
            return Err(NwsError::Operation("mktempWs".to_string()));
        }
        Ok(response.payload_text())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NwsServer {}:{}", self.host(), self.port())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host())
            .field("port", &self.port())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Write a request and read the response shape `kind` calls for.
async fn exchange(
    transport: &mut Transport,
    request: &Request,
    kind: ResponseKind,
    max_payload_size: u64,
) -> Result<Response> {
    transport.write(&request.encode()).await?;
    transport.flush().await?;

    let status = decode_status(&transport.read_array::<STATUS_WIDTH>().await?)?;
    if kind == ResponseKind::Status {
        return Ok(Response::status(status));
    }

    let header = ValueHeader::decode(&transport.read_array::<VALUE_HEADER_SIZE>().await?)?;
    header.validate(max_payload_size)?;
    let payload = transport.read_exact(header.payload_length as usize).await?;
    Ok(Response::from_parts(status, header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let builder = Session::builder()
            .host("nws.example")
            .port(9999)
            .owner("master")
            .max_payload_size(1024);

        assert_eq!(builder.config.host, "nws.example");
        assert_eq!(builder.config.port, 9999);
        assert_eq!(builder.config.owner.as_deref(), Some("master"));
        assert_eq!(builder.config.max_payload_size, 1024);
    }

    #[test]
    fn test_builder_from_config() {
        let config = SessionConfig {
            port: 7000,
            ..SessionConfig::default()
        };
        let builder = SessionBuilder::new().config(config.clone());
        assert_eq!(builder.config, config);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Session::connect("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, NwsError::Connect { .. }));
    }
}
