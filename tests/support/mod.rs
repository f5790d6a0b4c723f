//! In-process NWS server for integration tests.
//!
//! Speaks the real wire protocol on `127.0.0.1:0`, parsing requests with the
//! crate's own `RequestBuffer` and answering with `Response::encode`. Enough
//! of the server's behavior is modelled for the client to be exercised end to
//! end: variable modes, blocking retrievals, cursors and workspace ownership.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use nws_client::protocol::{
    decode_decimal, ops, Cookie, Descriptor, Request, RequestBuffer, Response, ResponseKind,
    HANDSHAKE_REQUEST, LEGACY_PROTOCOL_REPLY,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Handshake reply of a current server.
pub const HANDSHAKE_REPLY: &[u8; 4] = b"2223";

const STATUS_FAILED: u32 = 1;

/// A running mock server. Stops when dropped.
pub struct MockServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

struct Shared {
    state: Mutex<State>,
    changed: Notify,
    legacy: bool,
}

#[derive(Default)]
struct State {
    workspaces: BTreeMap<String, Workspace>,
    next_var_id: u64,
    next_temp: u64,
    requests: Vec<Request>,
    hangup_on: Option<String>,
    canned: Option<(String, Response)>,
}

struct Workspace {
    owner: String,
    persistent: bool,
    vars: BTreeMap<String, Var>,
}

struct Var {
    id: Bytes,
    mode: String,
    values: VecDeque<Stored>,
    next_index: u64,
    seed: u64,
}

#[derive(Clone)]
struct Stored {
    index: u64,
    descriptor: Descriptor,
    payload: Bytes,
}

/// What a request resolved to.
enum Outcome {
    Reply(Response),
    /// Blocking retrieval with nothing available yet.
    Wait,
    /// Drop the connection without answering.
    Hangup,
}

impl MockServer {
    /// Start a server that speaks the current protocol.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Start a server that answers the handshake with the legacy token.
    pub async fn start_legacy() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(legacy: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            changed: Notify::new(),
            legacy,
        });

        let accept_shared = shared.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, accept_shared.clone()));
            }
        });

        Self { addr, shared, task }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.shared.state.lock().unwrap().requests.clone()
    }

    /// Requests received for one op token.
    pub fn requests_for(&self, op: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.op() == op.as_bytes())
            .collect()
    }

    /// Drop the connection instead of answering the next `op` request.
    pub fn hangup_on(&self, op: &str) {
        self.shared.state.lock().unwrap().hangup_on = Some(op.to_string());
    }

    /// Answer the next `op` request with `response` instead of handling it.
    pub fn respond_with(&self, op: &str, response: Response) {
        self.shared.state.lock().unwrap().canned = Some((op.to_string(), response));
    }

    /// Number of values currently held by a variable.
    pub fn value_count(&self, ws: &str, var: &str) -> Option<usize> {
        let state = self.shared.state.lock().unwrap();
        Some(state.workspaces.get(ws)?.vars.get(var)?.values.len())
    }

    /// Mode a variable was declared with.
    pub fn mode_of(&self, ws: &str, var: &str) -> Option<String> {
        let state = self.shared.state.lock().unwrap();
        Some(state.workspaces.get(ws)?.vars.get(var)?.mode.clone())
    }

    /// Whether a workspace exists.
    pub fn has_workspace(&self, ws: &str) -> bool {
        self.shared.state.lock().unwrap().workspaces.contains_key(ws)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(stream: TcpStream, shared: Arc<Shared>) {
    let (mut reader, mut writer) = stream.into_split();

    let mut hello = [0u8; 4];
    if reader.read_exact(&mut hello).await.is_err() || &hello != HANDSHAKE_REQUEST {
        return;
    }
    let reply: &[u8] = if shared.legacy {
        LEGACY_PROTOCOL_REPLY
    } else {
        HANDSHAKE_REPLY
    };
    if writer.write_all(reply).await.is_err() || shared.legacy {
        return;
    }

    let mut buffer = RequestBuffer::new();
    let mut pending: VecDeque<Request> = VecDeque::new();
    let mut chunk = vec![0u8; 8192];

    loop {
        let Some(request) = pending.pop_front() else {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => match buffer.push(&chunk[..n]) {
                    Ok(requests) => pending.extend(requests),
                    Err(_) => return,
                },
            }
            continue;
        };

        let Some(response) = answer(&shared, &request, &mut reader, &mut buffer, &mut pending).await
        else {
            return;
        };
        let kind = ResponseKind::for_op(request.op());
        if writer.write_all(&response.encode(kind)).await.is_err() {
            return;
        }
    }
}

/// Resolve a request, waiting for a value when it blocks.
///
/// Returns `None` when the connection should be dropped, including when the
/// client hangs up while a retrieval is blocked.
async fn answer(
    shared: &Shared,
    request: &Request,
    reader: &mut OwnedReadHalf,
    buffer: &mut RequestBuffer,
    pending: &mut VecDeque<Request>,
) -> Option<Response> {
    shared.state.lock().unwrap().requests.push(request.clone());
    let mut chunk = [0u8; 1024];

    loop {
        let notified = shared.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let outcome = {
            let mut state = shared.state.lock().unwrap();
            state.handle(request)
        };
        match outcome {
            Outcome::Reply(response) => {
                shared.changed.notify_waiters();
                return Some(response);
            }
            Outcome::Hangup => return None,
            Outcome::Wait => {}
        }

        tokio::select! {
            _ = &mut notified => {}
            n = reader.read(&mut chunk) => match n {
                Ok(0) | Err(_) => return None,
                Ok(n) => pending.extend(buffer.push(&chunk[..n]).ok()?),
            },
        }
    }
}

fn failed() -> Outcome {
    Outcome::Reply(Response::status(STATUS_FAILED))
}

fn ok() -> Outcome {
    Outcome::Reply(Response::status(0))
}

fn text_reply(text: String) -> Outcome {
    Outcome::Reply(Response::value(
        0,
        Descriptor::raw(0),
        Cookie::initial(),
        Bytes::from(text),
    ))
}

impl State {
    fn handle(&mut self, request: &Request) -> Outcome {
        let op = request.text_field(0).unwrap_or_default().to_string();
        if self.hangup_on.as_deref() == Some(op.as_str()) {
            self.hangup_on = None;
            return Outcome::Hangup;
        }
        if self.canned.as_ref().is_some_and(|(canned, _)| *canned == op) {
            if let Some((_, response)) = self.canned.take() {
                return Outcome::Reply(response);
            }
        }
        let arg = |i: usize| request.text_field(i).unwrap_or_default().to_string();

        match op.as_str() {
            ops::OPEN_WS | ops::USE_WS => {
                let (name, owner, persistent, create) = (arg(1), arg(2), arg(3), arg(4));
                match self.workspaces.get_mut(&name) {
                    Some(ws) => {
                        if op == ops::OPEN_WS && ws.owner.is_empty() {
                            ws.owner = owner;
                            ws.persistent = persistent == "yes";
                        }
                        ok()
                    }
                    None if create == "yes" => {
                        self.workspaces.insert(
                            name,
                            Workspace {
                                owner,
                                persistent: persistent == "yes",
                                vars: BTreeMap::new(),
                            },
                        );
                        ok()
                    }
                    None => failed(),
                }
            }
            ops::DELETE_WS => match self.workspaces.remove(&arg(1)) {
                Some(_) => ok(),
                None => failed(),
            },
            ops::LIST_WSS => {
                let lines: Vec<String> = self
                    .workspaces
                    .iter()
                    .map(|(name, ws)| {
                        format!(
                            "{}\t{}\t{}\t{}\t{}",
                            name,
                            ws.owner,
                            ws.persistent,
                            ws.vars.len(),
                            ws.vars.keys().cloned().collect::<Vec<_>>().join(",")
                        )
                    })
                    .collect();
                text_reply(lines.join("\n"))
            }
            ops::MKTEMP_WS => {
                let template = arg(1);
                if !template.contains("%d") {
                    return failed();
                }
                let name = loop {
                    self.next_temp += 1;
                    let candidate = template.replace("%d", &self.next_temp.to_string());
                    if !self.workspaces.contains_key(&candidate) {
                        break candidate;
                    }
                };
                self.workspaces.insert(
                    name.clone(),
                    Workspace {
                        owner: String::new(),
                        persistent: false,
                        vars: BTreeMap::new(),
                    },
                );
                text_reply(name)
            }
            ops::LIST_VARS => match self.workspaces.get(&arg(1)) {
                Some(ws) => {
                    let lines: Vec<String> = ws
                        .vars
                        .iter()
                        .map(|(name, var)| {
                            format!("{}\t{}\t0\t0\t{}", name, var.values.len(), var.mode)
                        })
                        .collect();
                    text_reply(lines.join("\n"))
                }
                None => failed(),
            },
            ops::DECLARE_VAR => {
                let (ws, var, mode) = (arg(1), arg(2), arg(3));
                if !matches!(mode.as_str(), "fifo" | "lifo" | "multi" | "single") {
                    return failed();
                }
                let id = self.allocate_id();
                let Some(ws) = self.workspaces.get_mut(&ws) else {
                    return failed();
                };
                match ws.vars.get(&var) {
                    Some(existing) if existing.mode != mode => failed(),
                    Some(_) => ok(),
                    None => {
                        ws.vars.insert(var, Var::new(id, &mode));
                        ok()
                    }
                }
            }
            ops::DELETE_VAR => {
                let Some(ws) = self.workspaces.get_mut(&arg(1)) else {
                    return failed();
                };
                match ws.vars.remove(&arg(2)) {
                    Some(_) => ok(),
                    None => failed(),
                }
            }
            ops::STORE => {
                let Some(descriptor) = request
                    .field(3)
                    .and_then(|f| decode_decimal(f).ok())
                    .and_then(|d| u32::try_from(d).ok())
                else {
                    return failed();
                };
                let payload = request.field(4).cloned().unwrap_or_default();
                let Some(var) = self.var_or_create(&arg(1), &arg(2)) else {
                    return failed();
                };
                var.store(Descriptor(descriptor), payload);
                ok()
            }
            ops::FETCH | ops::FETCH_TRY | ops::FIND | ops::FIND_TRY => {
                let blocking = op == ops::FETCH || op == ops::FIND;
                let consume = op == ops::FETCH || op == ops::FETCH_TRY;
                let Some(var) = self.var_or_create(&arg(1), &arg(2)) else {
                    return failed();
                };
                match var.take(consume) {
                    Some(stored) => Outcome::Reply(var.reply(stored)),
                    None if blocking => Outcome::Wait,
                    None => Outcome::Reply(Response::status(STATUS_FAILED)),
                }
            }
            ops::IFETCH | ops::IFETCH_TRY | ops::IFIND | ops::IFIND_TRY => {
                let blocking = op == ops::IFETCH || op == ops::IFIND;
                let consume = op == ops::IFETCH || op == ops::IFETCH_TRY;
                let var_id = request.field(3).cloned().unwrap_or_default();
                let Some(after) = request.field(4).and_then(|f| decode_decimal(f).ok()) else {
                    return failed();
                };
                let Some(var) = self.var_or_create(&arg(1), &arg(2)) else {
                    return failed();
                };
                let after = if var_id == var.id { after } else { 0 };
                match var.take_after(after, consume) {
                    Some(stored) => Outcome::Reply(var.reply(stored)),
                    None if blocking => Outcome::Wait,
                    None => Outcome::Reply(Response::status(STATUS_FAILED)),
                }
            }
            _ => failed(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_var_id += 1;
        self.next_var_id
    }

    /// Look up a variable, creating it as FIFO like the server does.
    fn var_or_create(&mut self, ws: &str, var: &str) -> Option<&mut Var> {
        let id = self.allocate_id();
        let ws = self.workspaces.get_mut(ws)?;
        Some(
            ws.vars
                .entry(var.to_string())
                .or_insert_with(|| Var::new(id, "fifo")),
        )
    }
}

impl Var {
    fn new(id: u64, mode: &str) -> Self {
        Self {
            id: Bytes::from(format!("{:020}", id)),
            seed: 0x9E37_79B9_7F4A_7C15 ^ id,
            mode: mode.to_string(),
            values: VecDeque::new(),
            next_index: 0,
        }
    }

    fn store(&mut self, descriptor: Descriptor, payload: Bytes) {
        if self.mode == "single" {
            self.values.clear();
        }
        self.next_index += 1;
        self.values.push_back(Stored {
            index: self.next_index,
            descriptor,
            payload,
        });
    }

    fn take(&mut self, consume: bool) -> Option<Stored> {
        if self.values.is_empty() {
            return None;
        }
        let position = match self.mode.as_str() {
            "lifo" => self.values.len() - 1,
            "multi" => (self.next_random() % self.values.len() as u64) as usize,
            _ => 0,
        };
        if consume {
            self.values.remove(position)
        } else {
            self.values.get(position).cloned()
        }
    }

    fn take_after(&mut self, after: u64, consume: bool) -> Option<Stored> {
        let position = self.values.iter().position(|v| v.index > after)?;
        if consume {
            self.values.remove(position)
        } else {
            self.values.get(position).cloned()
        }
    }

    fn reply(&self, stored: Stored) -> Response {
        Response::value(
            0,
            stored.descriptor,
            Cookie::new(self.id.clone(), Bytes::from(format!("{:020}", stored.index))),
            stored.payload,
        )
    }

    fn next_random(&mut self) -> u64 {
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 7;
        self.seed ^= self.seed << 17;
        self.seed
    }
}

/// Install a test subscriber once; output only shows with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
