//! Server-side cursors over a variable's values.
//!
//! A [`Cursor`] replays an opaque cookie to the server so each step returns
//! the value after the last one seen. It keeps a one-value lookahead so
//! [`has_next`](Cursor::has_next) can be asked repeatedly without moving.
//!
//! ```ignore
//! let mut cursor = ws.ifind_try("results");
//! while let Some(result) = cursor.try_next::<String>().await? {
//!     println!("{}", result);
//! }
//! ```

use serde::de::DeserializeOwned;

use crate::codec::{MsgPackCodec, Serializer, Value};
use crate::error::{NwsError, Result};
use crate::protocol::{Cookie, STATUS_OK};
use crate::workspace::{Retrieval, Workspace};

#[derive(Debug)]
enum State {
    /// No lookahead; the next `has_next` asks the server.
    Fresh,
    /// A value is buffered along with the cookie that follows it.
    Peeked(Value, Cookie),
    /// The server reported no further value.
    Exhausted,
}

/// Iterates a variable's values through the server's cookie protocol.
pub struct Cursor<S = MsgPackCodec> {
    workspace: Workspace<S>,
    variable: String,
    kind: Retrieval,
    cookie: Cookie,
    state: State,
}

impl<S> std::fmt::Debug for Cursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("workspace", &self.workspace)
            .field("variable", &self.variable)
            .field("kind", &self.kind)
            .field("cookie", &self.cookie)
            .field("state", &self.state)
            .finish()
    }
}

impl<S: Serializer> Cursor<S> {
    pub(crate) fn new(workspace: Workspace<S>, variable: &str, kind: Retrieval) -> Self {
        Self {
            workspace,
            variable: variable.to_string(),
            kind,
            cookie: Cookie::initial(),
            state: State::Fresh,
        }
    }

    /// Retrieval kind this cursor steps with.
    pub fn kind(&self) -> Retrieval {
        self.kind
    }

    /// Name of the variable being iterated.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Workspace the variable lives in.
    pub fn workspace(&self) -> &Workspace<S> {
        &self.workspace
    }

    /// Whether another value is available.
    ///
    /// For the blocking kinds this waits until the server has one.
    pub async fn has_next(&mut self) -> Result<bool> {
        match self.state {
            State::Peeked(..) => return Ok(true),
            State::Exhausted => return Ok(false),
            State::Fresh => {}
        }

        let response = self
            .workspace
            .step(&self.variable, self.kind, &self.cookie)
            .await?;

        let status = response.status;
        let value = Value::new(response.descriptor, response.payload);
        if status != STATUS_OK || value.is_missing() {
            tracing::trace!(
                "Cursor {} on {:?} exhausted (status {})",
                self.kind.cursor_op(),
                self.variable,
                status
            );
            self.state = State::Exhausted;
            return Ok(false);
        }

        self.state = State::Peeked(value, response.cookie);
        Ok(true)
    }

    /// Advance and return the next value undecoded.
    ///
    /// # Errors
    ///
    /// `NoSuchElement` if the cursor is exhausted.
    pub async fn next_value(&mut self) -> Result<Value> {
        match self.try_next_value().await? {
            Some(value) => Ok(value),
            None => Err(NwsError::NoSuchElement(self.variable.clone())),
        }
    }

    /// Advance and return the next value decoded as `T`.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.next_value().await?.decode::<S, T>()
    }

    /// Advance and return the next value undecoded, or `None` when exhausted.
    pub async fn try_next_value(&mut self) -> Result<Option<Value>> {
        if !self.has_next().await? {
            return Ok(None);
        }
        match std::mem::replace(&mut self.state, State::Fresh) {
            State::Peeked(value, cookie) => {
                self.cookie = cookie;
                Ok(Some(value))
            }
            other => {
                self.state = other;
                Ok(None)
            }
        }
    }

    /// Advance and return the next value decoded as `T`, or `None` when
    /// exhausted.
    pub async fn try_next<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.try_next_value().await? {
            Some(value) => value.decode::<S, T>().map(Some),
            None => Ok(None),
        }
    }

    /// Start over from the beginning of the variable.
    pub fn reset(&mut self) {
        self.cookie = Cookie::initial();
        self.state = State::Fresh;
    }
}
