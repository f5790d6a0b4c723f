//! Workspace operations.
//!
//! A [`Workspace`] is a named namespace of variables on the server, reached
//! through a [`Session`]. It is generic over the [`Serializer`] used for
//! typed values; MessagePack unless re-typed with
//! [`with_serializer`](Workspace::with_serializer).

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{MsgPackCodec, Serializer, Value, ValueCodec};
use crate::cursor::Cursor;
use crate::error::{NwsError, Result};
use crate::mode::Mode;
use crate::protocol::{ops, Cookie, Descriptor, Request, Response};
use crate::session::Session;
use crate::variable::Variable;

/// How a value is retrieved.
///
/// `Find` leaves the value in place, `Fetch` removes it. The `Try` kinds
/// return immediately when nothing is available instead of waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Retrieval {
    /// Read without removing, waiting for a value.
    Find,
    /// Read without removing, or report nothing.
    FindTry,
    /// Remove, waiting for a value.
    Fetch,
    /// Remove, or report nothing.
    FetchTry,
}

impl Retrieval {
    /// Op token for a one-shot retrieval.
    pub fn op(&self) -> &'static str {
        match self {
            Retrieval::Find => ops::FIND,
            Retrieval::FindTry => ops::FIND_TRY,
            Retrieval::Fetch => ops::FETCH,
            Retrieval::FetchTry => ops::FETCH_TRY,
        }
    }

    /// Op token for a cursor step.
    pub fn cursor_op(&self) -> &'static str {
        match self {
            Retrieval::Find => ops::IFIND,
            Retrieval::FindTry => ops::IFIND_TRY,
            Retrieval::Fetch => ops::IFETCH,
            Retrieval::FetchTry => ops::IFETCH_TRY,
        }
    }
}

/// A workspace on an NWS server.
pub struct Workspace<S = MsgPackCodec> {
    session: Session,
    name: String,
    _serializer: PhantomData<fn() -> S>,
}

impl<S> Clone for Workspace<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            name: self.name.clone(),
            _serializer: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Workspace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name)
            .field("session", &self.session)
            .finish()
    }
}

impl<S> fmt::Display for Workspace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workspace {} on {}", self.name, self.session)
    }
}

impl Workspace<MsgPackCodec> {
    pub(crate) fn new(session: Session, name: &str) -> Self {
        Self {
            session,
            name: name.to_string(),
            _serializer: PhantomData,
        }
    }
}

impl<S: Serializer> Workspace<S> {
    /// Workspace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session this workspace talks through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The same workspace with typed values going through `S2`.
    pub fn with_serializer<S2: Serializer>(&self) -> Workspace<S2> {
        Workspace {
            session: self.session.clone(),
            name: self.name.clone(),
            _serializer: PhantomData,
        }
    }

    /// Handle for a variable whose mode is not known to the caller.
    pub fn variable(&self, name: &str) -> Variable<S> {
        Variable::new(self.clone(), name, None)
    }

    /// Declare a variable.
    ///
    /// Declaring an existing variable with its current mode succeeds; a
    /// different mode fails and leaves the variable untouched.
    ///
    /// # Errors
    ///
    /// `DeclarationFailed` if the server refuses the declaration.
    pub async fn declare(&self, var: &str, mode: Mode) -> Result<Variable<S>> {
        let request = Request::new(ops::DECLARE_VAR)
            .text(&self.name)
            .text(var)
            .text(mode.as_str());

        let response = self.session.request(request).await?;
        if !response.is_success() {
            return Err(NwsError::DeclarationFailed {
                var: var.to_string(),
                mode: mode.to_string(),
            });
        }
        Ok(Variable::new(self.clone(), var, Some(mode)))
    }

    /// Delete a variable and all its values.
    pub async fn delete_var(&self, var: &str) -> Result<()> {
        let request = Request::new(ops::DELETE_VAR).text(&self.name).text(var);
        let response = self.session.request(request).await?;
        self.check(&response, ops::DELETE_VAR, var)
    }

    /// Store a value encoded with `S`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `value` encodes to null; nothing is sent.
    pub async fn store<T: Serialize + ?Sized>(&self, var: &str, value: &T) -> Result<()> {
        let (descriptor, payload) = ValueCodec::<S>::encode(value)?;
        self.store_encoded(var, descriptor, payload).await
    }

    /// Store bytes verbatim, flagged raw.
    pub async fn store_bytes(&self, var: &str, data: impl Into<Bytes>) -> Result<()> {
        let (descriptor, payload) = ValueCodec::<S>::encode_raw(data.into());
        self.store_encoded(var, descriptor, payload).await
    }

    async fn store_encoded(&self, var: &str, descriptor: Descriptor, payload: Bytes) -> Result<()> {
        let request = Request::new(ops::STORE)
            .text(&self.name)
            .text(var)
            .number(u64::from(descriptor.bits()))
            .bytes(payload);

        let response = self.session.request(request).await?;
        self.check(&response, ops::STORE, var)
    }

    /// Remove and return the next value, waiting for one if necessary.
    pub async fn fetch<T: DeserializeOwned>(&self, var: &str) -> Result<T> {
        self.fetch_value(var).await?.decode::<S, T>()
    }

    /// Remove and return the next value, or `missing` if there is none.
    pub async fn fetch_try<T: DeserializeOwned>(&self, var: &str, missing: T) -> Result<T> {
        decode_or::<S, T>(self.fetch_try_value(var).await?, missing)
    }

    /// Return the next value without removing it, waiting if necessary.
    pub async fn find<T: DeserializeOwned>(&self, var: &str) -> Result<T> {
        self.find_value(var).await?.decode::<S, T>()
    }

    /// Return the next value without removing it, or `missing`.
    pub async fn find_try<T: DeserializeOwned>(&self, var: &str, missing: T) -> Result<T> {
        decode_or::<S, T>(self.find_try_value(var).await?, missing)
    }

    /// [`fetch`](Self::fetch) without decoding.
    pub async fn fetch_value(&self, var: &str) -> Result<Value> {
        self.retrieve(var, Retrieval::Fetch).await
    }

    /// [`fetch_try`](Self::fetch_try) without decoding.
    pub async fn fetch_try_value(&self, var: &str) -> Result<Option<Value>> {
        self.retrieve_try(var, Retrieval::FetchTry).await
    }

    /// [`find`](Self::find) without decoding.
    pub async fn find_value(&self, var: &str) -> Result<Value> {
        self.retrieve(var, Retrieval::Find).await
    }

    /// [`find_try`](Self::find_try) without decoding.
    pub async fn find_try_value(&self, var: &str) -> Result<Option<Value>> {
        self.retrieve_try(var, Retrieval::FindTry).await
    }

    async fn retrieve(&self, var: &str, kind: Retrieval) -> Result<Value> {
        let request = Request::new(kind.op()).text(&self.name).text(var);
        let response = self.session.request(request).await?;
        self.check(&response, kind.op(), var)?;

        let value = Value::new(response.descriptor, response.payload);
        if value.is_missing() {
            return Err(NwsError::Operation(format!(
                "{} {:?} (no value)",
                kind.op(),
                var
            )));
        }
        Ok(value)
    }

    async fn retrieve_try(&self, var: &str, kind: Retrieval) -> Result<Option<Value>> {
        match self.retrieve(var, kind).await {
            Ok(value) => Ok(Some(value)),
            Err(NwsError::Operation(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Variable listing of this workspace, as the server formats it.
    pub async fn list_vars(&self) -> Result<String> {
        self.session.list_vars(&self.name).await
    }

    /// Cursor over values without consuming them, waiting at the end.
    ///
    /// The visiting order is only defined for FIFO and SINGLE variables.
    pub fn ifind(&self, var: &str) -> Cursor<S> {
        Cursor::new(self.clone(), var, Retrieval::Find)
    }

    /// Cursor over values without consuming them, ending when caught up.
    ///
    /// The visiting order is only defined for FIFO and SINGLE variables.
    pub fn ifind_try(&self, var: &str) -> Cursor<S> {
        Cursor::new(self.clone(), var, Retrieval::FindTry)
    }

    /// Cursor that consumes values, waiting at the end.
    ///
    /// The visiting order is only defined for FIFO and SINGLE variables.
    pub fn ifetch(&self, var: &str) -> Cursor<S> {
        Cursor::new(self.clone(), var, Retrieval::Fetch)
    }

    /// Cursor that consumes values, ending when the variable is empty.
    ///
    /// The visiting order is only defined for FIFO and SINGLE variables.
    pub fn ifetch_try(&self, var: &str) -> Cursor<S> {
        Cursor::new(self.clone(), var, Retrieval::FetchTry)
    }

    /// One cursor step: send the cookie, return the raw response.
    pub(crate) async fn step(&self, var: &str, kind: Retrieval, cookie: &Cookie) -> Result<Response> {
        let request = Request::new(kind.cursor_op())
            .text(&self.name)
            .text(var)
            .bytes(cookie.var_id.clone())
            .bytes(cookie.value_index.clone());
        self.session.request(request).await
    }

    fn check(&self, response: &Response, op: &str, var: &str) -> Result<()> {
        if response.is_success() {
            Ok(())
        } else {
            Err(NwsError::Operation(format!(
                "{} {:?} in workspace {:?} (status {})",
                op, var, self.name, response.status
            )))
        }
    }
}

fn decode_or<S: Serializer, T: DeserializeOwned>(value: Option<Value>, missing: T) -> Result<T> {
    match value {
        Some(value) => Ok(ValueCodec::<S>::decode(value.descriptor(), value.as_bytes())?
            .unwrap_or(missing)),
        None => Ok(missing),
    }
}
