//! Handles bound to a single variable.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{MsgPackCodec, Serializer, Value};
use crate::cursor::Cursor;
use crate::error::{NwsError, Result};
use crate::mode::Mode;
use crate::workspace::{Retrieval, Workspace};

/// A variable in a workspace.
///
/// Returned by [`Workspace::declare`], which records the declared mode, or
/// by [`Workspace::variable`], which leaves it unknown.
pub struct Variable<S = MsgPackCodec> {
    workspace: Workspace<S>,
    name: String,
    mode: Option<Mode>,
}

impl<S> Clone for Variable<S> {
    fn clone(&self) -> Self {
        Self {
            workspace: self.workspace.clone(),
            name: self.name.clone(),
            mode: self.mode,
        }
    }
}

impl<S> fmt::Debug for Variable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("workspace", &self.workspace)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<S: Serializer> Variable<S> {
    pub(crate) fn new(workspace: Workspace<S>, name: &str, mode: Option<Mode>) -> Self {
        Self {
            workspace,
            name: name.to_string(),
            mode,
        }
    }

    /// Variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode this handle was declared with, if known.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Workspace the variable lives in.
    pub fn workspace(&self) -> &Workspace<S> {
        &self.workspace
    }

    /// Declare the variable, recording `mode` on this handle on success.
    pub async fn declare(&mut self, mode: Mode) -> Result<()> {
        self.workspace.declare(&self.name, mode).await?;
        self.mode = Some(mode);
        Ok(())
    }

    /// Delete the variable and all its values.
    pub async fn delete(&self) -> Result<()> {
        self.workspace.delete_var(&self.name).await
    }

    /// Store a value encoded with `S`.
    pub async fn store<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.workspace.store(&self.name, value).await
    }

    /// Store bytes verbatim, flagged raw.
    pub async fn store_bytes(&self, data: impl Into<Bytes>) -> Result<()> {
        self.workspace.store_bytes(&self.name, data).await
    }

    /// Remove and return the next value, waiting for one if necessary.
    pub async fn fetch<T: DeserializeOwned>(&self) -> Result<T> {
        self.workspace.fetch(&self.name).await
    }

    /// Remove and return the next value, or `missing` if there is none.
    pub async fn fetch_try<T: DeserializeOwned>(&self, missing: T) -> Result<T> {
        self.workspace.fetch_try(&self.name, missing).await
    }

    /// Return the next value without removing it, waiting if necessary.
    pub async fn find<T: DeserializeOwned>(&self) -> Result<T> {
        self.workspace.find(&self.name).await
    }

    /// Return the next value without removing it, or `missing`.
    pub async fn find_try<T: DeserializeOwned>(&self, missing: T) -> Result<T> {
        self.workspace.find_try(&self.name, missing).await
    }

    /// [`fetch`](Self::fetch) without decoding.
    pub async fn fetch_value(&self) -> Result<Value> {
        self.workspace.fetch_value(&self.name).await
    }

    /// [`fetch_try`](Self::fetch_try) without decoding.
    pub async fn fetch_try_value(&self) -> Result<Option<Value>> {
        self.workspace.fetch_try_value(&self.name).await
    }

    /// [`find`](Self::find) without decoding.
    pub async fn find_value(&self) -> Result<Value> {
        self.workspace.find_value(&self.name).await
    }

    /// [`find_try`](Self::find_try) without decoding; `None` if there is no value.
    pub async fn find_try_value(&self) -> Result<Option<Value>> {
        self.workspace.find_try_value(&self.name).await
    }

    /// Cursor over values without consuming them, waiting at the end.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the handle is known to be LIFO or MULTI.
    pub fn ifind(&self) -> Result<Cursor<S>> {
        self.cursor(Retrieval::Find)
    }

    /// Cursor over values without consuming them, ending when caught up.
    pub fn ifind_try(&self) -> Result<Cursor<S>> {
        self.cursor(Retrieval::FindTry)
    }

    /// Cursor that consumes values, waiting at the end.
    pub fn ifetch(&self) -> Result<Cursor<S>> {
        self.cursor(Retrieval::Fetch)
    }

    /// Cursor that consumes values, ending when the variable is empty.
    pub fn ifetch_try(&self) -> Result<Cursor<S>> {
        self.cursor(Retrieval::FetchTry)
    }

    fn cursor(&self, kind: Retrieval) -> Result<Cursor<S>> {
        match self.mode {
            Some(mode) if !mode.supports_cursors() => Err(NwsError::InvalidArgument(format!(
                "{} is not supported on {} variable {:?}",
                kind.cursor_op(),
                mode,
                self.name
            ))),
            _ => Ok(Cursor::new(self.workspace.clone(), &self.name, kind)),
        }
    }
}

impl<S> fmt::Display for Variable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) => write!(f, "{} ({})", self.name, mode),
            None => f.write_str(&self.name),
        }
    }
}
