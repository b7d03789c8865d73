//! Callback handles with stable identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CallbackError;

/// Unique identity of a callback.
///
/// Assigned once when a [`Callback`] is created; clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(Uuid);

impl CallbackId {
    /// Create a new random callback id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CallbackFn<T> = dyn Fn(&T) -> Result<(), CallbackError> + Send + Sync;

/// A registered event handler.
///
/// Deduplication and removal compare callbacks by [`CallbackId`], never by
/// behavior: keep a clone of the handle to unregister it later.
pub struct Callback<T> {
    id: CallbackId,
    func: Arc<CallbackFn<T>>,
}

impl<T: 'static> Callback<T> {
    /// Wrap a handler that cannot fail.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::fallible(move |data| {
            f(data);
            Ok(())
        })
    }

    /// Wrap a handler whose `Err` aborts the dispatch pass it runs in.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&T) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            id: CallbackId::new(),
            func: Arc::new(f),
        }
    }
}

impl<T> Callback<T> {
    /// The identity of this callback.
    #[must_use]
    pub const fn id(&self) -> CallbackId {
        self.id
    }

    /// Invoke the handler.
    pub fn call(&self, data: &T) -> Result<(), CallbackError> {
        (self.func)(data)
    }

    /// True if both handles refer to the same registered callback.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T> Eq for Callback<T> {}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish_non_exhaustive()
    }
}
