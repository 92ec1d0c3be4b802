//! Type-erased callables
//!
//! An `ErasedCallable` pairs a type encoding with a body over erased values.
//! Typed closures are lowered into this form by `proxy::Callable`; callers
//! with a hand-written encoding construct it directly.

use super::types::Value;
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;

type Body = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Callable descriptor: type encoding plus erased body
#[derive(Clone)]
pub struct ErasedCallable {
    encoding: Arc<str>,
    body: Arc<Body>,
}

impl ErasedCallable {
    /// Create a callable from its encoding and body
    ///
    /// The encoding is not checked here; `describe` reports a malformed one.
    pub fn from_raw<F>(encoding: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            encoding: Arc::from(encoding.into()),
            body: Arc::new(body),
        }
    }

    #[inline]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Run the body with the given arguments
    ///
    /// No signature check happens here; the invocation that owns the
    /// arguments validates them before calling.
    #[inline]
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for ErasedCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedCallable")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
