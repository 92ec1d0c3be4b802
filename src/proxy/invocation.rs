//! One captured invocation
//!
//! An `Invocation` borrows the proxy that created it, so it cannot outlive
//! the dispatch call it was handed to. The proxy consumes it to read the
//! return slot back out.

use super::chain::Interposer;
use crate::errors::{Error, Result, Site};
use crate::interop::{CallableSignature, ErasedCallable, Marshal, Value};
use crate::logging::trace;
use smallvec::SmallVec;
use std::sync::Arc;

/// Arguments, return slot and bound forward action of a single call
pub struct Invocation<'a> {
    proxy_id: u64,
    signature: &'a CallableSignature,
    target: &'a ErasedCallable,
    args: Vec<Value>,
    ret: Option<Value>,
    /// Interposers still to run before the target; top of stack runs next
    pending: SmallVec<[Arc<dyn Interposer>; 4]>,
    forwards: usize,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        proxy_id: u64,
        signature: &'a CallableSignature,
        target: &'a ErasedCallable,
        args: Vec<Value>,
    ) -> Self {
        Self {
            proxy_id,
            signature,
            target,
            args,
            ret: None,
            pending: SmallVec::new(),
            forwards: 0,
        }
    }

    /// Id of the proxy this call came through
    #[inline]
    pub fn proxy_id(&self) -> u64 {
        self.proxy_id
    }

    #[inline]
    pub fn signature(&self) -> &CallableSignature {
        self.signature
    }

    #[inline]
    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    #[inline]
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Mutable access to an argument. The kind is re-checked on `forward`.
    #[inline]
    pub fn argument_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.args.get_mut(index)
    }

    /// Typed copy of argument `index`
    pub fn arg<T: Marshal>(&self, index: usize) -> Result<T> {
        let value = self
            .args
            .get(index)
            .ok_or_else(|| Error::mismatch(Site::Arity, self.args.len(), index + 1))?;
        T::from_value(value.clone()).map_err(|e| e.at(Site::Argument(index)))
    }

    /// Replace argument `index`, keeping the declared kind
    pub fn set_argument(&mut self, index: usize, value: Value) -> Result<()> {
        let kind = self
            .signature
            .params()
            .get(index)
            .ok_or_else(|| Error::mismatch(Site::Arity, self.signature.arity(), index + 1))?;

        if !value.conforms_to(kind) {
            return Err(Error::mismatch(Site::Argument(index), kind, value.kind()));
        }

        self.args[index] = value;
        Ok(())
    }

    #[inline]
    pub fn return_value(&self) -> Option<&Value> {
        self.ret.as_ref()
    }

    /// Write the return slot
    pub fn set_return(&mut self, value: Value) -> Result<()> {
        self.signature.check_return(&value)?;
        self.ret = Some(value);
        Ok(())
    }

    pub fn set_return_as<T: Marshal>(&mut self, value: T) -> Result<()> {
        self.set_return(value.into_value())
    }

    /// Empty the return slot, handing back what it held
    #[inline]
    pub fn take_return(&mut self) -> Option<Value> {
        self.ret.take()
    }

    /// Times the original callable has run during this invocation
    #[inline]
    pub fn forward_count(&self) -> usize {
        self.forwards
    }

    /// Perform the forwarded call
    ///
    /// Runs the next interposer of an enclosing chain, or the original
    /// callable once the chain is exhausted. Every call re-executes and
    /// overwrites the return slot.
    pub fn forward(&mut self) -> Result<()> {
        match self.pending.pop() {
            Some(layer) => {
                let result = layer.interpose(self);
                self.pending.push(layer);
                result
            }
            None => {
                self.signature.check_arguments(&self.args)?;
                self.forwards += 1;

                trace!(
                    target: "interpose::forward",
                    signature = %self.signature,
                    attempt = self.forwards,
                    "forwarding to original"
                );

                let value = self.target.call(&self.args)?;
                self.signature.check_return(&value)?;
                self.ret = Some(value);
                Ok(())
            }
        }
    }

    pub(crate) fn pending_depth(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn push_layers<I>(&mut self, layers: I)
    where
        I: IntoIterator<Item = Arc<dyn Interposer>>,
    {
        self.pending.extend(layers);
    }

    pub(crate) fn truncate_layers(&mut self, depth: usize) {
        self.pending.truncate(depth);
    }

    /// Consume the invocation and read the return slot
    pub(crate) fn into_return(self) -> Result<Value> {
        match self.ret {
            Some(value) => Ok(value),
            None if self.signature.returns_void() => Ok(Value::Void),
            None => Err(Error::UnresolvedReturn {
                expected: self.signature.ret().clone(),
            }),
        }
    }
}
