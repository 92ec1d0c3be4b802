//! Interposers and their composition
//!
//! An interposer receives the captured invocation and decides whether, how
//! often, and with which arguments to forward it. Whatever it leaves in the
//! return slot is what the proxy's caller sees.

use super::invocation::Invocation;
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied dispatch logic for a proxy
pub trait Interposer: Send + Sync {
    fn interpose(&self, inv: &mut Invocation<'_>) -> Result<()>;
}

/// Interposer backed by a closure, see [`interposer_fn`]
#[derive(Clone)]
pub struct InterposerFn<F> {
    f: F,
}

/// Adapt a closure into an [`Interposer`]
///
/// ```ignore
/// let logger = interposer_fn(|inv: &mut Invocation<'_>| {
///     tracing::info!(args = ?inv.arguments(), "calling");
///     inv.forward()
/// });
/// ```
pub fn interposer_fn<F>(f: F) -> InterposerFn<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<()> + Send + Sync,
{
    InterposerFn { f }
}

impl<F> Interposer for InterposerFn<F>
where
    F: Fn(&mut Invocation<'_>) -> Result<()> + Send + Sync,
{
    #[inline]
    fn interpose(&self, inv: &mut Invocation<'_>) -> Result<()> {
        (self.f)(inv)
    }
}

impl<F> fmt::Debug for InterposerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InterposerFn")
    }
}

/// Forwards once and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Interposer for Passthrough {
    #[inline]
    fn interpose(&self, inv: &mut Invocation<'_>) -> Result<()> {
        inv.forward()
    }
}

/// Ordered stack of interposers, outermost first
///
/// Each layer's `forward` reaches the next layer; the last layer's reaches
/// the original callable. Chains nest.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Interposer>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an inner layer
    pub fn with(mut self, layer: impl Interposer + 'static) -> Self {
        self.push(layer);
        self
    }

    pub fn push(&mut self, layer: impl Interposer + 'static) {
        self.layers.push(Arc::new(layer));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Interposer for Chain {
    fn interpose(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let depth = inv.pending_depth();
        inv.push_layers(self.layers.iter().rev().cloned());
        let result = inv.forward();
        inv.truncate_layers(depth);
        result
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.layers.len()).finish()
    }
}
