//! Proxy callables - signature-preserving interception
//!
//! Design: one erased trampoline per proxy; typed closures are lifted on top
//!
//! Architecture:
//! - `invocation.rs` - Captured invocation (arguments, return slot, forward)
//! - `chain.rs` - Interposer trait, closure adapter and composition
//! - `typed.rs` - `Callable<Args>` bridge between typed closures and erased form

mod invocation;
mod chain;
mod typed;

pub use invocation::Invocation;
pub use chain::{interposer_fn, Chain, Interposer, InterposerFn, Passthrough};
pub use typed::Callable;

use crate::config::ProxyConfig;
use crate::errors::{Error, Result};
use crate::interop::{describe, CallableSignature, ErasedCallable, Value};
use crate::logging::{debug, error, trace_span};
use std::fmt;
use crate::memo::{MemoCache, Memoizer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Proxy statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub calls: u64,
    /// Executions of the original callable
    pub forwards: u64,
    /// Calls that completed without reaching the original
    pub short_circuits: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    forwards: AtomicU64,
    short_circuits: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ProxyStats {
        ProxyStats {
            calls: self.calls.load(Ordering::Relaxed),
            forwards: self.forwards.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

struct ProxyInner {
    id: u64,
    signature: CallableSignature,
    original: ErasedCallable,
    dispatch: Arc<dyn Interposer>,
    config: ProxyConfig,
    counters: Counters,
}

/// Synthesized callable sharing a signature with an original callable
///
/// Cloning is cheap and shares the dispatch binding and statistics.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl Proxy {
    /// Process-unique id of this proxy, shared by its clones
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    pub fn signature(&self) -> &CallableSignature {
        &self.inner.signature
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> ProxyStats {
        self.inner.counters.snapshot()
    }

    /// Invoke through the interposer
    ///
    /// Errors raised by the interposer or the original callable come back
    /// unchanged.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        let inner = &*self.inner;
        let _span = inner
            .config
            .trace_calls
            .then(|| trace_span!("invoke", signature = %inner.signature).entered());

        inner.counters.calls.fetch_add(1, Ordering::Relaxed);

        let result = self.dispatch(args);
        if let Err(err) = &result {
            inner.counters.failures.fetch_add(1, Ordering::Relaxed);
            match err {
                Error::UnresolvedReturn { expected } => {
                    error!(
                        target: "interpose::proxy",
                        signature = %inner.signature,
                        expected = %expected,
                        "interposer left the return slot empty"
                    );
                }
                other => {
                    debug!(target: "interpose::proxy", error = other.code(), "proxy call failed");
                }
            }
        }
        result
    }

    fn dispatch(&self, args: Vec<Value>) -> Result<Value> {
        let inner = &*self.inner;

        if inner.config.validate_arguments {
            inner.signature.check_arguments(&args)?;
        }

        let mut inv = Invocation::new(inner.id, &inner.signature, &inner.original, args);
        let outcome = inner.dispatch.interpose(&mut inv);

        let forwards = inv.forward_count() as u64;
        inner.counters.forwards.fetch_add(forwards, Ordering::Relaxed);
        if forwards == 0 && outcome.is_ok() {
            inner.counters.short_circuits.fetch_add(1, Ordering::Relaxed);
        }

        outcome?;
        inv.into_return()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("signature", &self.inner.signature.to_string())
            .field("original", &self.inner.original)
            .finish_non_exhaustive()
    }
}

/// Builds proxies from signatures and dispatch targets
#[derive(Debug, Clone, Default)]
pub struct ProxyFactory {
    config: ProxyConfig,
}

impl ProxyFactory {
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Synthesize a proxy with `signature` that routes every call through
    /// `dispatch`, forwarding to `original`
    pub fn build(
        &self,
        signature: CallableSignature,
        original: ErasedCallable,
        dispatch: impl Interposer + 'static,
    ) -> Proxy {
        debug!(target: "interpose::proxy", signature = %signature, "built proxy");

        Proxy {
            inner: Arc::new(ProxyInner {
                id: NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed),
                signature,
                original,
                dispatch: Arc::new(dispatch),
                config: self.config.clone(),
                counters: Counters::default(),
            }),
        }
    }

    /// Introspect `callable` and build a proxy for it
    pub fn wrap(&self, interposer: impl Interposer + 'static, callable: ErasedCallable) -> Result<Proxy> {
        let signature = describe(&callable)?;
        Ok(self.build(signature, callable, interposer))
    }

    /// Typed counterpart of [`ProxyFactory::wrap`]
    pub fn wrap_typed<F, Args>(&self, interposer: impl Interposer + 'static, callable: F) -> Result<F::Proxy>
    where
        F: Callable<Args>,
    {
        let proxy = self.wrap(interposer, callable.erase())?;
        Ok(F::lift(proxy))
    }

    /// Wrap `callable` in a memoizing proxy that stores results in `cache`
    pub fn memoize(&self, cache: MemoCache, callable: ErasedCallable) -> Result<Proxy> {
        self.wrap(Memoizer::new(cache), callable)
    }

    /// Typed counterpart of [`ProxyFactory::memoize`]
    pub fn memoize_typed<F, Args>(&self, cache: MemoCache, callable: F) -> Result<F::Proxy>
    where
        F: Callable<Args>,
    {
        self.wrap_typed(Memoizer::new(cache), callable)
    }
}

/// Wrap `callable` in a proxy with the same parameter list whose calls run
/// through `interposer`
///
/// ```ignore
/// let add = forwarding_wrap(Passthrough, |a: i32, b: i32| a + b)?;
/// assert_eq!(add(2, 3)?, 5);
/// ```
pub fn forwarding_wrap<F, Args>(interposer: impl Interposer + 'static, callable: F) -> Result<F::Proxy>
where
    F: Callable<Args>,
{
    ProxyFactory::default().wrap_typed(interposer, callable)
}
