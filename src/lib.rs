//! Signature-preserving call interposition
//!
//! Wrap any callable in a proxy with the same parameter list whose calls are
//! captured as an [`Invocation`] and routed through an [`Interposer`] before
//! (optionally) reaching the original. [`memoize`] is built on the same
//! primitive.
//!
//! ```ignore
//! use interpose::{forwarding_wrap, interposer_fn, memoize, Invocation, Value};
//!
//! let clamped = forwarding_wrap(
//!     interposer_fn(|inv: &mut Invocation<'_>| {
//!         let x: i32 = inv.arg(0)?;
//!         inv.set_argument(0, Value::I32(x.min(10)))?;
//!         inv.forward()
//!     }),
//!     |x: i32| x * 2,
//! )?;
//! assert_eq!(clamped(50)?, 20);
//!
//! let slow_square = memoize(|x: u64| x * x)?;
//! assert_eq!(slow_square(9)?, 81);
//! ```

// Core modules
pub mod errors;
pub mod interop;
pub mod proxy;
pub mod memo;

// Ambient
pub mod config;
pub mod logging;

// Re-export commonly used items
pub use errors::{Error, Result, Site};
pub use interop::{describe, CallableSignature, ErasedCallable, Marshal, Value, ValueKind};
pub use proxy::{
    forwarding_wrap, interposer_fn, Callable, Chain, Interposer, InterposerFn, Invocation,
    Passthrough, Proxy, ProxyFactory, ProxyStats,
};
pub use memo::{memoize, memoize_with, CacheStats, KeyEncoder, LruPolicy, MemoCache, MemoKey, Memoizer};
pub use config::{Config, MemoConfig, ProxyConfig};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
