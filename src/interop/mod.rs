//! Interoperability - erased values, signatures and callables
//!
//! Design: a closed kind set with owned value containers, so any supported
//! signature can be driven through one generic trampoline
//!
//! Architecture:
//! - `types.rs` - Kind system (ValueKind, Value)
//! - `marshal.rs` - Rust ↔ erased value conversions
//! - `signature.rs` - Signature introspection from type encodings
//! - `call.rs` - Type-erased callables

mod types;
mod marshal;
mod signature;
mod call;

pub use types::{Value, ValueKind};
pub use marshal::Marshal;
pub use signature::{describe, CallableSignature};
pub use call::ErasedCallable;
