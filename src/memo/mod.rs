//! Memoization on top of proxies
//!
//! `memoize` wraps a callable with an interposer that answers repeated calls
//! with equal arguments from a cache instead of forwarding them.
//!
//! Equality policy: arguments are compared by natural equality. Kinds without
//! one (opaque blobs, NaN floats) fail with `UnencodableArgument` instead of
//! silently falling back to identity or to an uncached call.

mod key;
mod cache;

pub use key::{KeyEncoder, MemoKey};
pub use cache::{CacheStats, EvictionPolicy, LruPolicy, MemoCache};

use crate::errors::{Error, Result};
use crate::proxy::{Callable, Interposer, Invocation, ProxyFactory};

/// Interposer answering from a `MemoCache`
///
/// Cloning shares the cache. Entries are keyed by proxy id as well as by
/// arguments, so one cache can back several proxies without mixing results.
#[derive(Debug, Clone, Default)]
pub struct Memoizer {
    cache: MemoCache,
}

impl Memoizer {
    pub fn new(cache: MemoCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }
}

impl Interposer for Memoizer {
    fn interpose(&self, inv: &mut Invocation<'_>) -> Result<()> {
        let key = self.cache.encoder().encode_for(inv.proxy_id(), inv.arguments())?;

        let value = self.cache.get_or_compute(key, || {
            inv.forward()?;
            inv.return_value().cloned().ok_or_else(|| Error::UnresolvedReturn {
                expected: inv.signature().ret().clone(),
            })
        })?;

        inv.set_return(value)
    }
}

/// Wrap `callable` so equal argument tuples are computed once
///
/// ```ignore
/// let square = memoize(|x: u64| x * x)?;
/// assert_eq!(square(12)?, 144);
/// ```
pub fn memoize<F, Args>(callable: F) -> Result<F::Proxy>
where
    F: Callable<Args>,
{
    memoize_with(MemoCache::new(), callable)
}

/// Memoize into a caller-held cache handle
pub fn memoize_with<F, Args>(cache: MemoCache, callable: F) -> Result<F::Proxy>
where
    F: Callable<Args>,
{
    ProxyFactory::default().memoize_typed(cache, callable)
}
